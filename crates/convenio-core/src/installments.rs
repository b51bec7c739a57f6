//! # Installment Schedule
//!
//! Splits an accepted issuance into its installments.
//!
//! ```text
//! value R$ 100.00, 3 installments, reference 07/2025
//!
//!   #1  due 2025-07-31  R$ 33.33  open
//!   #2  due 2025-08-31  R$ 33.33  open
//!   #3  due 2025-09-30  R$ 33.34  open   ← remainder on the last one
//! ```

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentStatus, ReferenceMonth};
use crate::validation::validate_installment_count;

/// One planned installment, before it gets an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedInstallment {
    pub number: i32,
    pub due_date: NaiveDate,
    pub value: Money,
    pub status: PaymentStatus,
}

/// Plans `count` installments of `value` starting at `reference_month`.
///
/// Due dates fall on the last day of the reference month and of each
/// following month. Counts outside 1..=360 are rejected before anything is
/// allocated.
pub fn plan_installments(
    value: Money,
    count: i32,
    reference_month: ReferenceMonth,
) -> Result<Vec<PlannedInstallment>, ValidationError> {
    let parts = validate_installment_count("installments", i64::from(count))? as u32;

    value
        .split(parts)
        .into_iter()
        .zip(0u32..)
        .map(|(amount, offset)| {
            let due_date = reference_month.last_day_after(offset).ok_or_else(|| {
                ValidationError::invalid("installments", "due date out of calendar range")
            })?;
            Ok(PlannedInstallment {
                number: offset as i32 + 1,
                due_date,
                value: amount,
                status: PaymentStatus::Open,
            })
        })
        .collect()
}
