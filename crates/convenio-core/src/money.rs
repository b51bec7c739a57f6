//! # Money
//!
//! Provides the `Money` type for monetary values and the fixed-scale decimal
//! helpers shared by every numeric form field.
//!
//! ## Representation
//! Amounts are whole centavos in an `i64`. Percentages are hundredths of a
//! percent, so the consignable balance stays exact:
//! ```text
//! salary 300000 × 30.00% (3000 hundredths) / 10000 = 90000   (R$ 900.00)
//! ```
//! A balance of R$ 900.00 and an issuance of R$ 900.00 always compare equal.
//!
//! ## Usage
//! ```rust
//! use convenio_core::money::Money;
//! use convenio_core::types::Percentage;
//!
//! let salary: Money = "3.000,00".parse().unwrap();
//! let balance = salary.percent_of(Percentage::from_hundredths(3000));
//! assert_eq!(balance.cents(), 90_000);
//! assert_eq!(balance.to_string(), "R$ 900.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos.
///
/// ## Where Money is Used
/// ```text
/// Client.salary ──► percent_of(percentage) ──► Client.balance
///                                                   │
/// Issuance.value ──── must be ≤ ────────────────────┘
///       │
///       └──► split(n) ──► Installment.value × n
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use convenio_core::money::Money;
    ///
    /// let value = Money::from_cents(1099); // R$ 10.99
    /// assert_eq!(value.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a percentage, rounding half away from zero to the centavo.
    ///
    /// ## Implementation
    /// `Percentage` stores hundredths of a percent, so 100% is 10000 and the
    /// formula is `(cents * hundredths + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use convenio_core::money::Money;
    /// use convenio_core::types::Percentage;
    ///
    /// let salary = Money::from_cents(123_457); // R$ 1234.57
    /// let balance = salary.percent_of(Percentage::from_hundredths(1000)); // 10%
    /// assert_eq!(balance.cents(), 12_346);
    /// ```
    pub fn percent_of(&self, pct: Percentage) -> Money {
        // i128 keeps large salaries from overflowing the intermediate product
        let product = self.0 as i128 * pct.hundredths() as i128;
        let rounded = if product >= 0 {
            (product + 5000) / 10000
        } else {
            (product - 5000) / 10000
        };
        Money::from_cents(rounded as i64)
    }

    /// Splits the value into `parts` amounts that add up exactly.
    ///
    /// Every part gets the floor share; the centavos that do not divide
    /// evenly go to the last part. Returns an empty vector for zero parts.
    ///
    /// ## Example
    /// ```rust
    /// use convenio_core::money::Money;
    ///
    /// let parts = Money::from_cents(1000).split(3);
    /// assert_eq!(parts, vec![Money::from_cents(333), Money::from_cents(333), Money::from_cents(334)]);
    /// ```
    pub fn split(&self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let n = i64::from(parts);
        let base = self.0 / n;
        let remainder = self.0 - base * n;
        let mut out = vec![Money(base); parts as usize];
        if let Some(last) = out.last_mut() {
            last.0 += remainder;
        }
        out
    }

    /// Plain decimal text without currency symbol ("1234.56").
    ///
    /// This is the wire form used by the lookup API.
    pub fn to_decimal_string(&self) -> String {
        format_scaled(self.0, 2)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Errors raised while reading a fixed-scale decimal from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalParseError {
    #[error("value is empty")]
    Empty,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("at most {0} decimal places allowed")]
    TooManyDecimals(u32),

    #[error("value is too large")]
    Overflow,
}

/// Parses decimal text into an integer scaled by `10^scale`.
///
/// Accepts both decimal separators used by the back-office forms:
/// "1234.56", "1234,56", "1.234,56" and "1,234.56". When both separators
/// appear, the last one is the decimal separator and the other one groups
/// thousands. A leading "R$" and surrounding whitespace are ignored.
pub fn parse_scaled(raw: &str, scale: u32) -> Result<i64, DecimalParseError> {
    let text = raw.trim().trim_start_matches("R$").trim();
    if text.is_empty() {
        return Err(DecimalParseError::Empty);
    }

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };

    let decimal_sep = match (unsigned.rfind('.'), unsigned.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) if unsigned.matches('.').count() == 1 => Some('.'),
        (None, Some(_)) if unsigned.matches(',').count() == 1 => Some(','),
        (None, None) => None,
        // "1.234.567" style: only grouping separators
        _ => None,
    };

    let (int_part, frac_part) = match decimal_sep {
        Some(sep) => match unsigned.rsplit_once(sep) {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        },
        None => (unsigned, ""),
    };

    let int_digits: String = int_part.chars().filter(|c| *c != '.' && *c != ',').collect();
    if int_digits.is_empty() && frac_part.is_empty() {
        return Err(DecimalParseError::NotANumber(raw.to_string()));
    }
    if !int_digits.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(DecimalParseError::NotANumber(raw.to_string()));
    }
    if frac_part.len() > scale as usize {
        return Err(DecimalParseError::TooManyDecimals(scale));
    }

    let factor = 10_i64.pow(scale);
    let whole: i64 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().map_err(|_| DecimalParseError::Overflow)?
    };
    let mut frac: i64 = 0;
    if !frac_part.is_empty() {
        frac = frac_part.parse().map_err(|_| DecimalParseError::Overflow)?;
        frac *= 10_i64.pow(scale - frac_part.len() as u32);
    }

    let value = whole
        .checked_mul(factor)
        .and_then(|v| v.checked_add(frac))
        .ok_or(DecimalParseError::Overflow)?;
    Ok(if negative { -value } else { value })
}

/// Formats an integer scaled by `10^scale` as plain decimal text.
pub fn format_scaled(value: i64, scale: u32) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let factor = 10_i64.pow(scale);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / factor as u64,
        abs % factor as u64,
        width = scale as usize
    )
}

impl FromStr for Money {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s, 2).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the value the way error messages quote it ("R$ 150.00").
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {}", self.to_decimal_string())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
