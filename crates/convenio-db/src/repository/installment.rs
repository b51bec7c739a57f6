//! # Installment Repository
//!
//! Reads and payment-status changes for issuance installments. Schedules
//! are written by the issuance transaction (see [`super::issuance`]).

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use convenio_core::catalog::Installment;
use convenio_core::installments::PlannedInstallment;
use convenio_core::types::PaymentStatus;

use super::generate_id;
use crate::error::{DbError, DbResult};

/// Repository for the `issuance_installments` table.
#[derive(Debug, Clone)]
pub struct InstallmentRepository {
    pool: SqlitePool,
}

impl InstallmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InstallmentRepository { pool }
    }

    /// Installments of one issuance, by number.
    pub async fn for_issuance(&self, issuance_id: &str) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(
            "SELECT * FROM issuance_installments WHERE issuance_id = ?1 ORDER BY number",
        )
        .bind(issuance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Installment>> {
        let installment =
            sqlx::query_as::<_, Installment>("SELECT * FROM issuance_installments WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(installment)
    }

    /// Changes an installment's payment status.
    ///
    /// ## Returns
    /// * `Ok(Installment)` - The installment as stored after the change
    /// * `Err(DbError::NotFound)` - No such installment
    pub async fn set_status(&self, id: &str, status: PaymentStatus) -> DbResult<Installment> {
        debug!(id = %id, status = %status, "Updating installment status");

        let result = sqlx::query(
            "UPDATE issuance_installments SET payment_status = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(status.code())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Installment", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Installment", id))
    }

    /// Whether any installment of the issuance is already paid.
    pub async fn has_paid(&self, issuance_id: &str) -> DbResult<bool> {
        count_paid(&self.pool, issuance_id).await.map(|paid| paid > 0)
    }
}

pub(crate) async fn count_paid<'e, E>(executor: E, issuance_id: &str) -> DbResult<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let paid: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM issuance_installments WHERE issuance_id = ?1 AND payment_status = ?2",
    )
    .bind(issuance_id)
    .bind(PaymentStatus::Paid.code())
    .fetch_one(executor)
    .await?;

    Ok(paid)
}

/// Writes a planned schedule inside an open transaction.
pub(crate) async fn insert_schedule(
    tx: &mut Transaction<'_, Sqlite>,
    issuance_id: &str,
    agreement_id: &str,
    plan: &[PlannedInstallment],
    now: DateTime<Utc>,
) -> DbResult<()> {
    for planned in plan {
        sqlx::query(
            r#"
            INSERT INTO issuance_installments (
                id, issuance_id, agreement_id, number, issued_at,
                due_date, payment_status, value_cents, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(generate_id())
        .bind(issuance_id)
        .bind(agreement_id)
        .bind(planned.number)
        .bind(now)
        .bind(planned.due_date)
        .bind(planned.status.code())
        .bind(planned.value.cents())
        .bind(now)
        .execute(&mut **tx)
        .await?;
    }

    debug!(issuance_id = %issuance_id, count = plan.len(), "Installment schedule written");
    Ok(())
}
