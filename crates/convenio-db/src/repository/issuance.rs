//! # Issuance Repository
//!
//! The issuance write path and issuance reads.
//!
//! ## Write Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE clients SET version = version + 1                             │
//! │        WHERE id = ? AND version = <version seen by the validator>       │
//! │        0 rows                     → Conflict (concurrent write)         │
//! │    SELECT balance_cents FROM clients WHERE id = ?                       │
//! │        value > balance            → Conflict (balance changed)          │
//! │    INSERT INTO issuances ...                                            │
//! │    INSERT INTO issuance_installments ... (one row per installment)      │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Two submissions validated against the same client version cannot both
//! commit: the second compare-and-set matches no row and the whole
//! transaction rolls back. Issuances do not draw the balance down.
//!
//! The compare-and-set is the first statement, so each transaction takes
//! the write lock before reading anything and waits its turn on the busy
//! timeout instead of failing a read-to-write upgrade. A wait that still
//! times out is reported as `Conflict` like any other lost race.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info, warn};

use convenio_core::catalog::Issuance;
use convenio_core::installments::{plan_installments, PlannedInstallment};
use convenio_core::issuance::ValidatedIssuance;
use convenio_core::money::Money;
use convenio_core::schema::{self, EntitySchema};

use super::installment::{count_paid, insert_schedule};
use super::{generate_id, Resource, Table};
use crate::error::{DbError, DbResult};

/// The `issuances` table, read with client and agreement names.
#[derive(Debug)]
pub struct Issuances;

impl Resource for Issuances {
    type Record = Issuance;
    const ENTITY: &'static str = "Issuance";
    const TABLE: &'static str = "issuances";
    const SELECT: &'static str = "SELECT i.*, c.full_name AS client_name, a.name AS agreement_name \
         FROM issuances i \
         JOIN clients c ON c.id = i.client_id \
         JOIN agreements a ON a.id = i.agreement_id";

    fn schema() -> &'static EntitySchema {
        &schema::ISSUANCE
    }
}

fn plan(issuance: &ValidatedIssuance) -> DbResult<Vec<PlannedInstallment>> {
    plan_installments(issuance.value, issuance.installments, issuance.reference_month)
        .map_err(|e| DbError::Internal(e.to_string()))
}

/// Begin/commit failures, except lock waits, which stay `Busy`.
fn transaction_error(err: sqlx::Error) -> DbError {
    match DbError::from(err) {
        DbError::Busy(message) => DbError::Busy(message),
        other => DbError::TransactionFailed(other.to_string()),
    }
}

async fn begin(table: &Table<Issuances>) -> DbResult<Transaction<'static, Sqlite>> {
    table.pool().begin().await.map_err(transaction_error)
}

async fn commit(tx: Transaction<'_, Sqlite>) -> DbResult<()> {
    tx.commit().await.map_err(transaction_error)
}

/// Claims the client version, then re-checks the balance, inside `tx`.
async fn claim_client(tx: &mut Transaction<'_, Sqlite>, issuance: &ValidatedIssuance) -> DbResult<()> {
    let claimed = sqlx::query(
        "UPDATE clients SET version = version + 1 WHERE id = ?1 AND version = ?2",
    )
    .bind(&issuance.client_id)
    .bind(issuance.client_version)
    .execute(&mut **tx)
    .await?;

    if claimed.rows_affected() == 0 {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM clients WHERE id = ?1")
            .bind(&issuance.client_id)
            .fetch_optional(&mut **tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Client", &issuance.client_id));
        }
        warn!(client_id = %issuance.client_id, "Client changed concurrently");
        return Err(DbError::Conflict(
            "The client was changed by another operation. Resubmit the issuance.".to_string(),
        ));
    }

    let balance_cents: i64 = sqlx::query_scalar("SELECT balance_cents FROM clients WHERE id = ?1")
        .bind(&issuance.client_id)
        .fetch_one(&mut **tx)
        .await?;

    let balance = Money::from_cents(balance_cents);
    if issuance.value > balance {
        warn!(
            client_id = %issuance.client_id,
            value = %issuance.value,
            balance = %balance,
            "Balance changed below the issuance value"
        );
        return Err(DbError::Conflict(format!(
            "The client's balance changed to {} and no longer covers {}. Resubmit the issuance.",
            balance, issuance.value
        )));
    }

    Ok(())
}

impl Table<Issuances> {
    /// Records a validated issuance and its installment schedule.
    ///
    /// `now` stamps the transaction date and time.
    ///
    /// ## Returns
    /// * `Ok(Issuance)` - The stored issuance, with joined names
    /// * `Err(DbError::Conflict)` - The client changed since validation
    pub async fn issue(&self, issuance: &ValidatedIssuance, now: DateTime<Utc>) -> DbResult<Issuance> {
        let id = generate_id();
        let schedule = plan(issuance)?;
        debug!(id = %id, client_id = %issuance.client_id, "Writing issuance");

        self.write_new(&id, issuance, &schedule, now)
            .await
            .map_err(DbError::contended)?;

        info!(id = %id, value = %issuance.value, installments = issuance.installments, "Issuance recorded");
        self.require(&id).await
    }

    async fn write_new(
        &self,
        id: &str,
        issuance: &ValidatedIssuance,
        schedule: &[PlannedInstallment],
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut tx = begin(self).await?;
        claim_client(&mut tx, issuance).await?;

        sqlx::query(
            r#"
            INSERT INTO issuances (
                id, tax_id, client_id, balance_snapshot_cents, reference_month,
                agreement_id, installments, value_cents,
                transaction_date, transaction_time, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(id)
        .bind(&issuance.tax_id)
        .bind(&issuance.client_id)
        .bind(issuance.balance_snapshot.cents())
        .bind(issuance.reference_month.storage_code())
        .bind(&issuance.agreement_id)
        .bind(issuance.installments)
        .bind(issuance.value.cents())
        .bind(now.date_naive())
        .bind(now.time())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_schedule(&mut tx, id, &issuance.agreement_id, schedule, now).await?;
        commit(tx).await
    }

    /// Replaces an issuance's values and regenerates its schedule.
    ///
    /// The original transaction date and time are kept.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such issuance
    /// * `Err(DbError::Conflict)` - An installment is already paid, or the
    ///   client changed since validation
    pub async fn revise(
        &self,
        id: &str,
        issuance: &ValidatedIssuance,
        now: DateTime<Utc>,
    ) -> DbResult<Issuance> {
        let schedule = plan(issuance)?;
        debug!(id = %id, "Revising issuance");

        self.write_revision(id, issuance, &schedule, now)
            .await
            .map_err(DbError::contended)?;

        info!(id = %id, "Issuance revised");
        self.require(id).await
    }

    async fn write_revision(
        &self,
        id: &str,
        issuance: &ValidatedIssuance,
        schedule: &[PlannedInstallment],
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut tx = begin(self).await?;
        claim_client(&mut tx, issuance).await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM issuances WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found(Issuances::ENTITY, id));
        }

        if count_paid(&mut *tx, id).await? > 0 {
            return Err(DbError::Conflict(
                "Installments of this issuance are already paid; it can no longer be changed."
                    .to_string(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE issuances SET
                tax_id = ?2,
                client_id = ?3,
                balance_snapshot_cents = ?4,
                reference_month = ?5,
                agreement_id = ?6,
                installments = ?7,
                value_cents = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&issuance.tax_id)
        .bind(&issuance.client_id)
        .bind(issuance.balance_snapshot.cents())
        .bind(issuance.reference_month.storage_code())
        .bind(&issuance.agreement_id)
        .bind(issuance.installments)
        .bind(issuance.value.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM issuance_installments WHERE issuance_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_schedule(&mut tx, id, &issuance.agreement_id, schedule, now).await?;
        commit(tx).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
