//! # Database Migrations
//!
//! Embedded SQL migrations for the back-office schema.
//!
//! The SQL lives in `migrations/sqlite/` at the workspace root and is
//! compiled into the crate, so a fresh database file is fully usable as soon
//! as [`Database::new`](crate::Database::new) returns.
//!
//! Applied migrations are checksummed by sqlx; change the schema with a new
//! `NNN_description.sql` file, never by editing an applied one.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent; each migration runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`, for health checks.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
