//! # Connection Pool
//!
//! One SQLite file, one `SqlitePool`, every repository borrowing from it.
//!
//! ```text
//! ServerConfig { database_path, max_connections }
//!      │
//!      ▼
//! DbConfig::new(path).max_connections(n)
//!      │
//!      ▼
//! Database::new ── open (mode=rwc) ── WAL + NORMAL sync + foreign_keys=ON
//!      │        └─ embedded migrations (unless disabled)
//!      ▼
//! Database (Clone, shares the pool)
//!      ├── table::<R>()        list / get / insert / update / delete
//!      ├── clients()           + find_by_tax_id
//!      ├── issuances()         + issue / revise (one transaction each)
//!      └── installments()      schedule reads, payment status
//! ```
//!
//! WAL keeps list pages readable while an issuance transaction holds the
//! write lock.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::agreement::Agreements;
use crate::repository::installment::InstallmentRepository;
use crate::repository::issuance::Issuances;
use crate::repository::registry::Clients;
use crate::repository::{Resource, Table};

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/convenio/convenio.db")
///     .max_connections(8)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`
    pub database_path: PathBuf,

    /// Pool ceiling (5)
    pub max_connections: u32,

    /// Connections kept open while idle (1)
    pub min_connections: u32,

    /// How long a handler waits for a free connection (30 s)
    pub connect_timeout: Duration,

    /// Idle connections above the minimum are closed after this (10 min)
    pub idle_timeout: Duration,

    /// How long a writer waits on another connection's write lock before
    /// the statement fails as busy (5 s)
    pub busy_timeout: Duration,

    /// Apply embedded migrations when the pool opens (on)
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for the given file. The file is created if
    /// it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for tests).
    ///
    /// Each call yields an isolated, empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // in-memory databases live and die with one connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the back-office database.
///
/// Cheap to clone; every clone shares the same pool. The server keeps one in
/// its application state and hands out repositories per request:
///
/// ```rust,ignore
/// async fn list_clients(State(state): State<AppState>, ...) -> ApiResult<...> {
///     let page = state.db.clients().list(&params).await?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    ///
    /// ## Returns
    /// * `Err(DbError::ConnectionFailed)` - Bad path or unreachable file
    /// * `Err(DbError::MigrationFailed)` - A migration didn't apply
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite ships with foreign keys off; the delete policies depend on them
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// `(total, applied)` migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// The raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the generic repository for any resource.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let page = db.table::<Sectors>().list(&params).await?;
    /// ```
    pub fn table<R: Resource>(&self) -> Table<R> {
        Table::new(self.pool.clone())
    }

    /// Clients, with the tax ID lookup.
    pub fn clients(&self) -> Table<Clients> {
        self.table()
    }

    pub fn agreements(&self) -> Table<Agreements> {
        self.table()
    }

    /// Issuances, with the transactional `issue` and `revise` writes.
    pub fn issuances(&self) -> Table<Issuances> {
        self.table()
    }

    /// Installment reads and payment-status changes.
    pub fn installments(&self) -> InstallmentRepository {
        InstallmentRepository::new(self.pool.clone())
    }

    /// Closes the pool. Every repository call fails afterwards.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// Whether the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
