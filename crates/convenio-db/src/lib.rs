//! # convenio-db: Database Layer for the Convênio Back Office
//!
//! SQLite storage for every back-office entity, with sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Back-Office Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (apps/server)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  convenio-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ Table<R>       │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Issuances      │   │ 001_initial_ │  │   │
//! │  │   │ Connection    │    │ Installments   │   │ schema.sql   │  │   │
//! │  │   │ Management    │    │                │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (path from the server config)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - The generic `Table<R>` and the per-entity resources
//!
//! ## Usage
//!
//! ```rust,ignore
//! use convenio_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("convenio.db")).await?;
//! let client = db.clients().insert(&draft).await?;
//! let page = db.clients().list(&params).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{Resource, SqlValue, Table, Writable};

pub use repository::agreement::{AgreementOpenings, Agreements};
pub use repository::classification::{
    Categories, Cests, Cfops, CstCsons, Ncms, ProductGroups, Sectors, SubGroups,
};
pub use repository::installment::InstallmentRepository;
pub use repository::issuance::Issuances;
pub use repository::product::Products;
pub use repository::registry::{Clients, Companies, Users};
pub use repository::sale::Sales;
