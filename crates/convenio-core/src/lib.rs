//! # convenio-core: Pure Business Logic for the Convênio Back Office
//!
//! Entity definitions, field validation, the issuance rules and list-query
//! normalization, all as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Convênio Back Office Architecture                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/server (axum HTTP API)                     │   │
//! │  │   forms ──► lists ──► lookups ──► confirm-then-delete          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ convenio-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │ catalog  │ │  schema  │ │  forms   │ │ issuance         │  │   │
//! │  │   │ records  │ │  fields  │ │ cleaners │ │ cross-entity     │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  money   │ │  types   │ │  query   │ │ validation       │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              convenio-db (Database Layer)                       │   │
//! │  │        SQLite schema, migrations, repositories, listing         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Persisted records (Client, Product, Issuance, ...)
//! - [`schema`] - Static field and list descriptions per entity
//! - [`forms`] - Form cleaning into typed drafts
//! - [`validation`] - Field validators
//! - [`issuance`] - The issuance validator
//! - [`installments`] - Installment schedule planning
//! - [`query`] - Search/sort/status/page normalization
//! - [`lookup`] - Lookup response shapes
//! - [`money`] / [`types`] - Value types
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: validators receive everything they need, including
//!    the current date, through explicit arguments
//! 2. **No I/O**: lookups are performed by the caller and handed in
//! 3. **Integer Money**: all monetary values are centavos (i64)
//! 4. **All Errors At Once**: a rejected form reports every problem found
//!
//! ## Example Usage
//!
//! ```rust
//! use convenio_core::money::Money;
//! use convenio_core::types::Percentage;
//! use convenio_core::validation::compute_client_balance;
//!
//! let salary: Money = "3.000,00".parse().unwrap();
//! let balance = compute_client_balance(salary, Percentage::from_hundredths(3000));
//! assert_eq!(balance.to_string(), "R$ 900.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod forms;
pub mod installments;
pub mod issuance;
pub mod lookup;
pub mod money;
pub mod query;
pub mod schema;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use forms::{FormContext, FormErrors, FormMode, RawForm};
pub use money::Money;
pub use types::*;
