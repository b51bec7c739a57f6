//! # HTTP Handlers
//!
//! ## Handler Organization
//! ```text
//! handlers/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── crud.rs     ◄─── Generic list / detail / form / delete routes
//! ├── issuance.rs ◄─── Issuances and their installments
//! ├── sale.rs     ◄─── Sales
//! ├── lookup.rs   ◄─── Form-assist lookups under /api
//! └── system.rs   ◄─── Health and schema
//! ```
//!
//! ## How a Form Submission Flows
//! ```text
//! POST /clients  (application/x-www-form-urlencoded)
//!      │
//!      ▼
//! RequestContext + ApiForm<RawForm>       (extractors)
//!      │
//!      ▼
//! FormResource::clean(form, ctx)          (convenio-core cleaners)
//!      │   Err(FormErrors) ──────────────► 422 { errors: {...} }
//!      ▼
//! FormResource::prepare(&mut draft)       (password hashing, ...)
//!      │
//!      ▼
//! Table<R>::insert(&draft)                (convenio-db)
//!      │   UniqueViolation ──────────────► 409 Duplicate
//!      ▼
//! 201 + stored record
//! ```

pub mod crud;
pub mod issuance;
pub mod lookup;
pub mod sale;
pub mod system;
