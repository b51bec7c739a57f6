//! # Convênio Back Office Server
//!
//! HTTP surface over `convenio-core` and `convenio-db`.
//!
//! ## Module Organization
//! ```text
//! convenio_server/
//! ├── lib.rs          ◄─── You are here (AppState & router)
//! ├── main.rs         ◄─── Config, tracing, bind, graceful shutdown
//! ├── config.rs       ◄─── ServerConfig (defaults → TOML → CONVENIO_*)
//! ├── context.rs      ◄─── RequestContext extractor
//! ├── error.rs        ◄─── ApiError → JSON response
//! ├── auth.rs         ◄─── argon2 password hashing
//! └── handlers/
//!     ├── crud.rs     ◄─── list / detail / create / update / delete, any entity
//!     ├── issuance.rs ◄─── issuance writes through the issuance validator
//!     ├── sale.rs     ◄─── sale writes defaulted from their issuance
//!     ├── lookup.rs   ◄─── /api lookups used by the forms
//!     └── system.rs   ◄─── /health, /api/schema/{entity}
//! ```
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For every entity path P (clients, companies, users, sectors, ...)      │
//! │                                                                         │
//! │  GET  /P                 list (search, status, sort, order, page)      │
//! │  POST /P                 create from an urlencoded form                │
//! │  GET  /P/{id}            detail                                         │
//! │  POST /P/{id}            update                                         │
//! │  GET  /P/{id}/delete     delete confirmation                           │
//! │  POST /P/{id}/delete     delete                                         │
//! │                                                                         │
//! │  GET  /issuances/{id}/installments    POST /installments/{id}/status  │
//! │  GET  /api/clients/by-tax-id          GET  /api/agreements/installment-limit
//! │  GET  /api/issuances/details          GET  /api/schema/{entity}        │
//! │  GET  /health                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use convenio_db::{
    AgreementOpenings, Agreements, Categories, Cests, Cfops, Clients, Companies, CstCsons,
    Database, Issuances, Ncms, ProductGroups, Products, Sales, Sectors, SubGroups, Users,
};

use handlers::crud::{entity_routes, form_routes};
use handlers::{issuance, lookup, sale, system};

pub use config::ServerConfig;
pub use context::RequestContext;
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
///
/// Cheap to clone: the database handle shares one pool and the config is
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Registry
        .merge(form_routes::<Clients>())
        .merge(form_routes::<Companies>())
        .merge(form_routes::<Users>())
        // Classification
        .merge(form_routes::<Sectors>())
        .merge(form_routes::<Categories>())
        .merge(form_routes::<ProductGroups>())
        .merge(form_routes::<SubGroups>())
        // Fiscal codes
        .merge(form_routes::<Ncms>())
        .merge(form_routes::<Cfops>())
        .merge(form_routes::<Cests>())
        .merge(form_routes::<CstCsons>())
        .merge(form_routes::<Products>())
        // Agreements
        .merge(form_routes::<Agreements>())
        .merge(form_routes::<AgreementOpenings>())
        .merge(entity_routes::<Issuances>(
            post(issuance::create),
            post(issuance::update),
        ))
        .merge(entity_routes::<Sales>(post(sale::create), post(sale::update)))
        .route("/issuances/{id}/installments", get(issuance::installments))
        .route("/installments/{id}/status", post(issuance::set_installment_status))
        // Lookups
        .route("/api/clients/by-tax-id", get(lookup::client_by_tax_id))
        .route("/api/agreements/installment-limit", get(lookup::installment_limit))
        .route("/api/issuances/details", get(lookup::issuance_details))
        // System
        .route("/api/schema/{entity}", get(system::schema))
        .route("/health", get(system::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
