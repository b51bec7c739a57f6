//! Health and schema endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use convenio_core::schema::{self, EntitySchema};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
    pub version: &'static str,
}

/// `GET /health`. 503 when the database doesn't answer.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Health>) {
    let database = state.db.health_check().await;
    let (migrations_total, migrations_applied) = match state.db.migration_status().await {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "Could not read migration status");
            (0, 0)
        }
    };

    let status = if database { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(Health {
            status: if database { "ok" } else { "unavailable" },
            database,
            migrations_total,
            migrations_applied,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// `GET /api/schema/{entity}`
pub async fn schema(Path(entity): Path<String>) -> ApiResult<Json<&'static EntitySchema>> {
    schema::by_key(&entity)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Entity", &entity))
}
