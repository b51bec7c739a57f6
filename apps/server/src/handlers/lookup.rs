//! # Lookup Handlers
//!
//! Small JSON lookups the issuance and sale forms call while the user types.
//!
//! ## Client by Tax ID
//! ```text
//! GET /api/clients/by-tax-id?tax_id=123.456.789-01     (or ?cpf=...)
//!      │
//!      ├── parameter missing / blank ───────► 400
//!      ├── no digits, or 0 matches ─────────► 200 { id: null, name: "Client not found.", balance: "0.00" }
//!      ├── 1 match ─────────────────────────► 200 { id, name, balance }
//!      └── 2+ matches ──────────────────────► 409 DATA_INTEGRITY
//! ```
//! A missing client is an answer, not a failure: the form shows the
//! sentinel name in place of the client's.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, error};

use convenio_core::lookup::{ClientLookup, InstallmentLimit, IssuanceDetails};
use convenio_core::types::TaxId;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TaxIdQuery {
    pub tax_id: Option<String>,
    /// Older form field name
    pub cpf: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("Missing query parameter: {}", name)))
}

/// `GET /api/clients/by-tax-id`
pub async fn client_by_tax_id(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<TaxIdQuery>,
) -> ApiResult<Json<ClientLookup>> {
    let raw = required(query.tax_id.or(query.cpf), "tax_id")?;

    let digits = TaxId::digits(&raw);
    if digits.is_empty() {
        return Ok(Json(ClientLookup::not_found()));
    }

    let matches = state.db.clients().find_by_tax_id(&digits).await?;
    if matches.len() > 1 {
        error!(request_id = %ctx.request_id, count = matches.len(), "Several clients share one tax ID");
    } else if matches.is_empty() {
        debug!(request_id = %ctx.request_id, "No client for tax ID");
    }

    Ok(Json(ClientLookup::resolve(&digits, &matches)?))
}

/// `GET /api/agreements/installment-limit`
pub async fn installment_limit(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Json<InstallmentLimit>> {
    let id = required(query.id, "id")?;
    let agreement = state.db.agreements().require(&id).await?;
    Ok(Json(InstallmentLimit::from(&agreement)))
}

/// `GET /api/issuances/details`
pub async fn issuance_details(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> ApiResult<Json<IssuanceDetails>> {
    let id = required(query.id, "id")?;
    let issuance = state.db.issuances().require(&id).await?;
    Ok(Json(IssuanceDetails::from(&issuance)))
}
