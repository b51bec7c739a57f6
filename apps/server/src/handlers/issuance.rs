//! # Issuance Handlers
//!
//! ## Write Path
//! ```text
//! Form<RawForm>
//!      │
//!      ▼
//! IssuanceRequest::from_form          raw fields, untouched
//!      │
//!      ▼
//! load_context                         clients by tax ID (≤ 2), submitted
//!      │                               client, agreement
//!      ▼
//! validate_issuance (pure)  ──── Err ──► 422, every problem at once
//!      │
//!      ▼
//! issues().issue / revise              one transaction: balance re-check,
//!      │                               client version CAS, installments
//!      │  Conflict ────────────────────► 409, resubmit
//!      ▼
//! 201 / 200 + stored issuance
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, warn};

use convenio_core::catalog::{Installment, Issuance};
use convenio_core::issuance::{validate_issuance, IssuanceContext, IssuanceRequest};
use convenio_core::types::PaymentStatus;
use convenio_core::{FormErrors, RawForm};
use convenio_db::{Database, Issuances, Resource};

use super::crud::rejected;
use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiForm;
use crate::AppState;

/// Form-level message for an issuance whose schedule has payments.
pub const PAID_INSTALLMENTS: &str =
    "Installments of this issuance are already paid; it can no longer be changed.";

/// Fetches the records the issuance validator judges a request against.
async fn load_context(db: &Database, request: &IssuanceRequest) -> ApiResult<IssuanceContext> {
    let digits = request.tax_id_digits();
    let tax_id_matches = if digits.is_empty() {
        Vec::new()
    } else {
        db.clients().find_by_tax_id(&digits).await?
    };

    let submitted_client = match request.client_id() {
        Some(id) => db.clients().get(id).await?,
        None => None,
    };

    let agreement = match request.agreement_id() {
        Some(id) => db.agreements().get(id).await?,
        None => None,
    };

    Ok(IssuanceContext {
        tax_id_matches,
        submitted_client,
        agreement,
    })
}

/// `POST /issuances`
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiForm(form): ApiForm<RawForm>,
) -> ApiResult<(StatusCode, Json<Issuance>)> {
    let request = IssuanceRequest::from_form(&form);
    let context = load_context(&state.db, &request).await?;

    let validated = validate_issuance(&request, &context)
        .map_err(|errors| rejected(&ctx, Issuances::ENTITY, errors))?;

    let issuance = state.db.issuances().issue(&validated, ctx.now).await?;
    info!(
        request_id = %ctx.request_id,
        id = %issuance.id,
        client_id = %issuance.client_id,
        "Issuance created"
    );

    Ok((StatusCode::CREATED, Json(issuance)))
}

/// `POST /issuances/{id}`
///
/// Paid installments freeze the issuance: the check here gives the form a
/// readable error, the repository enforces it again inside its transaction.
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiForm(form): ApiForm<RawForm>,
) -> ApiResult<Json<Issuance>> {
    state.db.issuances().require(&id).await?;

    if state.db.installments().has_paid(&id).await? {
        return Err(rejected(
            &ctx,
            Issuances::ENTITY,
            FormErrors::form_level(PAID_INSTALLMENTS),
        ));
    }

    let request = IssuanceRequest::from_form(&form);
    let context = load_context(&state.db, &request).await?;

    let validated = validate_issuance(&request, &context)
        .map_err(|errors| rejected(&ctx, Issuances::ENTITY, errors))?;

    let issuance = state.db.issuances().revise(&id, &validated, ctx.now).await?;
    info!(request_id = %ctx.request_id, id = %id, "Issuance revised");

    Ok(Json(issuance))
}

/// `GET /issuances/{id}/installments`
pub async fn installments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Installment>>> {
    state.db.issuances().require(&id).await?;
    let installments = state.db.installments().for_issuance(&id).await?;
    Ok(Json(installments))
}

/// `POST /installments/{id}/status` with form field `status`.
pub async fn set_installment_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiForm(form): ApiForm<RawForm>,
) -> ApiResult<Json<Installment>> {
    let status = match form.get("status") {
        Some(raw) => parse_payment_status(raw).ok_or_else(|| {
            warn!(request_id = %ctx.request_id, status = %raw, "Unknown payment status");
            let mut errors = FormErrors::new();
            errors.add("status", "Choose open, paid or canceled.");
            ApiError::form(errors)
        })?,
        None => {
            let mut errors = FormErrors::new();
            errors.add("status", "This field is required.");
            return Err(ApiError::form(errors));
        }
    };

    let installment = state.db.installments().set_status(&id, status).await?;
    info!(request_id = %ctx.request_id, id = %id, status = %status, "Installment status changed");

    Ok(Json(installment))
}

/// Accepts the serialized names (`open`, `paid`, `canceled`) as well as the
/// stored codes and labels.
fn parse_payment_status(raw: &str) -> Option<PaymentStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "open" => Some(PaymentStatus::Open),
        "paid" => Some(PaymentStatus::Paid),
        "canceled" | "cancelled" => Some(PaymentStatus::Canceled),
        other => other.parse().ok(),
    }
}
