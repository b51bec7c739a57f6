//! Sale handlers.
//!
//! A sale names the issuance that settles it. The issuance is resolved
//! before cleaning so the cleaner can default value and installment count
//! from it and copy its client and agreement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use convenio_core::catalog::{Issuance, Sale};
use convenio_core::forms::{clean_sale, SaleDraft};
use convenio_core::{FormMode, RawForm};
use convenio_db::{Database, Resource, Sales};

use super::crud::rejected;
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::extract::ApiForm;
use crate::AppState;

async fn referenced_issuance(db: &Database, form: &RawForm) -> ApiResult<Option<Issuance>> {
    match form.get("issuance_id") {
        Some(id) => Ok(db.issuances().get(id).await?),
        None => Ok(None),
    }
}

async fn clean(
    db: &Database,
    ctx: &RequestContext,
    form: &RawForm,
    mode: FormMode,
) -> ApiResult<SaleDraft> {
    let issuance = referenced_issuance(db, form).await?;
    clean_sale(form, &ctx.form(mode), issuance.as_ref())
        .map_err(|errors| rejected(ctx, Sales::ENTITY, errors))
}

/// `POST /sales`
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiForm(form): ApiForm<RawForm>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    let draft = clean(&state.db, &ctx, &form, FormMode::Create).await?;

    let sale = state.db.table::<Sales>().insert(&draft).await?;
    info!(
        request_id = %ctx.request_id,
        id = %sale.id,
        issuance_id = %sale.issuance_id,
        "Sale created"
    );

    Ok((StatusCode::CREATED, Json(sale)))
}

/// `POST /sales/{id}`
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiForm(form): ApiForm<RawForm>,
) -> ApiResult<Json<Sale>> {
    let sales = state.db.table::<Sales>();
    sales.require(&id).await?;

    let draft = clean(&state.db, &ctx, &form, FormMode::Update).await?;
    let sale = sales.update(&id, &draft).await?;
    info!(request_id = %ctx.request_id, id = %id, "Sale updated");

    Ok(Json(sale))
}
