//! # Entity Routes
//!
//! One set of handlers serves every entity; the entity is a type parameter.
//!
//! ```text
//! form_routes::<Clients>()            path = schema key, "clients"
//!      │
//!      ├── GET  /clients               list::<Clients>
//!      ├── POST /clients               create::<Clients>
//!      ├── GET  /clients/{id}          detail::<Clients>
//!      ├── POST /clients/{id}          update::<Clients>
//!      ├── GET  /clients/{id}/delete   confirm_delete::<Clients>
//!      └── POST /clients/{id}/delete   delete::<Clients>
//! ```
//!
//! Entities whose writes need more than a cleaner (issuances, sales) use
//! [`entity_routes`] and bring their own create/update handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, info, warn};

use convenio_core::forms::{
    clean_agreement, clean_cest, clean_cfop, clean_classification, clean_client, clean_company,
    clean_cst_cson, clean_ncm, clean_opening, clean_product, clean_sub_group, clean_user,
};
use convenio_core::query::{ListParams, ListRequest, Page};
use convenio_core::schema::{self, EntitySchema};
use convenio_core::{FormContext, FormErrors, FormMode, RawForm};
use convenio_db::{
    AgreementOpenings, Agreements, Categories, Cests, Cfops, Clients, Companies, CstCsons, Ncms,
    ProductGroups, Products, Resource, Sectors, SubGroups, Users, Writable,
};

use crate::auth::hash_password;
use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiForm, ApiQuery};
use crate::AppState;

// =============================================================================
// Form resources
// =============================================================================

/// An entity written straight from its cleaned form.
pub trait FormResource: Writable {
    fn clean(form: &RawForm, ctx: &FormContext) -> Result<Self::Draft, FormErrors>;

    /// Last step before the draft reaches the store.
    fn prepare(_draft: &mut Self::Draft) -> ApiResult<()> {
        Ok(())
    }
}

macro_rules! form_resource {
    ($resource:ty, |$form:ident, $ctx:ident| $clean:expr) => {
        impl FormResource for $resource {
            fn clean(
                $form: &RawForm,
                $ctx: &FormContext,
            ) -> Result<<Self as Writable>::Draft, FormErrors> {
                $clean
            }
        }
    };
}

form_resource!(Clients, |form, _ctx| clean_client(form));
form_resource!(Companies, |form, _ctx| clean_company(form));
form_resource!(Sectors, |form, _ctx| clean_classification(form, &schema::SECTOR));
form_resource!(Categories, |form, _ctx| clean_classification(form, &schema::CATEGORY));
form_resource!(ProductGroups, |form, _ctx| clean_classification(form, &schema::GROUP));
form_resource!(SubGroups, |form, _ctx| clean_sub_group(form));
form_resource!(Ncms, |form, _ctx| clean_ncm(form));
form_resource!(Cfops, |form, _ctx| clean_cfop(form));
form_resource!(Cests, |form, _ctx| clean_cest(form));
form_resource!(CstCsons, |form, _ctx| clean_cst_cson(form));
form_resource!(Products, |form, _ctx| clean_product(form));
form_resource!(Agreements, |form, _ctx| clean_agreement(form));
form_resource!(AgreementOpenings, |form, ctx| clean_opening(form, ctx));

impl FormResource for Users {
    fn clean(form: &RawForm, ctx: &FormContext) -> Result<Self::Draft, FormErrors> {
        clean_user(form, ctx)
    }

    /// Swaps the submitted password for its hash.
    fn prepare(draft: &mut Self::Draft) -> ApiResult<()> {
        if let Some(password) = draft.password.take() {
            draft.password_hash = Some(hash_password(&password)?);
        }
        Ok(())
    }
}

// =============================================================================
// Routers
// =============================================================================

/// List, detail and delete routes under the entity's schema key, plus the
/// given create and update handlers.
pub fn entity_routes<R: Resource>(
    create: MethodRouter<AppState>,
    update: MethodRouter<AppState>,
) -> Router<AppState> {
    let path = R::schema().key;
    Router::new()
        .route(&format!("/{}", path), get(list::<R>).merge(create))
        .route(&format!("/{}/{{id}}", path), get(detail::<R>).merge(update))
        .route(
            &format!("/{}/{{id}}/delete", path),
            get(confirm_delete::<R>).post(delete::<R>),
        )
}

/// Every route of an entity written straight from its form.
pub fn form_routes<R: FormResource>() -> Router<AppState> {
    entity_routes::<R>(post(create::<R>), post(update::<R>))
}

// =============================================================================
// Responses
// =============================================================================

/// A list page. Full-page requests also carry the entity schema so the
/// caller can render headers and filters; fragment requests don't.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    #[serde(flatten)]
    pub page: Page<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<&'static EntitySchema>,
}

/// What a delete confirmation shows before the user confirms.
#[derive(Debug, Serialize)]
pub struct DeleteConfirmation<T> {
    pub entity: &'static str,
    pub id: String,
    pub message: String,
    pub record: T,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /{path}`
pub async fn list<R: Resource>(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiQuery(request): ApiQuery<ListRequest>,
) -> ApiResult<Json<ListResponse<R::Record>>> {
    let schema = R::schema();
    let params = ListParams::resolve(&request, &schema.list, state.config.page_sizing());
    debug!(
        request_id = %ctx.request_id,
        entity = R::ENTITY,
        partial = ctx.partial,
        "Listing records"
    );

    let page = state.db.table::<R>().list(&params).await?;

    Ok(Json(ListResponse {
        page,
        schema: (!ctx.partial).then_some(schema),
    }))
}

/// `GET /{path}/{id}`
pub async fn detail<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<R::Record>> {
    let record = state.db.table::<R>().require(&id).await?;
    Ok(Json(record))
}

/// `GET /{path}/{id}/delete`
pub async fn confirm_delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteConfirmation<R::Record>>> {
    let record = state.db.table::<R>().require(&id).await?;

    Ok(Json(DeleteConfirmation {
        entity: R::ENTITY,
        message: format!(
            "Are you sure you want to delete this {}?",
            R::schema().label.to_lowercase()
        ),
        id,
        record,
    }))
}

/// `POST /{path}/{id}/delete`
pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    state.db.table::<R>().delete(&id).await?;
    info!(request_id = %ctx.request_id, entity = R::ENTITY, id = %id, "Record deleted");

    Ok(Json(Deleted { id, deleted: true }))
}

/// `POST /{path}`
pub async fn create<R: FormResource>(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiForm(form): ApiForm<RawForm>,
) -> ApiResult<(StatusCode, Json<R::Record>)> {
    let mut draft = clean::<R>(&form, &ctx, FormMode::Create)?;
    R::prepare(&mut draft)?;

    let record = state.db.table::<R>().insert(&draft).await?;
    info!(request_id = %ctx.request_id, entity = R::ENTITY, "Record created");

    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /{path}/{id}`
pub async fn update<R: FormResource>(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    ApiForm(form): ApiForm<RawForm>,
) -> ApiResult<Json<R::Record>> {
    let table = state.db.table::<R>();
    table.require(&id).await?;

    let mut draft = clean::<R>(&form, &ctx, FormMode::Update)?;
    R::prepare(&mut draft)?;

    let record = table.update(&id, &draft).await?;
    info!(request_id = %ctx.request_id, entity = R::ENTITY, id = %id, "Record updated");

    Ok(Json(record))
}

fn clean<R: FormResource>(
    form: &RawForm,
    ctx: &RequestContext,
    mode: FormMode,
) -> ApiResult<R::Draft> {
    R::clean(form, &ctx.form(mode)).map_err(|errors| rejected(ctx, R::ENTITY, errors))
}

/// Logs a rejected submission and turns it into a 422.
pub(crate) fn rejected(ctx: &RequestContext, entity: &str, errors: FormErrors) -> ApiError {
    warn!(
        request_id = %ctx.request_id,
        entity,
        fields = ?errors.fields.keys().collect::<Vec<_>>(),
        form_level = errors.non_field.len(),
        "Form rejected"
    );
    ApiError::form(errors)
}
