//! # Extractors
//!
//! `Form` and `Query` wrappers whose rejections are [`ApiError`]s, so a body
//! that isn't urlencoded or a query string that won't deserialize answers
//! with the same JSON shape as every other failure.
//!
//! ```text
//! POST /clients  Content-Type: application/json  ──►  415 { "code": "UNSUPPORTED_MEDIA_TYPE", ... }
//! GET  /clients?page=1&page=2                    ──►  400 { "code": "BAD_REQUEST", ... }
//! ```

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Form;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ApiError, ErrorCode};

/// An urlencoded request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiForm<T>(pub T);

/// A deserialized query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequest<S> for ApiForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(ApiForm(value))
    }
}

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        debug!(status = %rejection.status(), body = %rejection.body_text(), "Form rejected");
        rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(status = %rejection.status(), body = %rejection.body_text(), "Query rejected");
        rejected(rejection.status(), rejection.body_text())
    }
}

fn rejected(status: StatusCode, message: String) -> ApiError {
    let code = if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        ErrorCode::UnsupportedMediaType
    } else {
        ErrorCode::BadRequest
    };
    ApiError::new(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use std::collections::BTreeMap;

    #[derive(Debug, serde::Deserialize)]
    struct Paging {
        page: Option<String>,
    }

    #[tokio::test]
    async fn test_query_rejection_is_bad_request() {
        let request = Request::builder()
            .uri("/clients?page=1&page=2")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let err = ApiQuery::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_accepts_single_values() {
        let request = Request::builder().uri("/clients?page=3").body(Body::empty()).unwrap();
        let (mut parts, _) = request.into_parts();

        let ApiQuery(paging) = ApiQuery::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(paging.page.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_json_body_is_unsupported_media_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/clients")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"full_name":"Ana"}"#))
            .unwrap();

        let err = ApiForm::<BTreeMap<String, String>>::from_request(request, &())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedMediaType);
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
