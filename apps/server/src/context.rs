//! # Request Context
//!
//! Per-request facts handed explicitly to every handler and cleaner: a
//! request ID for the logs, the clock reading the request is judged against,
//! and whether the caller asked for a bare list fragment.
//!
//! ```text
//! GET /clients?page=2
//! X-Requested-With: XMLHttpRequest      ──►  RequestContext {
//! X-Request-Id: 7d3f...                          request_id: 7d3f...,
//!                                                now: 2025-07-10T09:00:00Z,
//!                                                partial: true,
//!                                            }
//! ```

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use convenio_core::{FormContext, FormMode};

/// Header the list pages use to ask for a fragment.
pub const REQUESTED_WITH: &str = "x-requested-with";

/// Header carrying a caller-supplied request ID.
pub const REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub now: DateTime<Utc>,
    /// `X-Requested-With: XMLHttpRequest` was present
    pub partial: bool,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Self {
        let request_id = headers
            .get(REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .unwrap_or_else(Uuid::new_v4);

        let partial = headers
            .get(REQUESTED_WITH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        RequestContext {
            request_id,
            now,
            partial,
        }
    }

    /// The cleaner context for a create or update.
    pub fn form(&self, mode: FormMode) -> FormContext {
        FormContext::new(mode, self.now)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_headers(&parts.headers, Utc::now()))
    }
}
