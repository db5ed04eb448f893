//! Request body extraction.
//!
//! # Responsibilities
//! - Enforce the body size limit (`DefaultBodyLimit`, set by the server)
//! - Parse JSON bodies, treating an empty body as `{}`
//! - Answer malformed bodies with the relay's JSON error shape
//!
//! # Design Decisions
//! - Content-Type is not required; browsers posting from the QA manager
//!   sometimes omit it
//! - Request ID is added by `tower_http` before this runs

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;

use crate::http::response::ApiError;

/// JSON body with relay-specific rejections.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::payload_too_large()
            } else {
                ApiError::invalid_json()
            }
        })?;

        let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(raw).map(JsonBody).map_err(|e| {
            tracing::debug!(error = %e, "Rejected request body");
            ApiError::invalid_json()
        })
    }
}
