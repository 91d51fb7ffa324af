//! Response construction.
//!
//! # Responsibilities
//! - Serve payloads (fresh or cached) byte-for-byte as JSON
//! - Mark whether a payload came from the cache
//! - Map gateway errors to `{"error": ...}` bodies with the right status

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use crate::error::GatewayError;

/// Header telling clients whether the payload is a cache fallback.
pub const X_CACHE: &str = "x-cache";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A JSON error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Proxy-path mapping: unreachable backend → 503, anything else → 500
    /// with the error message echoed.
    pub fn from_proxy_error(err: &GatewayError) -> Self {
        if err.is_connection_failure() {
            Self::unavailable("Storage Service is not available")
        } else {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// A raw JSON payload response.
pub fn json_payload(status: StatusCode, body: Bytes, from_cache: bool) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        X_CACHE,
        HeaderValue::from_static(if from_cache { "HIT" } else { "MISS" }),
    );
    response
}
