//! Gateway request handlers.
//!
//! - `GET /data`: load-balanced fetch with cache fallback
//! - `GET /status`: per-backend status snapshot
//! - `GET /health`: gateway liveness
//! - `/{service}/{*path}`: generic proxy to a selected backend

use std::time::Instant;
use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use crate::http::response::{json_payload, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics;

const NO_BACKEND_NO_CACHE: &str = "No Storage Services are available and no cached data is available";
const FETCH_FAILED_NO_CACHE: &str = "Storage Service is not available and no cached data is available";

/// `GET /data`
pub async fn get_data(State(state): State<AppState>) -> Response {
    let start = Instant::now();

    let response = match state.select_backend() {
        None => {
            tracing::warn!("No storage services available");
            serve_cached(&state, NO_BACKEND_NO_CACHE)
        }
        Some(backend) => match state.upstream.fetch_data(&backend.endpoint).await {
            Ok(body) => {
                state.cache.store(body.clone(), backend.endpoint.clone());
                tracing::debug!(backend = %backend.endpoint, "Data fetched and cached");
                json_payload(StatusCode::OK, body, false)
            }
            Err(e) => {
                // Request failures are not fed to the circuit breaker; the
                // health monitor owns that decision.
                tracing::error!(backend = %backend.endpoint, error = %e, "Error fetching data");
                serve_cached(&state, FETCH_FAILED_NO_CACHE)
            }
        },
    };

    metrics::record_request("/data", response.status().as_u16(), start);
    response
}

fn serve_cached(state: &AppState, empty_message: &str) -> Response {
    match state.cache.get() {
        Some(cached) => {
            tracing::info!(
                source = %cached.source,
                age_ms = cached.age().as_millis() as u64,
                "Serving cached data"
            );
            metrics::record_cache_fallback();
            json_payload(StatusCode::OK, cached.body.clone(), true)
        }
        None => ApiError::unavailable(empty_message).into_response(),
    }
}

/// `GET /status`
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.snapshot())
}

/// `GET /health`
pub async fn gateway_health() -> impl IntoResponse {
    Json(json!({ "status": "Gateway service is running" }))
}

/// `GET|POST|PUT|DELETE /{service}/{*path}`
pub async fn proxy(
    State(state): State<AppState>,
    Path((service, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let response = proxy_inner(&state, &service, &path, query, method, &headers, &body).await;
    metrics::record_request("/{service}/{*path}", response.status().as_u16(), start);
    response
}

async fn proxy_inner(
    state: &AppState,
    service: &str,
    path: &str,
    query: Option<String>,
    method: Method,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response {
    tracing::info!(service = %service, path = %path, method = %method, "Proxying request");

    if !state.services.iter().any(|s| s == service) {
        return ApiError::new(StatusCode::NOT_FOUND, format!("Unknown service '{}'", service)).into_response();
    }

    let json_body = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => Some(value),
            Err(e) => {
                return ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)).into_response();
            }
        }
    };

    let Some(backend) = state.select_backend() else {
        tracing::error!(service = %service, "No storage service available for proxy");
        return ApiError::unavailable("Storage Service is not available").into_response();
    };

    let target = match query {
        Some(q) => format!("/{}?{}", path, q),
        None => format!("/{}", path),
    };

    match state
        .upstream
        .forward(&backend.endpoint, method, &target, headers, json_body.as_ref())
        .await
    {
        Ok(proxied) => (proxied.status, Json(proxied.body)).into_response(),
        Err(e) => {
            if e.is_connection_failure() {
                tracing::error!(backend = %backend.endpoint, "Storage Service is not available");
            } else {
                tracing::error!(backend = %backend.endpoint, error = %e, "Error proxying request");
            }
            ApiError::from_proxy_error(&e).into_response()
        }
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}
