//! Timeout enforcement.
//!
//! Every outbound call has a deadline. Elapsed deadlines become
//! `GatewayError::Timeout`, distinct from connection and upstream errors.

use std::future::Future;
use std::time::Duration;
use tokio::time;
use crate::error::{GatewayError, GatewayResult};

/// Bound `fut` by `limit`, attributing a timeout to `backend`.
pub async fn with_timeout<T, F>(limit: Duration, backend: &str, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            backend: backend.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
