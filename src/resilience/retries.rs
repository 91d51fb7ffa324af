//! Connect retries for the request path.
//!
//! Only connection failures are retried: the request never reached the
//! backend, so repeating it is safe for any method. Timeouts and upstream
//! errors are returned immediately. Probes never go through this path.

use std::future::Future;
use crate::error::{GatewayError, GatewayResult};
use crate::resilience::backoff::Backoff;

/// Whether a failed attempt may be repeated.
pub fn is_retryable(err: &GatewayError) -> bool {
    err.is_connection_failure()
}

/// Retry budget and delay schedule for one outbound call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    let delay = self.backoff.delay(attempt);
                    tracing::info!(attempt, delay = ?delay, error = %e, "Retrying after connection failure");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
