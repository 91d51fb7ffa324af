//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend whose circuit is CLOSED
//! - Update availability and failure counts from probe results
//! - Open the circuit when failures reach the threshold

use std::sync::Arc;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;
use crate::alerting::Notifier;
use crate::config::HealthCheckConfig;
use crate::health::probe::HealthProber;
use crate::health::report_transition;
use crate::load_balancer::backend::{BackendEndpoint, CircuitState};
use crate::load_balancer::BackendRegistry;
use crate::observability::metrics;
use crate::resilience::{CircuitBreaker, Transition};

pub struct HealthMonitor {
    registry: Arc<BackendRegistry>,
    breaker: CircuitBreaker,
    prober: HealthProber,
    notifier: Arc<dyn Notifier>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<BackendRegistry>,
        breaker: CircuitBreaker,
        prober: HealthProber,
        notifier: Arc<dyn Notifier>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            registry,
            breaker,
            prober,
            notifier,
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.config.interval_ms,
            path = %self.config.path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.config.interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one health check cycle.
    ///
    /// OPEN backends belong to the recovery prober and HALF-OPEN ones are in
    /// the middle of their single trial probe, so both are skipped. Probes
    /// within a cycle run concurrently and resolve independently.
    pub async fn check_all(&self) {
        let candidates: Vec<BackendEndpoint> = self
            .registry
            .list_all()
            .into_iter()
            .filter(|e| self.registry.get_status(e).circuit_state == CircuitState::Closed)
            .collect();

        join_all(candidates.iter().map(|endpoint| self.check_one(endpoint))).await;
    }

    async fn check_one(&self, endpoint: &BackendEndpoint) {
        let result = self.prober.probe(endpoint).await;

        let applied = self.registry.update_status(endpoint, |current| {
            // The state may have moved while the check was in flight.
            if current.circuit_state != CircuitState::Closed {
                return None;
            }
            Some(match &result {
                Ok(()) => self.breaker.on_probe_success(current),
                Err(_) => self.breaker.on_probe_failure(current),
            })
        });
        let Some((before, after)) = applied else {
            return;
        };

        match &result {
            Ok(()) => tracing::info!(backend = %endpoint, "Backend is running"),
            Err(e) => tracing::error!(
                backend = %endpoint,
                failures = after.consecutive_failures,
                error = %e,
                "Backend is unavailable"
            ),
        }

        metrics::record_backend_health(endpoint.as_str(), after.is_selectable());
        let transition = Transition::between(before.circuit_state, after.circuit_state);
        report_transition(endpoint, transition, self.notifier.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::NoopNotifier;
    use crate::config::BackendConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cycle_counts_failures_and_opens() {
        let registry = Arc::new(BackendRegistry::new(&[BackendConfig::new("a", "http://127.0.0.1:9")]).unwrap());
        let config = HealthCheckConfig {
            timeout_ms: 200,
            ..HealthCheckConfig::default()
        };
        let monitor = HealthMonitor::new(
            registry.clone(),
            CircuitBreaker::new(2, Duration::from_secs(30)),
            HealthProber::new(&config),
            Arc::new(NoopNotifier),
            config,
        );
        let endpoint = registry.list_all()[0].clone();

        monitor.check_all().await;
        let s = registry.get_status(&endpoint);
        assert_eq!(s.consecutive_failures, 1);
        assert_eq!(s.circuit_state, CircuitState::Closed);

        monitor.check_all().await;
        assert_eq!(registry.get_status(&endpoint).circuit_state, CircuitState::Open);

        // OPEN backends are skipped entirely.
        monitor.check_all().await;
        assert_eq!(registry.get_status(&endpoint).consecutive_failures, 2);
    }
}
