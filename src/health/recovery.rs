//! Recovery probing for isolated backends.
//!
//! # Responsibilities
//! - Find backends whose circuit is OPEN
//! - Give each one its own recovery timer
//! - Move it to HALF-OPEN when the timer fires, probe once, resolve
//!
//! Timers run as independent tasks, so several OPEN backends are tested in
//! parallel and a slow probe never delays another backend's recovery.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;
use crate::alerting::Notifier;
use crate::health::probe::HealthProber;
use crate::health::report_transition;
use crate::load_balancer::backend::{Backend, BackendEndpoint, CircuitState};
use crate::load_balancer::BackendRegistry;
use crate::resilience::{CircuitBreaker, Transition};

#[derive(Clone)]
pub struct RecoveryProber {
    registry: Arc<BackendRegistry>,
    breaker: CircuitBreaker,
    prober: HealthProber,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl RecoveryProber {
    pub fn new(
        registry: Arc<BackendRegistry>,
        breaker: CircuitBreaker,
        prober: HealthProber,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            breaker,
            prober,
            notifier,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            recovery_timeout_ms = self.breaker.recovery_timeout().as_millis() as u64,
            "Recovery prober starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.schedule_open(&shutdown);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Recovery prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Start a recovery timer for every OPEN backend that lacks one.
    pub fn schedule_open(&self, shutdown: &broadcast::Receiver<()>) {
        for backend in self.registry.backends() {
            if backend.status().circuit_state != CircuitState::Open {
                continue;
            }
            if !backend.try_claim_recovery() {
                continue;
            }

            let prober = self.clone();
            let backend = backend.clone();
            let shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                prober.recover(&backend, shutdown).await;
                backend.release_recovery();
            });
        }
    }

    /// Wait out the recovery timeout, then run the half-open trial.
    async fn recover(&self, backend: &Arc<Backend>, mut shutdown: broadcast::Receiver<()>) {
        let endpoint = &backend.endpoint;
        let Some(deadline) = self.breaker.recovery_deadline(&self.registry.get_status(endpoint)) else {
            return;
        };

        tracing::debug!(backend = %endpoint, "Recovery timer started");

        tokio::select! {
            _ = time::sleep_until(time::Instant::from_std(deadline)) => {}
            _ = shutdown.recv() => return,
        }

        self.trial(endpoint).await;
    }

    /// Half-open trial: exactly one probe, then CLOSED or OPEN.
    pub async fn trial(&self, endpoint: &BackendEndpoint) -> Transition {
        let Some((before, after)) = self
            .registry
            .update_status(endpoint, |current| self.breaker.begin_trial(current))
        else {
            return Transition::None;
        };
        let started = Transition::between(before.circuit_state, after.circuit_state);
        report_transition(endpoint, started, self.notifier.as_ref());

        let result = self.prober.probe(endpoint).await;
        if let Err(e) = &result {
            tracing::debug!(backend = %endpoint, error = %e, "Recovery probe failed");
        }

        let Some((before, after)) = self
            .registry
            .update_status(endpoint, |current| self.breaker.on_trial_result(current, result.is_ok()))
        else {
            return Transition::None;
        };
        let resolved = Transition::between(before.circuit_state, after.circuit_state);
        report_transition(endpoint, resolved, self.notifier.as_ref());
        resolved
    }
}
