//! Backend registry.
//!
//! # Responsibilities
//! - Own the fixed list of backends built from configuration
//! - Serve status snapshots to the balancer and the status endpoint
//! - Apply status updates from the health monitor and recovery prober

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::config::BackendConfig;
use std::time::Instant;
use crate::load_balancer::backend::{Backend, BackendEndpoint, BackendStatus, StatusUpdate, StatusView};

/// Error building the registry from configuration.
#[derive(Debug, thiserror::Error)]
#[error("invalid backend url '{url}': {source}")]
pub struct RegistryError {
    pub url: String,
    #[source]
    pub source: url::ParseError,
}

/// The fixed set of backends and their live status.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
}

impl BackendRegistry {
    /// Build the registry. Entries are never added or removed afterwards.
    pub fn new(configs: &[BackendConfig]) -> Result<Self, RegistryError> {
        let backends = configs
            .iter()
            .map(|config| {
                let endpoint = BackendEndpoint::parse(&config.url).map_err(|source| RegistryError {
                    url: config.url.clone(),
                    source,
                })?;
                Ok(Arc::new(Backend::new(config.name.clone(), endpoint)))
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;

        tracing::info!(count = backends.len(), "Backend registry initialized");
        Ok(Self { backends })
    }

    /// All configured endpoints in configuration order.
    pub fn list_all(&self) -> Vec<BackendEndpoint> {
        self.backends.iter().map(|b| b.endpoint.clone()).collect()
    }

    /// All backend records (for the background loops).
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn get(&self, endpoint: &BackendEndpoint) -> Option<&Arc<Backend>> {
        self.backends.iter().find(|b| &b.endpoint == endpoint)
    }

    /// Status of `endpoint`; UNKNOWN/CLOSED if it was never probed or is not registered.
    pub fn get_status(&self, endpoint: &BackendEndpoint) -> BackendStatus {
        self.get(endpoint).map(|b| b.status()).unwrap_or_default()
    }

    /// Atomically update the status of `endpoint`.
    ///
    /// `decide` sees the current record under the backend's lock and returns
    /// the new availability, circuit state and failure delta, or `None` to
    /// leave it untouched. Returns the records before and after the update,
    /// or `None` if the endpoint is unknown or `decide` declined.
    ///
    /// This is the only write path for status records.
    pub fn update_status(
        &self,
        endpoint: &BackendEndpoint,
        decide: impl FnOnce(&BackendStatus) -> Option<StatusUpdate>,
    ) -> Option<(BackendStatus, BackendStatus)> {
        let backend = self.get(endpoint)?;
        backend.modify(|status| {
            let before = *status;
            let update = decide(&before)?;
            status.apply(update, Instant::now());
            Some((before, *status))
        })
    }

    /// Backends currently eligible for selection, in configuration order.
    /// This is the candidate set handed to the load balancer.
    pub fn healthy(&self) -> Vec<Arc<Backend>> {
        self.backends
            .iter()
            .filter(|b| b.status().is_selectable())
            .cloned()
            .collect()
    }

    /// Status view keyed by backend URL, for `GET /status`.
    pub fn snapshot(&self) -> BTreeMap<String, StatusView> {
        self.backends
            .iter()
            .map(|b| (b.endpoint.to_string(), StatusView::from(b.status())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::{Availability, CircuitState, FailureDelta};

    fn set(
        availability: Availability,
        circuit_state: CircuitState,
        failures: FailureDelta,
    ) -> impl FnOnce(&BackendStatus) -> Option<StatusUpdate> {
        move |_| Some(StatusUpdate::new(availability, circuit_state, failures))
    }

    fn registry() -> BackendRegistry {
        BackendRegistry::new(&[
            BackendConfig::new("a", "http://127.0.0.1:5001"),
            BackendConfig::new("b", "http://127.0.0.1:5002"),
        ])
        .unwrap()
    }

    #[test]
    fn test_list_all_preserves_order() {
        let r = registry();
        let all: Vec<String> = r.list_all().iter().map(|e| e.to_string()).collect();
        assert_eq!(all, vec!["http://127.0.0.1:5001", "http://127.0.0.1:5002"]);
    }

    #[test]
    fn test_unknown_endpoint_has_default_status() {
        let r = registry();
        let other = BackendEndpoint::parse("http://127.0.0.1:9999").unwrap();
        assert_eq!(r.get_status(&other), BackendStatus::default());
        assert!(r
            .update_status(&other, set(Availability::Running, CircuitState::Closed, FailureDelta::Reset))
            .is_none());
    }

    #[test]
    fn test_update_status_applies_snapshot() {
        let r = registry();
        let a = r.list_all()[0].clone();

        r.update_status(&a, set(Availability::Unavailable, CircuitState::Closed, FailureDelta::Increment));
        let (before, s) = r
            .update_status(&a, set(Availability::Unavailable, CircuitState::Open, FailureDelta::Increment))
            .unwrap();
        assert_eq!(before.circuit_state, CircuitState::Closed);
        assert_eq!(s.consecutive_failures, 2);
        assert_eq!(s.circuit_state, CircuitState::Open);
        assert!(s.opened_at.is_some());

        let (_, s) = r
            .update_status(&a, set(Availability::Running, CircuitState::Closed, FailureDelta::Reset))
            .unwrap();
        assert_eq!(s.consecutive_failures, 0);
        assert_eq!(s.opened_at, None);
        assert_eq!(r.get_status(&a), s);
    }

    #[test]
    fn test_declined_update_leaves_record() {
        let r = registry();
        let a = r.list_all()[0].clone();
        r.update_status(&a, set(Availability::Running, CircuitState::Closed, FailureDelta::Reset));

        let seen = std::cell::Cell::new(None);
        let result = r.update_status(&a, |current| {
            seen.set(Some(current.availability));
            None
        });
        assert!(result.is_none());
        assert_eq!(seen.get(), Some(Availability::Running));
        assert_eq!(r.get_status(&a).availability, Availability::Running);
    }

    #[test]
    fn test_healthy_filters_running_backends() {
        let r = registry();
        assert!(r.healthy().is_empty());

        let b = r.list_all()[1].clone();
        r.update_status(&b, set(Availability::Running, CircuitState::Closed, FailureDelta::Reset));
        let a = r.list_all()[0].clone();
        r.update_status(&a, set(Availability::Running, CircuitState::Open, FailureDelta::Increment));
        let healthy = r.healthy();
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].endpoint, b);
    }

    #[test]
    fn test_snapshot_is_keyed_by_url() {
        let r = registry();
        let snapshot = r.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["http://127.0.0.1:5001"].state, CircuitState::Closed);
        assert_eq!(snapshot["http://127.0.0.1:5002"].status, Availability::Unknown);
    }
}
