//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single storage backend by its base URL
//! - Hold the live status record (availability, failures, circuit state)
//! - Apply status updates atomically so readers never see a torn record

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use serde::Serialize;
use url::Url;

/// Immutable identifier of one backend: its base URL without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendEndpoint(String);

impl BackendEndpoint {
    /// Parse a base URL.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw)?;
        Ok(Self(url.as_str().trim_end_matches('/').to_string()))
    }

    /// Absolute URL for `path` on this backend.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.0, path)
        } else {
            format!("{}/{}", self.0, path)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of the last probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Running,
    Unavailable,
    #[default]
    Unknown,
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum CircuitState {
    #[default]
    #[serde(rename = "CLOSED")]
    Closed,
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "HALF-OPEN")]
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF-OPEN",
        }
    }
}

/// Snapshot of one backend's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendStatus {
    pub availability: Availability,
    pub consecutive_failures: u32,
    pub circuit_state: CircuitState,
    /// When the circuit last moved to OPEN; drives the recovery timer.
    pub opened_at: Option<Instant>,
}

impl BackendStatus {
    /// Eligible for load balancer selection.
    pub fn is_selectable(&self) -> bool {
        self.availability == Availability::Running && self.circuit_state != CircuitState::Open
    }

    /// Apply `update` in place. Entering OPEN stamps `opened_at`; any other
    /// state clears it.
    pub fn apply(&mut self, update: StatusUpdate, now: Instant) {
        let was = self.circuit_state;
        self.availability = update.availability;
        self.circuit_state = update.circuit_state;
        self.consecutive_failures = match update.failures {
            FailureDelta::Keep => self.consecutive_failures,
            FailureDelta::Increment => self.consecutive_failures.saturating_add(1),
            FailureDelta::Reset => 0,
        };
        self.opened_at = match update.circuit_state {
            CircuitState::Open if was == CircuitState::Open => self.opened_at.or(Some(now)),
            CircuitState::Open => Some(now),
            _ => None,
        };
    }
}

/// How an update changes the consecutive failure counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDelta {
    Keep,
    Increment,
    Reset,
}

/// A new (availability, circuit state, failure delta) triple for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub availability: Availability,
    pub circuit_state: CircuitState,
    pub failures: FailureDelta,
}

impl StatusUpdate {
    pub fn new(availability: Availability, circuit_state: CircuitState, failures: FailureDelta) -> Self {
        Self {
            availability,
            circuit_state,
            failures,
        }
    }
}

/// Wire view of a status record for `GET /status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusView {
    pub status: Availability,
    pub failures: u32,
    pub state: CircuitState,
}

impl From<BackendStatus> for StatusView {
    fn from(s: BackendStatus) -> Self {
        Self {
            status: s.availability,
            failures: s.consecutive_failures,
            state: s.circuit_state,
        }
    }
}

/// A single storage backend.
#[derive(Debug)]
pub struct Backend {
    /// Name from configuration (for logs).
    pub name: String,
    /// Base URL.
    pub endpoint: BackendEndpoint,
    status: Mutex<BackendStatus>,
    /// Set while a recovery timer is pending for this backend.
    recovery_pending: AtomicBool,
}

impl Backend {
    /// Create a new backend in the UNKNOWN/CLOSED state.
    pub fn new(name: impl Into<String>, endpoint: BackendEndpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
            status: Mutex::new(BackendStatus::default()),
            recovery_pending: AtomicBool::new(false),
        }
    }

    /// Copy of the current status.
    pub fn status(&self) -> BackendStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `f` to the status record under the lock. Production writes
    /// reach this only through `BackendRegistry::update_status`.
    ///
    /// The record is plain `Copy` data, so a poisoned lock still holds a
    /// complete snapshot and is recovered rather than propagated.
    pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut BackendStatus) -> R) -> R {
        let mut guard = self.status.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Claim the recovery timer slot. Returns false if one is already pending.
    pub fn try_claim_recovery(&self) -> bool {
        self.recovery_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the recovery timer slot.
    pub fn release_recovery(&self) {
        self.recovery_pending.store(false, Ordering::Release);
    }
}
