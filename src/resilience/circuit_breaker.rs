//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, backend probed and selectable
//! - Open: backend isolated, skipped by the health monitor and the balancer
//! - Half-Open: the recovery prober's single trial probe is in flight
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive probe failures reach the threshold
//! Open → Half-Open: recovery timeout elapsed (recovery prober's timer)
//! Half-Open → Closed: trial probe succeeds
//! Half-Open → Open: trial probe fails (timer restarts)
//! ```
//!
//! The breaker holds no state of its own. Given the current `BackendStatus`
//! it decides the next `StatusUpdate`; the registry applies it under the
//! backend's lock, and `Transition::between` names what changed so the
//! caller can log and notify outside the lock.

use std::time::{Duration, Instant};
use crate::load_balancer::backend::{
    Availability, BackendStatus, CircuitState, FailureDelta, StatusUpdate,
};

/// A state change produced by a breaker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No state change.
    None,
    /// Closed → Open.
    Opened,
    /// Open → Half-Open.
    HalfOpened,
    /// Half-Open → Open.
    Reopened,
    /// Half-Open → Closed.
    Recovered,
}

impl Transition {
    /// Classify a move from `before` to `after`.
    pub fn between(before: CircuitState, after: CircuitState) -> Self {
        match (before, after) {
            (CircuitState::Closed, CircuitState::Open) => Transition::Opened,
            (CircuitState::Open, CircuitState::HalfOpen) => Transition::HalfOpened,
            (CircuitState::HalfOpen, CircuitState::Open) => Transition::Reopened,
            (CircuitState::HalfOpen | CircuitState::Open, CircuitState::Closed) => Transition::Recovered,
            _ => Transition::None,
        }
    }

    /// State entered by this transition.
    pub fn target(&self) -> Option<CircuitState> {
        match self {
            Transition::None => None,
            Transition::Opened | Transition::Reopened => Some(CircuitState::Open),
            Transition::HalfOpened => Some(CircuitState::HalfOpen),
            Transition::Recovered => Some(CircuitState::Closed),
        }
    }
}

/// Per-backend breaker rules, shared by every backend.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    /// A health monitor probe succeeded.
    pub fn on_probe_success(&self, _current: &BackendStatus) -> StatusUpdate {
        StatusUpdate::new(Availability::Running, CircuitState::Closed, FailureDelta::Reset)
    }

    /// A health monitor probe failed.
    pub fn on_probe_failure(&self, current: &BackendStatus) -> StatusUpdate {
        let failures = current.consecutive_failures.saturating_add(1);
        let state = if current.circuit_state == CircuitState::Closed && failures >= self.failure_threshold {
            CircuitState::Open
        } else {
            current.circuit_state
        };
        StatusUpdate::new(Availability::Unavailable, state, FailureDelta::Increment)
    }

    /// When an open circuit becomes eligible for its half-open trial.
    pub fn recovery_deadline(&self, current: &BackendStatus) -> Option<Instant> {
        match (current.circuit_state, current.opened_at) {
            (CircuitState::Open, Some(opened_at)) => Some(opened_at + self.recovery_timeout),
            _ => None,
        }
    }

    /// Open → Half-Open. `None` in any other state.
    pub fn begin_trial(&self, current: &BackendStatus) -> Option<StatusUpdate> {
        (current.circuit_state == CircuitState::Open)
            .then(|| StatusUpdate::new(current.availability, CircuitState::HalfOpen, FailureDelta::Keep))
    }

    /// Resolve the half-open trial with the outcome of its single probe.
    /// `None` unless the circuit is half-open.
    pub fn on_trial_result(&self, current: &BackendStatus, success: bool) -> Option<StatusUpdate> {
        if current.circuit_state != CircuitState::HalfOpen {
            return None;
        }
        Some(if success {
            StatusUpdate::new(Availability::Running, CircuitState::Closed, FailureDelta::Reset)
        } else {
            StatusUpdate::new(Availability::Unavailable, CircuitState::Open, FailureDelta::Keep)
        })
    }
}
