//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Health monitor (active.rs):
//!     Periodic timer
//!     → Probe each CLOSED backend (probe.rs)
//!     → Update status, open circuit at threshold
//!
//! Recovery prober (recovery.rs):
//!     Periodic scan for OPEN backends
//!     → One timer task per OPEN backend
//!     → HALF-OPEN, single probe, CLOSED or OPEN
//! ```
//!
//! # Design Decisions
//! - Two independent loops, both writing only through
//!   `BackendRegistry::update_status`
//! - Status is locked per backend record
//! - Alerts fire after the lock is released

pub mod active;
pub mod probe;
pub mod recovery;

use crate::alerting::notifier::{isolation_alert, recovery_alert, Notifier};
use crate::load_balancer::BackendEndpoint;
use crate::observability::metrics;
use crate::resilience::Transition;

pub use active::HealthMonitor;
pub use probe::HealthProber;
pub use recovery::RecoveryProber;

/// Log, record and alert on a breaker transition.
pub(crate) fn report_transition(endpoint: &BackendEndpoint, transition: Transition, notifier: &dyn Notifier) {
    let Some(target) = transition.target() else {
        return;
    };

    match transition {
        Transition::Opened => {
            tracing::error!(backend = %endpoint, "Circuit breaker opened");
            let (subject, body) = isolation_alert(endpoint);
            notifier.notify(&subject, &body);
        }
        Transition::HalfOpened => {
            tracing::info!(backend = %endpoint, "Circuit breaker half-open (testing recovery)");
        }
        Transition::Reopened => {
            tracing::error!(backend = %endpoint, "Backend still unavailable, circuit breaker remains open");
        }
        Transition::Recovered => {
            tracing::info!(backend = %endpoint, "Backend has recovered and is running");
            let (subject, body) = recovery_alert(endpoint);
            notifier.notify(&subject, &body);
        }
        Transition::None => {}
    }

    metrics::record_circuit_transition(endpoint.as_str(), target.as_str());
}
