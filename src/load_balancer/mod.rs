//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! GET /data or proxied request
//!     → registry.rs (fixed backend list with live status, healthy subset)
//!     → round_robin.rs (rotate through the healthy subset)
//!     → Return backend or None
//! ```
//!
//! # Design Decisions
//! - The registry is the only owner of status records; every write goes
//!   through `BackendRegistry::update_status`
//! - Only RUNNING backends with a non-OPEN circuit are selectable
//! - Request failures do not feed the circuit breaker; only probes do

pub mod backend;
pub mod registry;
pub mod round_robin;

use std::sync::Arc;
use self::backend::Backend;

/// A backend selection strategy.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick the next backend from `healthy`, the currently selectable set.
    fn next_server(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

pub use backend::{Availability, BackendEndpoint, BackendStatus, CircuitState, FailureDelta, StatusUpdate};
pub use registry::BackendRegistry;
pub use round_robin::RoundRobin;
