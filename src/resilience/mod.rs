//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Probe to backend:
//!     → timeouts.rs (bounded probe)
//!     → circuit_breaker.rs (count failures, open/half-open/close)
//!
//! Request to backend:
//!     → timeouts.rs (bounded request)
//!     → On connection failure: retries.rs (retry with backoff.rs delays)
//!     → On final failure: caller falls back to the response cache
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only probes drive the circuit breaker
//! - Retries only for connection failures, never for probes

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, Transition};
