//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging with backend URL as a field on every health event
//! - Request ID flows from the inbound request into the trace span
//! - Metrics are cheap and recorded unconditionally

pub mod logging;
pub mod metrics;
