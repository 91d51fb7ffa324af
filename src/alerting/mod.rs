//! Alerting subsystem.
//!
//! # Data Flow
//! ```text
//! Circuit transition (health monitor / recovery prober)
//!     → notifier.rs (isolation or recovery alert)
//!     → webhook (spawned task) or structured log
//! ```

pub mod notifier;

pub use notifier::{LogNotifier, NoopNotifier, Notifier, WebhookNotifier};
