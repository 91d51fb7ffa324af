//! Resilient storage gateway library.
//!
//! Fronts a set of interchangeable storage services: round-robin over
//! healthy backends, per-backend circuit breaking driven by background
//! health probes, and a last-known-good response cache.

pub mod alerting;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
