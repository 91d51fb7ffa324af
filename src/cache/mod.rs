//! Last-known-good response cache.
//!
//! Holds at most one payload: the body of the most recent successful data
//! fetch. It is overwritten on every success, never invalidated, and read
//! only when no backend can serve a request. Staleness is implicit; there
//! is no TTL.

use std::time::{Duration, SystemTime};
use arc_swap::ArcSwapOption;
use axum::body::Bytes;
use std::sync::Arc;
use crate::load_balancer::BackendEndpoint;

/// A cached payload and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    /// Raw response body, served byte-for-byte.
    pub body: Bytes,
    /// Backend that produced it.
    pub source: BackendEndpoint,
    pub fetched_at: SystemTime,
}

impl CachedPayload {
    /// Time since the payload was fetched. Zero if the clock went backwards.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed().unwrap_or_default()
    }
}

/// Single-slot payload cache shared by all request handlers.
#[derive(Debug, Default)]
pub struct ResponseCache {
    slot: ArcSwapOption<CachedPayload>,
}

impl ResponseCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached payload.
    pub fn store(&self, body: Bytes, source: BackendEndpoint) {
        self.slot.store(Some(Arc::new(CachedPayload {
            body,
            source,
            fetched_at: SystemTime::now(),
        })));
    }

    /// The most recent payload, if any fetch has succeeded yet.
    pub fn get(&self) -> Option<Arc<CachedPayload>> {
        self.slot.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.load().is_none()
    }
}
