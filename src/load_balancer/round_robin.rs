//! Round-robin load balancing strategy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use crate::load_balancer::{LoadBalancer, backend::Backend};

/// Round-robin selector.
///
/// The cursor is taken modulo the size of the healthy set passed to each
/// call, so it is not a stable index into the full list; it only rotates
/// fairly among whatever is healthy right now.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, healthy: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if healthy.is_empty() {
            return None;
        }

        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(healthy[cursor % healthy.len()].clone())
    }
}
