//! Pool occupancy statistics

use serde::{Deserialize, Serialize};

/// Snapshot of a pool's occupancy at one instant.
///
/// For the serialized and per-thread strategies every opened connection
/// stays cached by its thread, so `idle` is always 0 and `waiting` is
/// only meaningful for the bounded strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PoolStats {
    /// Connections created and not yet torn down
    pub total: usize,
    /// Connections sitting in the pool, ready to hand out
    pub idle: usize,
    /// Connections currently checked out
    pub active: usize,
    /// Threads blocked waiting for a connection
    pub waiting: usize,
}

impl PoolStats {
    /// Create a snapshot from raw counts.
    pub fn new(total: usize, idle: usize, active: usize, waiting: usize) -> Self {
        Self {
            total,
            idle,
            active,
            waiting,
        }
    }

    /// Fraction of connections checked out, 0.0 when the pool is empty.
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.active as f64 / self.total as f64
        }
    }

    /// Whether every connection is checked out.
    pub fn is_full(&self) -> bool {
        self.idle == 0 && self.total > 0
    }
}
