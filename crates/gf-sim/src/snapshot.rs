//! Published grid snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gf_solver::{Complex64, GridState};
use parking_lot::RwLock;

/// One published operating point. Never mutated after publication.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSnapshot {
    pub state: GridState,
    /// 0 for the initial solve, then +1 per published cycle
    pub cycle: u64,
    /// Simulation time of the solve (s since service start)
    pub elapsed_s: f64,
    pub published_at: DateTime<Utc>,
    pub slack_voltage: Complex64,
    pub iterations: usize,
    pub solve_ms: f64,
}

/// Single-writer, multi-reader holder of the latest snapshot.
///
/// Readers clone the inner `Arc` under a short read lock; publishing swaps
/// the whole snapshot at once.
#[derive(Debug, Clone)]
pub struct SnapshotCell {
    inner: Arc<RwLock<Arc<GridSnapshot>>>,
}

impl SnapshotCell {
    pub fn new(initial: GridSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// The latest published snapshot.
    pub fn load(&self) -> Arc<GridSnapshot> {
        self.inner.read().clone()
    }

    /// Replace the published snapshot, returning the shared handle.
    pub fn publish(&self, snapshot: GridSnapshot) -> Arc<GridSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.inner.write() = snapshot.clone();
        snapshot
    }

    pub fn cycle(&self) -> u64 {
        self.inner.read().cycle
    }
}
