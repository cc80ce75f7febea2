//! Transaction coordinator: lifecycle metrics for a sink
//!
//! Every transaction started by a [`crate::DocSink`] reports its lifecycle
//! here through the [`TxObserver`] seam:
//! - Active transaction tracking
//! - Started / committed / rolled-back / failed counts
//! - Session rotations

use docsink_concurrency::{TxObserver, TxState};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Transaction coordinator for one sink
///
/// # Memory Ordering
///
/// All counters use Relaxed ordering: they are observational metrics and
/// do not synchronize any other memory operations.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_rolled_back: AtomicU64,
    total_failed: AtomicU64,
    total_rotations: AtomicU64,
}

impl TransactionCoordinator {
    /// Create a coordinator with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record transaction start
    pub fn record_start(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session rotation
    pub fn record_rotation(&self) {
        self.total_rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transaction reaching `state`
    pub fn record_end(&self, state: &TxState) {
        let counter = match state {
            TxState::Open => return,
            TxState::Committed => &self.total_committed,
            TxState::RolledBack => &self.total_rolled_back,
            TxState::Failed { .. } => &self.total_failed,
        };
        // Saturating decrement
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
        counter.fetch_add(1, Ordering::Relaxed);
        debug!(target: "docsink::txn", state = %state, "Transaction ended");
    }

    /// Get transaction metrics
    ///
    /// Returns current snapshot of transaction statistics.
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_rolled_back: self.total_rolled_back.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_rotations: self.total_rotations.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }

    /// Get current active transaction count
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl TxObserver for TransactionCoordinator {
    fn on_begin(&self) {
        self.record_start();
    }

    fn on_rotate(&self) {
        self.record_rotation();
    }

    fn on_end(&self, state: &TxState) {
        self.record_end(state);
    }
}

/// Transaction metrics
///
/// Provides statistics about transaction lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionMetrics {
    /// Number of currently open transactions
    pub active_count: u64,
    /// Total number of transactions started
    pub total_started: u64,
    /// Total number of transactions committed
    pub total_committed: u64,
    /// Total number of transactions rolled back (explicitly or on drop)
    pub total_rolled_back: u64,
    /// Total number of transactions stopped by an error
    pub total_failed: u64,
    /// Total session rotations across all transactions
    pub total_rotations: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Transactions that reached a terminal state
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_rolled_back + self.total_failed
    }

    /// Failure rate (failed / started)
    pub fn failure_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_failed as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}
