//! Fault injection for backend calls
//!
//! Tests arm a [`FaultPoint`] to make the next matching backend call fail,
//! which exercises every error path of the pipeline without a real server.
//!
//! # Example
//!
//! ```
//! use docsink_storage::{FaultInjector, FaultMode, FaultPoint};
//!
//! let faults = FaultInjector::new();
//! faults.arm(FaultPoint::Commit, FaultMode::Once);
//! assert!(faults.trip(FaultPoint::Commit));
//! assert!(!faults.trip(FaultPoint::Commit));
//! ```

use parking_lot::Mutex;
use std::collections::HashMap;

/// Backend call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Opening a session
    OpenSession,
    /// Any bulk write, in or out of a session
    BulkWrite,
    /// Committing a session
    Commit,
    /// Aborting a session
    Abort,
}

impl FaultPoint {
    /// Get all fault points
    pub fn all() -> Vec<FaultPoint> {
        vec![
            FaultPoint::OpenSession,
            FaultPoint::BulkWrite,
            FaultPoint::Commit,
            FaultPoint::Abort,
        ]
    }

    /// Get description of fault point
    pub fn description(&self) -> &'static str {
        match self {
            FaultPoint::OpenSession => "session allocation refused",
            FaultPoint::BulkWrite => "bulk write rejected",
            FaultPoint::Commit => "commit rejected",
            FaultPoint::Abort => "abort rejected",
        }
    }
}

/// How often an armed fault fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Fail the next call, then disarm
    Once,
    /// Fail every call until disarmed
    Always,
    /// Let `n` calls succeed, then fail once
    After(usize),
}

/// Registry of armed faults
#[derive(Debug, Default)]
pub struct FaultInjector {
    armed: Mutex<HashMap<FaultPoint, FaultMode>>,
}

impl FaultInjector {
    /// Create an injector with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `point` with `mode`, replacing any previous mode
    pub fn arm(&self, point: FaultPoint, mode: FaultMode) {
        self.armed.lock().insert(point, mode);
    }

    /// Disarm `point`
    pub fn disarm(&self, point: FaultPoint) {
        self.armed.lock().remove(&point);
    }

    /// Disarm everything
    pub fn clear(&self) {
        self.armed.lock().clear();
    }

    /// Record a call at `point`; returns true if it must fail
    pub fn trip(&self, point: FaultPoint) -> bool {
        let mut armed = self.armed.lock();
        match armed.get(&point).copied() {
            None => false,
            Some(FaultMode::Always) => true,
            Some(FaultMode::Once) | Some(FaultMode::After(0)) => {
                armed.remove(&point);
                true
            }
            Some(FaultMode::After(n)) => {
                armed.insert(point, FaultMode::After(n - 1));
                false
            }
        }
    }
}
