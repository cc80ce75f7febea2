//! Cancellation context for backend calls
//!
//! Every backend call takes a [`Context`]. A context carries an optional
//! deadline and a shared cancellation flag; clones share the flag, so
//! cancelling any clone cancels all of them. Children created with
//! [`Context::with_timeout`] inherit the parent's flag and keep the earlier
//! of the two deadlines.

use crate::error::{Phase, SinkError, SinkResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline and cancellation signal threaded through backend calls
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that never expires unless cancelled
    pub fn background() -> Self {
        Context {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Context {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Child context sharing this context's flag, expiring after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let child = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < child => parent,
            _ => child,
        };
        Context {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    /// Cancel this context and every clone of it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline (`None` means unbounded)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fail with `Cancelled` if the context is cancelled or expired
    ///
    /// Called at the start of every backend call. `phase` names the stage
    /// reported in the error.
    pub fn check(&self, phase: Phase) -> SinkResult<()> {
        if self.is_cancelled() {
            return Err(SinkError::cancelled(phase, "context cancelled"));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SinkError::cancelled(phase, "deadline exceeded"));
            }
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::background()
    }
}
