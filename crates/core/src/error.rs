//! Error types for docsink
//!
//! This module defines all error types used throughout the pipeline.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every error belongs to exactly one [`Phase`], so a caller always learns
//! which stage of the pipeline failed (decode, convert, session, bulk write,
//! commit, rollback or configuration).

use std::fmt;
use thiserror::Error;

/// Result type alias for docsink operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Decoding input bytes into structured values
    Decode,
    /// Converting values into write instructions
    Convert,
    /// Opening, using or rotating a backend session
    Session,
    /// Submitting a batch of write instructions
    BulkWrite,
    /// Committing a transaction
    Commit,
    /// Rolling back a transaction
    Rollback,
    /// Loading or validating configuration
    Config,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Decode => "decode",
            Phase::Convert => "convert",
            Phase::Session => "session",
            Phase::BulkWrite => "bulk-write",
            Phase::Commit => "commit",
            Phase::Rollback => "rollback",
            Phase::Config => "config",
        };
        f.write_str(name)
    }
}

/// Error types for the docsink pipeline
#[derive(Debug, Error)]
pub enum SinkError {
    /// Malformed input value tree
    #[error("decode error: {message}")]
    Decode {
        /// What was wrong with the input
        message: String,
    },

    /// A conversion task failed
    #[error("conversion of element {index} failed: {reason}")]
    Convert {
        /// Index of the top-level element whose task failed
        index: usize,
        /// Failure reason
        reason: String,
    },

    /// Backend could not open or maintain a session
    #[error("session unavailable: {reason}")]
    SessionUnavailable {
        /// Backend-reported reason
        reason: String,
    },

    /// Aggregate failure of one bulk write
    #[error("bulk write to {collection} failed: {failed} of {total} writes rejected: {reason}")]
    BulkWriteFailed {
        /// Target collection (`database.name`)
        collection: String,
        /// Number of rejected write instructions
        failed: usize,
        /// Number of write instructions in the batch
        total: usize,
        /// First reported failure
        reason: String,
    },

    /// Backend rejected a commit
    #[error("commit failed: {reason}")]
    CommitFailed {
        /// Backend-reported reason
        reason: String,
    },

    /// Backend rejected an abort
    #[error("rollback failed: {reason}")]
    RollbackFailed {
        /// Backend-reported reason
        reason: String,
    },

    /// Operation cancelled or its deadline expired
    #[error("operation cancelled during {phase}: {reason}")]
    Cancelled {
        /// Stage that observed the cancellation
        phase: Phase,
        /// Cancellation reason
        reason: String,
    },

    /// Operation on a transaction that already reached a terminal state
    #[error("transaction not active (state: {state})")]
    TransactionNotActive {
        /// Current state
        state: String,
    },

    /// Configuration file unreadable or invalid
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong
        message: String,
    },

    /// Any other backend error
    #[error("backend error: {message}")]
    Backend {
        /// Backend-reported message
        message: String,
    },
}

impl SinkError {
    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        SinkError::Decode {
            message: message.into(),
        }
    }

    /// Create a conversion error for the element at `index`
    pub fn convert(index: usize, reason: impl Into<String>) -> Self {
        SinkError::Convert {
            index,
            reason: reason.into(),
        }
    }

    /// Create a session-unavailable error
    pub fn session_unavailable(reason: impl Into<String>) -> Self {
        SinkError::SessionUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a commit-failed error
    pub fn commit_failed(reason: impl Into<String>) -> Self {
        SinkError::CommitFailed {
            reason: reason.into(),
        }
    }

    /// Create a rollback-failed error
    pub fn rollback_failed(reason: impl Into<String>) -> Self {
        SinkError::RollbackFailed {
            reason: reason.into(),
        }
    }

    /// Create a cancellation error observed in `phase`
    pub fn cancelled(phase: Phase, reason: impl Into<String>) -> Self {
        SinkError::Cancelled {
            phase,
            reason: reason.into(),
        }
    }

    /// Create an invalid-config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        SinkError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a generic backend error
    pub fn backend(message: impl Into<String>) -> Self {
        SinkError::Backend {
            message: message.into(),
        }
    }

    /// Pipeline stage this error belongs to
    pub fn phase(&self) -> Phase {
        match self {
            SinkError::Decode { .. } => Phase::Decode,
            SinkError::Convert { .. } => Phase::Convert,
            SinkError::SessionUnavailable { .. } | SinkError::TransactionNotActive { .. } => {
                Phase::Session
            }
            SinkError::BulkWriteFailed { .. } | SinkError::Backend { .. } => Phase::BulkWrite,
            SinkError::CommitFailed { .. } => Phase::Commit,
            SinkError::RollbackFailed { .. } => Phase::Rollback,
            SinkError::Cancelled { phase, .. } => *phase,
            SinkError::InvalidConfig { .. } => Phase::Config,
        }
    }

    /// Whether the caller may retry the whole operation
    ///
    /// Session and bulk-write failures are transient from the pipeline's
    /// point of view: a fresh `start_tx` or a resubmitted batch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SinkError::SessionUnavailable { .. } | SinkError::BulkWriteFailed { .. }
        )
    }

    /// Check if this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SinkError::Cancelled { .. })
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        SinkError::decode(e.to_string())
    }
}
