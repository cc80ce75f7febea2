//! Concurrency layer for docsink
//!
//! This crate turns decoded value trees into bulk writes and runs them,
//! optionally inside a rotating transaction:
//! - WorkerPool: fixed-size conversion workers with caller-runs backpressure
//! - Converter: fan-out per top-level element, fan-in into an ordered Batch
//! - commit_batch: one bulk call per batch through the BulkWriter seam
//! - Transaction: ordered write-function queue over a session that is
//!   committed and replaced once it outlives its lifetime

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bulk;
pub mod convert;
pub mod pool;
pub mod transaction;

pub use bulk::commit_batch;
pub use convert::Converter;
pub use pool::{available_parallelism, Dispatch, PoolStats, WorkerPool, DEFAULT_MAX_QUEUE_DEPTH};
pub use transaction::{
    Transaction, TxObserver, TxOptions, TxState, TxStats, TxWriter, DEFAULT_FLUSH_THRESHOLD,
    DEFAULT_LIFETIME,
};
