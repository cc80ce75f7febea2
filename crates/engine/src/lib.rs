//! Sink engine for docsink
//!
//! This crate orchestrates the lower layers for callers:
//! - DocSink: write-side facade owning the worker pool and metrics
//! - ListWriter: one-shot writes bound to one collection
//! - SinkConfig: `docsink.toml` configuration
//! - Transaction coordination: lifecycle metrics across transactions
//!
//! The engine is the only component that knows about:
//! - Configuration files
//! - Sizing of the conversion pool
//! - Aggregate transaction metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod sink;
pub mod writer;

pub use config::{SinkConfig, CONFIG_FILE_NAME, DEFAULT_DATABASE, DEFAULT_LIFETIME_MS};
pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use sink::DocSink;
pub use writer::ListWriter;
