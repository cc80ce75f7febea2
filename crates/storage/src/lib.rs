//! Storage layer for docsink
//!
//! This crate implements an in-memory reference backend for the pipeline:
//! - MemoryStore: DashMap-backed document store implementing `DocumentStore`
//! - MemorySession: staged, all-or-nothing session writes
//! - Collection: upsert-by-filter document container with `_id` assignment
//! - FaultInjector: armable failures for every backend call
//!
//! The store follows document-database write semantics closely enough for
//! the pipeline's tests: unordered bulk writes, per-session isolation until
//! commit, and a cap on concurrently open sessions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod fault;
pub mod memory;

pub use collection::{ApplyOutcome, Collection, ID_FIELD};
pub use fault::{FaultInjector, FaultMode, FaultPoint};
pub use memory::{MemorySession, MemoryStore, MemoryStoreConfig, StoreStats};
