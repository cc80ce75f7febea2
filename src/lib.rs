//! docsink - structured-value upsert pipeline for document stores
//!
//! docsink takes decoded JSON-like value trees, decomposes them into leaf
//! documents, turns each leaf into an idempotent upsert (filter and `$set`
//! both equal to the document) and submits the result as bulk writes,
//! either one-shot or inside a transaction whose backend session is
//! committed and replaced once it outlives a configured lifetime.
//!
//! # Quick Start
//!
//! ```
//! use docsink::{Context, DocSink, MemoryStore, UpsertRequest};
//! use std::sync::Arc;
//!
//! # fn main() -> docsink::SinkResult<()> {
//! let sink = DocSink::new(Arc::new(MemoryStore::new()))?;
//! let users = sink.collection("users");
//! let ctx = Context::background();
//!
//! sink.upsert(&ctx, &UpsertRequest::new(users.clone(), r#"[{"name":"a"},{"name":"b"}]"#))?;
//!
//! let mut tx = sink.start_tx(&ctx)?;
//! let coll = users.clone();
//! tx.send(move |ctx, w| {
//!     w.upsert(ctx, &UpsertRequest::new(coll, r#"{"name":"c"}"#))?;
//!     Ok(())
//! })?;
//! tx.commit()?;
//!
//! assert_eq!(sink.store().count(&users), 3);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `docsink-core`: value model, decoding, walker, write model, errors,
//!   backend traits
//! - `docsink-concurrency`: worker pool, converter, bulk committer,
//!   transaction engine
//! - `docsink-storage`: in-memory reference store
//! - `docsink-engine`: configuration, metrics and the [`DocSink`] facade

pub use docsink_concurrency::{
    PoolStats, Transaction, TxObserver, TxOptions, TxState, TxStats, TxWriter,
};
pub use docsink_core::{
    build_write_model, decode_json, decode_str, leaves, Batch, BulkWriteAck, BulkWriter,
    CollectionRef, Context, Document, DocumentStore, Leaves, Limits, Phase, Session, SinkError,
    SinkResult, StructuredValue, UpsertRequest, WriteInstruction,
};
pub use docsink_engine::{DocSink, ListWriter, SinkConfig, TransactionMetrics};
pub use docsink_storage::{
    FaultMode, FaultPoint, MemorySession, MemoryStore, MemoryStoreConfig, StoreStats,
};
