//! Core types and traits for docsink
//!
//! This crate defines the foundational types used throughout the pipeline:
//! - StructuredValue / Document: closed value model for decoded input
//! - decode: JSON text to top-level values
//! - walker: lazy decomposition of a value tree into leaf documents
//! - write_model: WriteInstruction (idempotent upsert) and Batch
//! - Context: deadline and cancellation for backend calls
//! - Error: SinkError taxonomy with per-phase reporting
//! - Limits: document nesting and size limits
//! - Traits: DocumentStore, Session, BulkWriter (backend seam)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod decode;
pub mod error;
pub mod limits;
pub mod traits;
pub mod value;
pub mod walker;
pub mod write_model;

pub use context::Context;
pub use decode::{decode_json, decode_str};
pub use error::{Phase, SinkError, SinkResult};
pub use limits::{LimitError, Limits, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH};
pub use traits::{
    BulkWriteAck, BulkWriter, CollectionRef, DocumentStore, Session, StoreWriter, UpsertRequest,
};
pub use value::{Document, StructuredValue};
pub use walker::{leaves, Leaves};
pub use write_model::{build_write_model, Batch, Update, WriteInstruction};
