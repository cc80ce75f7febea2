//! Backend traits for document stores
//!
//! The pipeline never talks to a concrete store. It consumes these traits,
//! which mirror the small slice of a document-store client the write path
//! needs: open a session, bulk-write into a collection (directly or inside a
//! session), commit or abort the session.
//!
//! Thread safety: a [`DocumentStore`] is shared across conversion workers and
//! transactions (`Send + Sync`). A [`Session`] is owned by exactly one
//! transaction and only needs to be `Send`.

use crate::context::Context;
use crate::error::SinkResult;
use crate::write_model::WriteInstruction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names one collection in one database
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Database name
    pub database: String,
    /// Collection name
    pub name: String,
}

impl CollectionRef {
    /// Create a collection reference
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        CollectionRef {
            database: database.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.name)
    }
}

/// Raw upsert payload addressed to one collection
///
/// `data` is JSON text: empty, one object, or an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertRequest {
    /// Target collection
    pub collection: CollectionRef,
    /// JSON payload
    pub data: Vec<u8>,
}

impl UpsertRequest {
    /// Create a request
    pub fn new(collection: CollectionRef, data: impl Into<Vec<u8>>) -> Self {
        UpsertRequest {
            collection,
            data: data.into(),
        }
    }
}

/// Counts acknowledged by the backend for one bulk write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkWriteAck {
    /// Instructions whose filter matched an existing document
    pub matched: usize,
    /// Matched documents actually changed by the update
    pub modified: usize,
    /// Instructions that inserted a new document
    pub upserted: usize,
}

impl BulkWriteAck {
    /// Total instructions acknowledged
    pub fn total(&self) -> usize {
        self.matched + self.upserted
    }

    /// Accumulate another ack into this one
    pub fn merge(&mut self, other: BulkWriteAck) {
        self.matched += other.matched;
        self.modified += other.modified;
        self.upserted += other.upserted;
    }
}

/// Anything that accepts a bulk write
///
/// Implemented by stores (non-transactional writes) and by sessions (writes
/// staged until commit), so the bulk committer has one seam for both.
pub trait BulkWriter {
    /// Submit `models` to `collection` as one bulk call
    ///
    /// # Errors
    ///
    /// Returns `BulkWriteFailed` if any instruction is rejected, `Cancelled`
    /// if `ctx` fires before the call completes.
    fn bulk_write(
        &mut self,
        ctx: &Context,
        collection: &CollectionRef,
        models: &[WriteInstruction],
    ) -> SinkResult<BulkWriteAck>;
}

/// An open transactional context on the backend
pub trait Session: BulkWriter + Send {
    /// Backend-assigned session identifier, for logging
    fn id(&self) -> String;

    /// Make every write staged in this session durable
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the backend rejects the commit.
    fn commit(&mut self) -> SinkResult<()>;

    /// Discard every write staged in this session
    ///
    /// Takes no context: aborting must succeed even when the caller's
    /// context has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RollbackFailed` if the backend rejects the abort.
    fn abort(&mut self) -> SinkResult<()>;
}

/// Document-store client
pub trait DocumentStore: Send + Sync {
    /// Session type produced by [`DocumentStore::open_session`]
    type Session: Session;

    /// Open a new session
    ///
    /// # Errors
    ///
    /// Returns `SessionUnavailable` if the backend cannot allocate one.
    fn open_session(&self, ctx: &Context) -> SinkResult<Self::Session>;

    /// Non-transactional bulk write
    ///
    /// # Errors
    ///
    /// Same as [`BulkWriter::bulk_write`].
    fn bulk_write(
        &self,
        ctx: &Context,
        collection: &CollectionRef,
        models: &[WriteInstruction],
    ) -> SinkResult<BulkWriteAck>;

    /// Resolve a collection reference
    fn collection(&self, database: &str, name: &str) -> CollectionRef {
        CollectionRef::new(database, name)
    }
}

/// Adapter letting a shared store act as a [`BulkWriter`]
pub struct StoreWriter<'a, S: DocumentStore + ?Sized>(pub &'a S);

impl<S: DocumentStore + ?Sized> BulkWriter for StoreWriter<'_, S> {
    fn bulk_write(
        &mut self,
        ctx: &Context,
        collection: &CollectionRef,
        models: &[WriteInstruction],
    ) -> SinkResult<BulkWriteAck> {
        DocumentStore::bulk_write(self.0, ctx, collection, models)
    }
}
