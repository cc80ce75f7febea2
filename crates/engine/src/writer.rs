//! Non-transactional writer bound to one collection
//!
//! Each call converts its input on the sink's worker pool and submits the
//! result as one bulk write directly against the store. Writes are
//! idempotent upserts, so a call may be retried after a failure.

use docsink_concurrency::{commit_batch, Converter};
use docsink_core::{
    decode_json, BulkWriteAck, CollectionRef, Context, DocumentStore, SinkResult, StoreWriter,
    StructuredValue,
};
use std::sync::Arc;

/// Writes value trees into one collection
pub struct ListWriter<S: DocumentStore> {
    store: Arc<S>,
    converter: Converter,
    collection: CollectionRef,
}

impl<S: DocumentStore> ListWriter<S> {
    pub(crate) fn new(store: Arc<S>, converter: Converter, collection: CollectionRef) -> Self {
        ListWriter {
            store,
            converter,
            collection,
        }
    }

    /// Target collection
    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// Convert `root` and upsert every leaf document in one bulk write
    ///
    /// An empty list succeeds without contacting the store.
    ///
    /// # Errors
    ///
    /// `Convert` for a scalar root or a failing element, `BulkWriteFailed`
    /// if the store rejects the batch, `Cancelled` if `ctx` fired.
    pub fn write(&self, ctx: &Context, root: StructuredValue) -> SinkResult<BulkWriteAck> {
        let batch = self.converter.convert_root(ctx, root)?;
        commit_batch(&mut StoreWriter(&*self.store), ctx, &self.collection, &batch)
    }

    /// Write already-decoded top-level values
    pub fn write_values(
        &self,
        ctx: &Context,
        values: Vec<StructuredValue>,
    ) -> SinkResult<BulkWriteAck> {
        let batch = self.converter.convert(ctx, values)?;
        commit_batch(&mut StoreWriter(&*self.store), ctx, &self.collection, &batch)
    }

    /// Decode JSON text and write it
    ///
    /// # Errors
    ///
    /// `Decode` if `data` is not empty, an object or an array.
    pub fn write_json(&self, ctx: &Context, data: &[u8]) -> SinkResult<BulkWriteAck> {
        let values = decode_json(data)?;
        self.write_values(ctx, values)
    }
}

impl<S: DocumentStore> Clone for ListWriter<S> {
    fn clone(&self) -> Self {
        ListWriter {
            store: Arc::clone(&self.store),
            converter: self.converter.clone(),
            collection: self.collection.clone(),
        }
    }
}
