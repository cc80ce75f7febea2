//! Bulk committer
//!
//! Submits a converted batch as one bulk call through the [`BulkWriter`]
//! seam, so the same path serves non-transactional store writes and writes
//! staged in a session.

use docsink_core::{Batch, BulkWriteAck, BulkWriter, CollectionRef, Context, SinkError, SinkResult};
use tracing::debug;

/// Submit `batch` to `collection` as one bulk write
///
/// An empty batch succeeds with a zero ack without contacting the backend.
/// Partial failures are not retried.
///
/// # Errors
///
/// Any backend failure other than cancellation is reported as a single
/// `BulkWriteFailed` naming the collection. `Cancelled` passes through.
pub fn commit_batch<W: BulkWriter + ?Sized>(
    writer: &mut W,
    ctx: &Context,
    collection: &CollectionRef,
    batch: &Batch,
) -> SinkResult<BulkWriteAck> {
    if batch.is_empty() {
        return Ok(BulkWriteAck::default());
    }

    let ack = writer
        .bulk_write(ctx, collection, batch.instructions())
        .map_err(|e| into_bulk_error(e, collection, batch.len()))?;

    debug!(
        target: "docsink::store",
        collection = %collection,
        writes = batch.len(),
        matched = ack.matched,
        modified = ack.modified,
        upserted = ack.upserted,
        "Bulk write committed"
    );
    Ok(ack)
}

fn into_bulk_error(error: SinkError, collection: &CollectionRef, total: usize) -> SinkError {
    match error {
        e @ (SinkError::BulkWriteFailed { .. } | SinkError::Cancelled { .. }) => e,
        other => SinkError::BulkWriteFailed {
            collection: collection.to_string(),
            failed: total,
            total,
            reason: other.to_string(),
        },
    }
}
