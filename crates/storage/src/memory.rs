//! MemoryStore: in-memory document store with sessions
//!
//! ## Design
//!
//! - Collections live in a `DashMap` keyed by [`CollectionRef`]; reads only
//!   lock the target shard.
//! - Non-transactional bulk writes are unordered: every valid instruction is
//!   applied, rejected ones are reported together as one `BulkWriteFailed`.
//! - A [`MemorySession`] stages its writes. Each collection it touches gets a
//!   private working copy, so acks (and reads through the session) reflect
//!   the session's own writes. Commit replays the staged instructions against
//!   the live collections under the commit lock; abort drops them.
//! - The number of concurrently open sessions is capped; exceeding the cap
//!   yields `SessionUnavailable`.
//!
//! ## Thread Safety
//!
//! `MemoryStore` is `Clone + Send + Sync`; clones share the same data.

use crate::collection::{validate_instruction, ApplyOutcome, Collection};
use crate::fault::{FaultInjector, FaultPoint};
use dashmap::DashMap;
use docsink_core::{
    BulkWriteAck, BulkWriter, CollectionRef, Context, Document, DocumentStore, Phase, Session,
    SinkError, SinkResult, WriteInstruction,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default cap on concurrently open sessions
pub const DEFAULT_MAX_OPEN_SESSIONS: usize = 64;

/// Configuration for [`MemoryStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStoreConfig {
    /// Maximum concurrently open sessions
    pub max_open_sessions: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        MemoryStoreConfig {
            max_open_sessions: DEFAULT_MAX_OPEN_SESSIONS,
        }
    }
}

/// Store metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Bulk write calls received, in or out of sessions
    pub bulk_write_calls: u64,
    /// Sessions committed
    pub commits: u64,
    /// Sessions aborted (explicitly or by drop)
    pub aborts: u64,
    /// Sessions currently open
    pub open_sessions: usize,
}

struct StoreInner {
    collections: DashMap<CollectionRef, Collection>,
    commit_lock: Mutex<()>,
    faults: FaultInjector,
    next_session_id: AtomicU64,
    open_sessions: AtomicUsize,
    bulk_write_calls: AtomicU64,
    commits: AtomicU64,
    aborts: AtomicU64,
    config: MemoryStoreConfig,
}

impl StoreInner {
    fn release_session(&self) {
        self.open_sessions.fetch_sub(1, Ordering::AcqRel);
    }
}

fn record(ack: &mut BulkWriteAck, outcome: ApplyOutcome) {
    match outcome {
        ApplyOutcome::Matched { modified } => {
            ack.matched += 1;
            if modified {
                ack.modified += 1;
            }
        }
        ApplyOutcome::Upserted => ack.upserted += 1,
        ApplyOutcome::Unmatched => {}
    }
}

fn injected_bulk_failure(collection: &CollectionRef, total: usize) -> SinkError {
    SinkError::BulkWriteFailed {
        collection: collection.to_string(),
        failed: total,
        total,
        reason: FaultPoint::BulkWrite.description().to_string(),
    }
}

/// Split `models` into accepted instructions and the aggregate failure
fn validate_all(
    collection: &CollectionRef,
    models: &[WriteInstruction],
) -> (Vec<usize>, Option<SinkError>) {
    let mut accepted = Vec::with_capacity(models.len());
    let mut failed = 0;
    let mut first_reason = None;
    for (i, model) in models.iter().enumerate() {
        match validate_instruction(model) {
            Ok(()) => accepted.push(i),
            Err(reason) => {
                failed += 1;
                first_reason.get_or_insert_with(|| format!("write {}: {}", i, reason));
            }
        }
    }
    let error = first_reason.map(|reason| SinkError::BulkWriteFailed {
        collection: collection.to_string(),
        failed,
        total: models.len(),
        reason,
    });
    (accepted, error)
}

/// In-memory document store
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create an empty store
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        MemoryStore {
            inner: Arc::new(StoreInner {
                collections: DashMap::new(),
                commit_lock: Mutex::new(()),
                faults: FaultInjector::new(),
                next_session_id: AtomicU64::new(1),
                open_sessions: AtomicUsize::new(0),
                bulk_write_calls: AtomicU64::new(0),
                commits: AtomicU64::new(0),
                aborts: AtomicU64::new(0),
                config,
            }),
        }
    }

    /// Fault injection hooks
    pub fn faults(&self) -> &FaultInjector {
        &self.inner.faults
    }

    /// Return a snapshot of store metrics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            bulk_write_calls: self.inner.bulk_write_calls.load(Ordering::Relaxed),
            commits: self.inner.commits.load(Ordering::Relaxed),
            aborts: self.inner.aborts.load(Ordering::Relaxed),
            open_sessions: self.inner.open_sessions.load(Ordering::Relaxed),
        }
    }

    /// Committed documents in `collection` matching `filter`
    pub fn find(&self, collection: &CollectionRef, filter: &Document) -> Vec<Document> {
        self.inner
            .collections
            .get(collection)
            .map(|c| c.find(filter))
            .unwrap_or_default()
    }

    /// First committed document matching `filter`
    pub fn find_one(&self, collection: &CollectionRef, filter: &Document) -> Option<Document> {
        self.find(collection, filter).into_iter().next()
    }

    /// All committed documents in `collection`
    pub fn documents(&self, collection: &CollectionRef) -> Vec<Document> {
        self.inner
            .collections
            .get(collection)
            .map(|c| c.documents().to_vec())
            .unwrap_or_default()
    }

    /// Number of committed documents in `collection`
    pub fn count(&self, collection: &CollectionRef) -> usize {
        self.inner
            .collections
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Drop `collection`; returns true if it existed
    pub fn drop_collection(&self, collection: &CollectionRef) -> bool {
        let _guard = self.inner.commit_lock.lock();
        self.inner.collections.remove(collection).is_some()
    }

    /// Names of the collections in `database`, sorted
    pub fn list_collections(&self, database: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .collections
            .iter()
            .filter(|entry| entry.key().database == database)
            .map(|entry| entry.key().name.clone())
            .collect();
        names.sort();
        names
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("collections", &self.inner.collections.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl DocumentStore for MemoryStore {
    type Session = MemorySession;

    fn open_session(&self, ctx: &Context) -> SinkResult<MemorySession> {
        ctx.check(Phase::Session)?;

        if self.inner.faults.trip(FaultPoint::OpenSession) {
            return Err(SinkError::session_unavailable(
                FaultPoint::OpenSession.description(),
            ));
        }

        let max = self.inner.config.max_open_sessions;
        self.inner
            .open_sessions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                (open < max).then_some(open + 1)
            })
            .map_err(|open| {
                SinkError::session_unavailable(format!(
                    "{} sessions open, limit is {}",
                    open, max
                ))
            })?;

        let id = self.inner.next_session_id.fetch_add(1, Ordering::Relaxed);
        debug!(target: "docsink::store", session = id, "Session opened");

        Ok(MemorySession {
            id,
            inner: Arc::clone(&self.inner),
            views: HashMap::new(),
            staged: Vec::new(),
            state: SessionState::Open,
        })
    }

    fn bulk_write(
        &self,
        ctx: &Context,
        collection: &CollectionRef,
        models: &[WriteInstruction],
    ) -> SinkResult<BulkWriteAck> {
        ctx.check(Phase::BulkWrite)?;
        self.inner.bulk_write_calls.fetch_add(1, Ordering::Relaxed);

        if self.inner.faults.trip(FaultPoint::BulkWrite) {
            return Err(injected_bulk_failure(collection, models.len()));
        }

        let (accepted, error) = validate_all(collection, models);

        let mut ack = BulkWriteAck::default();
        {
            let _guard = self.inner.commit_lock.lock();
            let mut coll = self.inner.collections.entry(collection.clone()).or_default();
            for i in accepted {
                record(&mut ack, coll.apply(&models[i]));
            }
        }

        match error {
            Some(e) => Err(e),
            None => Ok(ack),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    Aborted,
}

/// Session on a [`MemoryStore`]
///
/// Dropping an open session aborts it.
pub struct MemorySession {
    id: u64,
    inner: Arc<StoreInner>,
    views: HashMap<CollectionRef, Collection>,
    staged: Vec<(CollectionRef, WriteInstruction)>,
    state: SessionState,
}

impl MemorySession {
    /// Number of instructions staged for commit
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    fn ensure_open(&self) -> SinkResult<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Committed => Err(SinkError::backend("session already committed")),
            SessionState::Aborted => Err(SinkError::backend("session already aborted")),
        }
    }

    fn end(&mut self, state: SessionState) {
        self.state = state;
        self.views.clear();
        self.staged.clear();
        self.inner.release_session();
    }
}

impl BulkWriter for MemorySession {
    fn bulk_write(
        &mut self,
        ctx: &Context,
        collection: &CollectionRef,
        models: &[WriteInstruction],
    ) -> SinkResult<BulkWriteAck> {
        ctx.check(Phase::BulkWrite)?;
        self.ensure_open()?;
        self.inner.bulk_write_calls.fetch_add(1, Ordering::Relaxed);

        if self.inner.faults.trip(FaultPoint::BulkWrite) {
            return Err(injected_bulk_failure(collection, models.len()));
        }

        // Inside a transaction a rejected write stages nothing
        let (_, error) = validate_all(collection, models);
        if let Some(e) = error {
            return Err(e);
        }

        // Staged copy: the first write to a collection clones its committed
        // documents, so each session pays O(collection size) once per
        // collection it touches. Later writes in the session reuse the view.
        let inner = &self.inner;
        let view = self.views.entry(collection.clone()).or_insert_with(|| {
            inner
                .collections
                .get(collection)
                .map(|c| c.value().clone())
                .unwrap_or_default()
        });

        let mut ack = BulkWriteAck::default();
        for model in models {
            record(&mut ack, view.apply(model));
            self.staged.push((collection.clone(), model.clone()));
        }
        Ok(ack)
    }
}

impl Session for MemorySession {
    fn id(&self) -> String {
        format!("mem-session-{}", self.id)
    }

    fn commit(&mut self) -> SinkResult<()> {
        self.ensure_open()
            .map_err(|e| SinkError::commit_failed(e.to_string()))?;

        if self.inner.faults.trip(FaultPoint::Commit) {
            self.inner.aborts.fetch_add(1, Ordering::Relaxed);
            self.end(SessionState::Aborted);
            return Err(SinkError::commit_failed(FaultPoint::Commit.description()));
        }

        let applied = self.staged.len();
        {
            let _guard = self.inner.commit_lock.lock();
            for (collection, model) in &self.staged {
                self.inner
                    .collections
                    .entry(collection.clone())
                    .or_default()
                    .apply(model);
            }
        }

        self.inner.commits.fetch_add(1, Ordering::Relaxed);
        debug!(target: "docsink::store", session = self.id, applied, "Session committed");
        self.end(SessionState::Committed);
        Ok(())
    }

    fn abort(&mut self) -> SinkResult<()> {
        self.ensure_open()
            .map_err(|e| SinkError::rollback_failed(e.to_string()))?;

        let discarded = self.staged.len();
        self.inner.aborts.fetch_add(1, Ordering::Relaxed);
        self.end(SessionState::Aborted);
        debug!(target: "docsink::store", session = self.id, discarded, "Session aborted");

        // Staged writes are gone either way; the fault only changes the report
        if self.inner.faults.trip(FaultPoint::Abort) {
            return Err(SinkError::rollback_failed(FaultPoint::Abort.description()));
        }
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if matches!(self.state, SessionState::Open) {
            self.inner.aborts.fetch_add(1, Ordering::Relaxed);
            self.end(SessionState::Aborted);
        }
    }
}
