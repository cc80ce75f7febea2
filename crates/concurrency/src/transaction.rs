//! Transaction engine with lifetime rotation
//!
//! A [`Transaction`] queues write functions and executes them, strictly in
//! submission order, against one backend session. Backend sessions have a
//! bounded lifetime, so the engine rotates: before executing each queued
//! entry it compares the session's age with the configured lifetime and, if
//! exceeded, commits the current session and opens a fresh one.
//!
//! ## Durability model
//!
//! A rotated transaction is a chain of independently committed
//! sub-transactions, not one atomic unit. Work committed by a rotation stays
//! committed even if the transaction is later rolled back, fails, or is
//! dropped. Only the current session's work is atomic.
//!
//! ## State machine
//!
//! ```text
//! Open ──rotate──> Open
//!   ├──commit────> Committed
//!   ├──rollback──> RolledBack
//!   └──error─────> Failed
//! ```
//!
//! `Committed`, `RolledBack` and `Failed` are terminal. A write-function
//! error, a failed rotation or a cancelled context aborts the current
//! session, drops every queued entry and leaves the transaction `Failed`;
//! later calls return `TransactionNotActive`.

use crate::bulk::commit_batch;
use crate::convert::Converter;
use docsink_core::{
    decode_json, Batch, BulkWriteAck, CollectionRef, Context, DocumentStore, Phase, Session,
    SinkError, SinkResult, StructuredValue, UpsertRequest,
};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default session lifetime (50 seconds, below the common 60 s server-side
/// transaction limit)
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(50);

/// Default flush threshold: every send executes immediately
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1;

/// Options fixed at transaction construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    /// Maximum age of a session before the engine rotates it
    pub lifetime: Duration,
    /// Queue length that triggers execution of queued entries
    pub flush_threshold: usize,
}

impl Default for TxOptions {
    fn default() -> Self {
        TxOptions {
            lifetime: DEFAULT_LIFETIME,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl TxOptions {
    /// Set the session lifetime
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the flush threshold
    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    /// Reject a zero lifetime or a zero flush threshold
    pub fn validate(&self) -> SinkResult<()> {
        if self.lifetime.is_zero() {
            return Err(SinkError::invalid_config("transaction lifetime must be > 0"));
        }
        if self.flush_threshold == 0 {
            return Err(SinkError::invalid_config("flush threshold must be >= 1"));
        }
        Ok(())
    }
}

/// Transaction state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxState {
    /// Accepting sends
    Open,
    /// Final session committed
    Committed,
    /// Final session aborted by rollback (or drop)
    RolledBack,
    /// Stopped by an error; the session was aborted
    Failed {
        /// Error that stopped the transaction
        reason: String,
    },
}

impl TxState {
    /// True for every state except `Open`
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxState::Open)
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxState::Open => f.write_str("open"),
            TxState::Committed => f.write_str("committed"),
            TxState::RolledBack => f.write_str("rolled back"),
            TxState::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Transaction statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxStats {
    /// Sessions committed and replaced because they outlived the lifetime
    pub rotations: u64,
    /// Write functions executed successfully
    pub executed: u64,
    /// Write functions still queued
    pub pending: usize,
    /// Age of the current session
    pub session_elapsed: Duration,
}

/// Receives transaction lifecycle events
///
/// Implemented by the sink's metrics coordinator.
pub trait TxObserver: Send + Sync {
    /// A transaction opened its first session
    fn on_begin(&self) {}
    /// A session was rotated
    fn on_rotate(&self) {}
    /// A transaction reached a terminal state
    fn on_end(&self, _state: &TxState) {}
}

/// Write access handed to a write function
///
/// Bound to the transaction's current session: everything written through
/// it is staged in that session.
pub struct TxWriter<'a, W: Session> {
    session: &'a mut W,
    converter: &'a Converter,
}

impl<'a, W: Session> TxWriter<'a, W> {
    /// Id of the session writes are staged in
    pub fn session_id(&self) -> String {
        self.session.id()
    }

    /// Convert `root` and stage it as one bulk write
    pub fn write(
        &mut self,
        ctx: &Context,
        collection: &CollectionRef,
        root: StructuredValue,
    ) -> SinkResult<BulkWriteAck> {
        let batch = self.converter.convert_root(ctx, root)?;
        self.bulk_write(ctx, collection, &batch)
    }

    /// Convert top-level `values` and stage them as one bulk write
    pub fn write_values(
        &mut self,
        ctx: &Context,
        collection: &CollectionRef,
        values: Vec<StructuredValue>,
    ) -> SinkResult<BulkWriteAck> {
        let batch = self.converter.convert(ctx, values)?;
        self.bulk_write(ctx, collection, &batch)
    }

    /// Decode the request payload and stage it
    pub fn upsert(&mut self, ctx: &Context, request: &UpsertRequest) -> SinkResult<BulkWriteAck> {
        let values = decode_json(&request.data)?;
        self.write_values(ctx, &request.collection, values)
    }

    /// Stage an already-built batch
    pub fn bulk_write(
        &mut self,
        ctx: &Context,
        collection: &CollectionRef,
        batch: &Batch,
    ) -> SinkResult<BulkWriteAck> {
        commit_batch(&mut *self.session, ctx, collection, batch)
    }
}

type WriteFn<W> = Box<dyn FnOnce(&Context, &mut TxWriter<'_, W>) -> SinkResult<()> + Send>;

/// Queue of write functions executed against a rotating session
///
/// Single-threaded: every operation takes `&mut self` or `self`.
pub struct Transaction<S: DocumentStore> {
    store: Arc<S>,
    converter: Converter,
    ctx: Context,
    options: TxOptions,
    session: Option<S::Session>,
    started: Instant,
    queue: VecDeque<WriteFn<S::Session>>,
    state: TxState,
    rotations: u64,
    executed: u64,
    observer: Option<Arc<dyn TxObserver>>,
}

impl<S: DocumentStore> Transaction<S> {
    /// Open a session and start a transaction
    ///
    /// `ctx` governs every backend call the transaction makes.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `options` are invalid
    /// - `SessionUnavailable` if the backend cannot allocate a session
    /// - `Cancelled` if `ctx` already fired
    pub fn begin(
        store: Arc<S>,
        converter: Converter,
        ctx: Context,
        options: TxOptions,
        observer: Option<Arc<dyn TxObserver>>,
    ) -> SinkResult<Self> {
        options.validate()?;
        let session = store.open_session(&ctx)?;

        debug!(
            target: "docsink::txn",
            session = %session.id(),
            lifetime_ms = options.lifetime.as_millis() as u64,
            flush_threshold = options.flush_threshold,
            "Transaction started"
        );
        if let Some(observer) = &observer {
            observer.on_begin();
        }

        Ok(Transaction {
            store,
            converter,
            ctx,
            options,
            session: Some(session),
            started: Instant::now(),
            queue: VecDeque::new(),
            state: TxState::Open,
            rotations: 0,
            executed: 0,
            observer,
        })
    }

    /// Enqueue a write function
    ///
    /// Queued entries execute once the queue reaches the flush threshold
    /// (with the default threshold of 1, immediately).
    ///
    /// # Errors
    ///
    /// Returns the error of any entry executed by this call; the
    /// transaction is then `Failed`. Returns `TransactionNotActive` if the
    /// transaction already reached a terminal state.
    pub fn send<F>(&mut self, write_fn: F) -> SinkResult<()>
    where
        F: FnOnce(&Context, &mut TxWriter<'_, S::Session>) -> SinkResult<()> + Send + 'static,
    {
        self.ensure_open()?;
        self.queue.push_back(Box::new(write_fn));
        if self.queue.len() >= self.options.flush_threshold {
            self.flush()
        } else {
            Ok(())
        }
    }

    /// Execute every queued entry now
    ///
    /// # Errors
    ///
    /// Same as [`Transaction::send`].
    pub fn flush(&mut self) -> SinkResult<()> {
        self.ensure_open()?;
        while let Some(write_fn) = self.queue.pop_front() {
            if let Err(e) = self.execute(write_fn) {
                return Err(self.fail(e));
            }
        }
        Ok(())
    }

    /// Execute queued entries, then commit the current session
    ///
    /// Returns the final statistics.
    ///
    /// # Errors
    ///
    /// - the error of a failing queued entry
    /// - `CommitFailed` if the backend rejects the commit
    /// - `Cancelled` if the context fired
    /// - `TransactionNotActive` after a previous failure
    pub fn commit(mut self) -> SinkResult<TxStats> {
        self.flush()?;
        if let Err(e) = self.ctx.check(Phase::Commit) {
            return Err(self.fail(e));
        }

        let mut session = match self.session.take() {
            Some(session) => session,
            None => return Err(self.fail(SinkError::session_unavailable("no live session"))),
        };
        let session_id = session.id();

        match session.commit() {
            Ok(()) => {
                self.finish(TxState::Committed);
                debug!(
                    target: "docsink::txn",
                    session = %session_id,
                    executed = self.executed,
                    rotations = self.rotations,
                    "Transaction committed"
                );
                Ok(self.stats())
            }
            Err(e) => {
                let e = match e {
                    e @ (SinkError::CommitFailed { .. } | SinkError::Cancelled { .. }) => e,
                    other => SinkError::commit_failed(other.to_string()),
                };
                self.finish(TxState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Discard queued entries and abort the current session
    ///
    /// Work committed by earlier rotations is not undone.
    ///
    /// # Errors
    ///
    /// - `RollbackFailed` if the backend rejects the abort
    /// - `TransactionNotActive` after a previous failure
    pub fn rollback(mut self) -> SinkResult<()> {
        self.ensure_open()?;
        let discarded = self.queue.len();
        self.queue.clear();

        let result = match self.session.take() {
            Some(mut session) => session.abort(),
            None => Ok(()),
        };

        match result {
            Ok(()) => {
                self.finish(TxState::RolledBack);
                debug!(
                    target: "docsink::txn",
                    discarded,
                    rotations = self.rotations,
                    "Transaction rolled back"
                );
                Ok(())
            }
            Err(e) => {
                let e = match e {
                    e @ SinkError::RollbackFailed { .. } => e,
                    other => SinkError::rollback_failed(other.to_string()),
                };
                self.finish(TxState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Current state
    pub fn state(&self) -> &TxState {
        &self.state
    }

    /// Options fixed at construction
    pub fn options(&self) -> TxOptions {
        self.options
    }

    /// Id of the current session, if one is live
    pub fn session_id(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.id())
    }

    /// Statistics snapshot
    pub fn stats(&self) -> TxStats {
        TxStats {
            rotations: self.rotations,
            executed: self.executed,
            pending: self.queue.len(),
            session_elapsed: self.started.elapsed(),
        }
    }

    fn ensure_open(&self) -> SinkResult<()> {
        if self.state.is_terminal() {
            return Err(SinkError::TransactionNotActive {
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    fn execute(&mut self, write_fn: WriteFn<S::Session>) -> SinkResult<()> {
        self.ctx.check(Phase::Session)?;
        if self.started.elapsed() > self.options.lifetime {
            self.rotate()?;
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| SinkError::session_unavailable("no live session"))?;
        let mut writer = TxWriter {
            session,
            converter: &self.converter,
        };
        write_fn(&self.ctx, &mut writer)?;
        self.executed += 1;
        Ok(())
    }

    /// Commit the current session and replace it with a fresh one
    fn rotate(&mut self) -> SinkResult<()> {
        let elapsed = self.started.elapsed();
        let mut old = self
            .session
            .take()
            .ok_or_else(|| SinkError::session_unavailable("no live session"))?;
        let old_id = old.id();
        old.commit()?;
        drop(old);

        let session = self.store.open_session(&self.ctx)?;
        let new_id = session.id();
        self.session = Some(session);
        self.started = Instant::now();
        self.rotations += 1;

        info!(
            target: "docsink::txn",
            old_session = %old_id,
            new_session = %new_id,
            elapsed_ms = elapsed.as_millis() as u64,
            rotations = self.rotations,
            "Session exceeded lifetime; committed and rotated"
        );
        if let Some(observer) = &self.observer {
            observer.on_rotate();
        }
        Ok(())
    }

    /// Abort the session, drop the queue and enter `Failed`
    fn fail(&mut self, error: SinkError) -> SinkError {
        let dropped = self.queue.len();
        self.queue.clear();
        if let Some(mut session) = self.session.take() {
            if let Err(abort_err) = session.abort() {
                warn!(
                    target: "docsink::txn",
                    session = %session.id(),
                    error = %abort_err,
                    "Failed to abort session after error"
                );
            }
        }
        debug!(
            target: "docsink::txn",
            error = %error,
            phase = %error.phase(),
            dropped,
            "Transaction failed"
        );
        self.finish(TxState::Failed {
            reason: error.to_string(),
        });
        error
    }

    fn finish(&mut self, state: TxState) {
        self.state = state;
        if let Some(observer) = &self.observer {
            observer.on_end(&self.state);
        }
    }
}

impl<S: DocumentStore> Drop for Transaction<S> {
    fn drop(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let pending = self.queue.len();
        self.queue.clear();
        let session_id = self.session_id().unwrap_or_default();
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.abort() {
                warn!(target: "docsink::txn", session = %session_id, error = %e, "Failed to abort session on drop");
            }
        }
        warn!(
            target: "docsink::txn",
            session = %session_id,
            pending,
            "Transaction dropped while open; current session aborted"
        );
        self.finish(TxState::RolledBack);
    }
}

impl<S: DocumentStore> fmt::Debug for Transaction<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("session", &self.session_id())
            .field("state", &self.state)
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish()
    }
}
