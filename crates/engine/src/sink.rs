//! DocSink: the write-side facade over a document store
//!
//! A sink owns the conversion worker pool and the transaction metrics for
//! one store. It offers two write paths:
//!
//! - **One-shot**: [`DocSink::write`] / [`DocSink::upsert`] convert the input
//!   and submit one non-transactional bulk write.
//! - **Transactional**: [`DocSink::start_tx`] returns a [`Transaction`] whose
//!   session rotates once it outlives the configured lifetime. A long
//!   transaction is therefore a chain of committed sub-transactions; only
//!   the current session's work is undone by rollback.

use crate::config::SinkConfig;
use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use crate::writer::ListWriter;
use docsink_concurrency::{
    Converter, PoolStats, Transaction, TxObserver, TxOptions, TxStats, WorkerPool,
};
use docsink_core::{
    decode_json, BulkWriteAck, CollectionRef, Context, DocumentStore, Limits, SinkError,
    SinkResult, StructuredValue, UpsertRequest,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Write-side facade over a [`DocumentStore`]
pub struct DocSink<S: DocumentStore> {
    store: Arc<S>,
    converter: Converter,
    config: SinkConfig,
    coordinator: Arc<TransactionCoordinator>,
}

impl<S: DocumentStore> DocSink<S> {
    /// Create a sink with the default configuration
    pub fn new(store: Arc<S>) -> SinkResult<Self> {
        Self::with_config(store, SinkConfig::default())
    }

    /// Create a sink from `docsink.toml` in `dir`, writing the default file
    /// if it is missing
    pub fn open(store: Arc<S>, dir: &Path) -> SinkResult<Self> {
        Self::with_config(store, SinkConfig::load_or_create(dir)?)
    }

    /// Create a sink with an explicit configuration
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` fails validation, `Backend` if the
    /// conversion workers cannot be spawned.
    pub fn with_config(store: Arc<S>, config: SinkConfig) -> SinkResult<Self> {
        config.validate()?;
        let workers = config.worker_count();
        let pool = WorkerPool::new(workers, config.max_queue_depth).map_err(|e| {
            SinkError::backend(format!("failed to spawn conversion workers: {}", e))
        })?;

        info!(
            target: "docsink::sink",
            workers,
            lifetime_ms = config.lifetime_ms,
            flush_threshold = config.flush_threshold,
            default_database = %config.default_database,
            "Sink created"
        );

        Ok(DocSink {
            store,
            converter: Converter::new(Arc::new(pool), Limits::default()),
            config,
            coordinator: Arc::new(TransactionCoordinator::new()),
        })
    }

    /// Replace the document limits applied during conversion
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.converter = Converter::new(Arc::clone(self.converter.pool()), limits);
        self
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Collection `name` in the configured default database
    pub fn collection(&self, name: &str) -> CollectionRef {
        self.store.collection(&self.config.default_database, name)
    }

    /// Writer bound to `collection`
    pub fn writer(&self, collection: CollectionRef) -> ListWriter<S> {
        ListWriter::new(Arc::clone(&self.store), self.converter.clone(), collection)
    }

    /// Convert `root` and upsert its leaves into `collection` in one bulk
    /// write, outside any transaction
    pub fn write(
        &self,
        ctx: &Context,
        collection: &CollectionRef,
        root: StructuredValue,
    ) -> SinkResult<BulkWriteAck> {
        self.writer(collection.clone()).write(ctx, root)
    }

    /// Decode the request payload and write it
    pub fn upsert(&self, ctx: &Context, request: &UpsertRequest) -> SinkResult<BulkWriteAck> {
        let values = decode_json(&request.data)?;
        self.writer(request.collection.clone())
            .write_values(ctx, values)
    }

    /// Start a transaction with options from the configuration
    pub fn start_tx(&self, ctx: &Context) -> SinkResult<Transaction<S>> {
        self.start_tx_with(ctx, self.config.tx_options())
    }

    /// Start a transaction with explicit options
    pub fn start_tx_with(&self, ctx: &Context, options: TxOptions) -> SinkResult<Transaction<S>> {
        let observer: Arc<dyn TxObserver> = self.coordinator.clone();
        Transaction::begin(
            Arc::clone(&self.store),
            self.converter.clone(),
            ctx.clone(),
            options,
            Some(observer),
        )
    }

    /// Run `f` in a transaction: commit if it succeeds, roll back if not
    ///
    /// # Errors
    ///
    /// The error returned by `f` (after the rollback), or the commit error.
    pub fn transaction<F>(&self, ctx: &Context, f: F) -> SinkResult<TxStats>
    where
        F: FnOnce(&mut Transaction<S>) -> SinkResult<()>,
    {
        let mut tx = self.start_tx(ctx)?;
        match f(&mut tx) {
            Ok(()) => tx.commit(),
            Err(e) => {
                if !tx.state().is_terminal() {
                    if let Err(rollback_err) = tx.rollback() {
                        warn!(
                            target: "docsink::sink",
                            error = %rollback_err,
                            "Rollback after failed transaction body also failed"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Transaction lifecycle metrics
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    /// Conversion pool metrics
    pub fn pool_stats(&self) -> PoolStats {
        self.converter.pool().stats()
    }

    /// Stop the conversion workers
    ///
    /// Conversions started afterwards run on the calling thread.
    pub fn shutdown(&self) {
        self.converter.pool().shutdown();
    }
}
