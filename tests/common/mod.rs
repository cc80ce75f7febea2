//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from any test's
//! main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

pub use docsink::{
    CollectionRef, Context, DocSink, Document, MemoryStore, SinkConfig, SinkError,
    StructuredValue, UpsertRequest,
};
use std::sync::{Arc, Once};
use std::time::Duration;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a test subscriber once per binary. Filter with `RUST_LOG`.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .try_init();
    });
}

// ============================================================================
// TestSink - sink over a fresh in-memory store
// ============================================================================

/// Sink plus direct access to its store.
pub struct TestSink {
    pub sink: DocSink<MemoryStore>,
    pub store: Arc<MemoryStore>,
}

impl TestSink {
    /// Sink with four conversion workers and default settings.
    pub fn new() -> Self {
        Self::with_config(SinkConfig::default().with_conversion_workers(4))
    }

    /// Sink whose transactions rotate after `lifetime`.
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self::with_config(
            SinkConfig::default()
                .with_conversion_workers(4)
                .with_lifetime(lifetime),
        )
    }

    pub fn with_config(config: SinkConfig) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let sink = DocSink::with_config(Arc::clone(&store), config).expect("sink");
        TestSink { sink, store }
    }

    /// `defaultdb.<name>`
    pub fn collection(&self, name: &str) -> CollectionRef {
        self.sink.collection(name)
    }

    /// Stored documents with the store-assigned `_id` removed, sorted by
    /// their JSON text.
    pub fn contents(&self, collection: &CollectionRef) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .store
            .documents(collection)
            .into_iter()
            .map(|mut d| {
                d.remove("_id");
                d
            })
            .collect();
        docs.sort_by_key(|d| StructuredValue::Object(d.clone()).to_json_string());
        docs
    }
}

// ============================================================================
// Value helpers
// ============================================================================

pub fn value(v: serde_json::Value) -> StructuredValue {
    StructuredValue::from(v)
}

pub fn doc(v: serde_json::Value) -> Document {
    match StructuredValue::from(v) {
        StructuredValue::Object(d) => d,
        other => panic!("expected object, got {}", other.type_name()),
    }
}

/// Expected store contents for `docs`, in [`TestSink::contents`] order.
pub fn sorted(docs: Vec<serde_json::Value>) -> Vec<Document> {
    let mut docs: Vec<Document> = docs.into_iter().map(doc).collect();
    docs.sort_by_key(|d| StructuredValue::Object(d.clone()).to_json_string());
    docs
}

/// `n` distinct single-field objects `{"i": 0}`, `{"i": 1}`, ...
pub fn numbered(n: usize) -> StructuredValue {
    StructuredValue::List(
        (0..n)
            .map(|i| value(serde_json::json!({ "i": i })))
            .collect(),
    )
}
