//! Sink construction from `docsink.toml`

use crate::common::*;
use docsink::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_open_writes_default_config() {
    let dir = TempDir::new().unwrap();
    let sink = DocSink::open(Arc::new(MemoryStore::new()), dir.path()).unwrap();

    let text = std::fs::read_to_string(dir.path().join("docsink.toml")).unwrap();
    assert!(text.contains("lifetime_ms = 50000"));
    assert_eq!(sink.config().lifetime(), Duration::from_secs(50));
}

#[test]
fn test_open_reads_existing_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("docsink.toml"),
        "default_database = \"analytics\"\nconversion_workers = 3\n",
    )
    .unwrap();

    let sink = DocSink::open(Arc::new(MemoryStore::new()), dir.path()).unwrap();
    assert_eq!(sink.collection("events").to_string(), "analytics.events");
    assert_eq!(sink.pool_stats().worker_count, 3);
}

#[test]
fn test_open_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("docsink.toml"), "flush_threshold = 0\n").unwrap();

    let err = DocSink::open(Arc::new(MemoryStore::new()), dir.path())
        .err()
        .expect("invalid config must be rejected");
    assert!(matches!(err, SinkError::InvalidConfig { .. }));
}

#[test]
fn test_config_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docsink.toml");
    let config = SinkConfig::default()
        .with_lifetime(Duration::from_millis(1500))
        .with_flush_threshold(10);
    config.write_to_file(&path).unwrap();
    assert_eq!(SinkConfig::from_file(&path).unwrap(), config);
}
