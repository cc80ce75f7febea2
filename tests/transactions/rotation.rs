//! Session rotation once a session outlives its lifetime

use crate::common::*;
use docsink::{MemoryStoreConfig, SinkConfig};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const LIFETIME: Duration = Duration::from_millis(20);

#[test]
fn test_long_transaction_rotates() {
    let t = TestSink::with_lifetime(LIFETIME);
    let coll = t.collection("long_running");
    let total = 5000;

    let mut tx = t.sink.start_tx(&Context::background()).unwrap();
    for i in 0..total {
        let c = coll.clone();
        tx.send(move |ctx, w| w.write(ctx, &c, value(json!({"i": i}))).map(|_| ()))
            .unwrap();
        if i % 500 == 0 {
            thread::sleep(Duration::from_millis(5));
        }
    }
    let stats = tx.commit().unwrap();

    assert!(stats.rotations >= 1);
    assert_eq!(stats.executed, total as u64);
    assert_eq!(t.store.count(&coll), total);
    assert_eq!(t.sink.metrics().total_rotations, stats.rotations);
}

#[test]
fn test_rotated_work_survives_abandon() {
    let t = TestSink::with_lifetime(LIFETIME);
    let coll = t.collection("abandoned");
    let total = 5000;

    {
        let mut tx = t.sink.start_tx(&Context::background()).unwrap();
        for i in 0..total {
            let c = coll.clone();
            tx.send(move |ctx, w| w.write(ctx, &c, value(json!({"i": i}))).map(|_| ()))
                .unwrap();
            if i % 500 == 0 {
                thread::sleep(Duration::from_millis(5));
            }
        }
        assert!(tx.stats().rotations >= 1);
        // Dropped without commit
    }

    let stored = t.store.count(&coll);
    assert!(stored > 0, "rotated sessions must stay committed");
    assert!(stored < total, "the open session must be aborted");
}

#[test]
fn test_rollback_only_undoes_current_session() {
    let t = TestSink::with_lifetime(LIFETIME);
    let coll = t.collection("partial");

    let mut tx = t.sink.start_tx(&Context::background()).unwrap();
    let c = coll.clone();
    tx.send(move |ctx, w| w.write(ctx, &c, value(json!({"before": 1}))).map(|_| ()))
        .unwrap();
    thread::sleep(LIFETIME * 2);

    let c = coll.clone();
    tx.send(move |ctx, w| w.write(ctx, &c, value(json!({"after": 1}))).map(|_| ()))
        .unwrap();
    assert_eq!(tx.stats().rotations, 1);
    tx.rollback().unwrap();

    assert_eq!(t.contents(&coll), sorted(vec![json!({"before": 1})]));
}

#[test]
fn test_no_rotation_within_lifetime() {
    let t = TestSink::new();
    let coll = t.collection("short");
    let mut tx = t.sink.start_tx(&Context::background()).unwrap();
    let first = tx.session_id();
    for i in 0..50 {
        let c = coll.clone();
        tx.send(move |ctx, w| w.write(ctx, &c, value(json!({"i": i}))).map(|_| ()))
            .unwrap();
    }
    assert_eq!(tx.session_id(), first);
    assert_eq!(tx.commit().unwrap().rotations, 0);
}

#[test]
fn test_rotation_changes_session() {
    let t = TestSink::with_lifetime(LIFETIME);
    let coll = t.collection("sessions");
    let mut tx = t.sink.start_tx(&Context::background()).unwrap();
    let first = tx.session_id();

    thread::sleep(LIFETIME * 2);
    let c = coll.clone();
    tx.send(move |ctx, w| {
        assert!(!w.session_id().is_empty());
        w.write(ctx, &c, value(json!({"x": 1}))).map(|_| ())
    })
    .unwrap();

    assert_ne!(tx.session_id(), first);
    tx.commit().unwrap();
    assert_eq!(t.store.stats().commits, 2);
}

#[test]
fn test_rotation_with_single_session_slot() {
    // The old session is released before the new one is opened
    let store = Arc::new(MemoryStore::with_config(MemoryStoreConfig {
        max_open_sessions: 1,
    }));
    let sink = DocSink::with_config(
        Arc::clone(&store),
        SinkConfig::default()
            .with_conversion_workers(2)
            .with_lifetime(LIFETIME),
    )
    .unwrap();
    let coll = sink.collection("one_slot");

    let mut tx = sink.start_tx(&Context::background()).unwrap();
    for i in 0..3 {
        thread::sleep(LIFETIME * 2);
        let c = coll.clone();
        tx.send(move |ctx, w| w.write(ctx, &c, value(json!({"i": i}))).map(|_| ()))
            .unwrap();
    }
    let stats = tx.commit().unwrap();
    assert_eq!(stats.rotations, 3);
    assert_eq!(store.count(&coll), 3);
}
