//! Open, commit and roll back

use crate::common::*;
use docsink::{TxOptions, TxState};
use serde_json::json;

fn send_doc(
    tx: &mut docsink::Transaction<MemoryStore>,
    coll: &CollectionRef,
    v: serde_json::Value,
) -> docsink::SinkResult<()> {
    let coll = coll.clone();
    tx.send(move |ctx, w| w.write(ctx, &coll, value(v)).map(|_| ()))
}

#[test]
fn test_writes_invisible_until_commit() {
    let t = TestSink::new();
    let coll = t.collection("isolated");
    let mut tx = t.sink.start_tx(&Context::background()).unwrap();

    send_doc(&mut tx, &coll, json!([{"a": 1}, {"b": 2}])).unwrap();
    assert_eq!(t.store.count(&coll), 0);

    let stats = tx.commit().unwrap();
    assert_eq!(stats.executed, 1);
    assert_eq!(stats.rotations, 0);
    assert_eq!(t.contents(&coll), sorted(vec![json!({"a": 1}), json!({"b": 2})]));
}

#[test]
fn test_rollback_discards_session_writes() {
    let t = TestSink::new();
    let coll = t.collection("rollback");
    let mut tx = t.sink.start_tx(&Context::background()).unwrap();
    send_doc(&mut tx, &coll, json!({"a": 1})).unwrap();
    tx.rollback().unwrap();

    assert_eq!(t.store.count(&coll), 0);
    assert_eq!(t.store.stats().open_sessions, 0);
}

#[test]
fn test_drop_while_open_rolls_back() {
    let t = TestSink::new();
    let coll = t.collection("dropped");
    {
        let mut tx = t.sink.start_tx(&Context::background()).unwrap();
        send_doc(&mut tx, &coll, json!({"a": 1})).unwrap();
    }
    assert_eq!(t.store.count(&coll), 0);
    assert_eq!(t.sink.metrics().total_rolled_back, 1);
    assert_eq!(t.sink.metrics().active_count, 0);
}

#[test]
fn test_upsert_request_inside_transaction() {
    let t = TestSink::new();
    let coll = t.collection("requests");
    let request = UpsertRequest::new(coll.clone(), r#"[{"name":"test1"},{"name":"test2"}]"#);
    t.sink
        .transaction(&Context::background(), move |tx| {
            tx.send(move |ctx, w| w.upsert(ctx, &request).map(|_| ()))
        })
        .unwrap();
    assert_eq!(
        t.contents(&coll),
        sorted(vec![json!({"name": "test1"}), json!({"name": "test2"})])
    );
}

#[test]
fn test_flush_threshold_batches_sends() {
    let t = TestSink::new();
    let coll = t.collection("threshold");
    let mut tx = t
        .sink
        .start_tx_with(
            &Context::background(),
            TxOptions::default().with_flush_threshold(3),
        )
        .unwrap();

    send_doc(&mut tx, &coll, json!({"n": 1})).unwrap();
    send_doc(&mut tx, &coll, json!({"n": 2})).unwrap();
    assert_eq!(tx.stats().pending, 2);
    assert_eq!(tx.stats().executed, 0);

    send_doc(&mut tx, &coll, json!({"n": 3})).unwrap();
    assert_eq!(tx.stats().pending, 0);
    assert_eq!(tx.stats().executed, 3);

    // Commit runs whatever is still queued
    send_doc(&mut tx, &coll, json!({"n": 4})).unwrap();
    let stats = tx.commit().unwrap();
    assert_eq!(stats.executed, 4);
    assert_eq!(t.store.count(&coll), 4);
}

#[test]
fn test_explicit_flush() {
    let t = TestSink::new();
    let coll = t.collection("flush");
    let mut tx = t
        .sink
        .start_tx_with(
            &Context::background(),
            TxOptions::default().with_flush_threshold(100),
        )
        .unwrap();
    send_doc(&mut tx, &coll, json!({"n": 1})).unwrap();
    tx.flush().unwrap();
    assert_eq!(tx.stats().executed, 1);
    tx.commit().unwrap();
    assert_eq!(t.store.count(&coll), 1);
}

#[test]
fn test_state_reported() {
    let t = TestSink::new();
    let tx = t.sink.start_tx(&Context::background()).unwrap();
    assert_eq!(tx.state(), &TxState::Open);
    assert!(tx.session_id().is_some());
    tx.commit().unwrap();
}

#[test]
fn test_metrics_across_transactions() {
    let t = TestSink::new();
    let coll = t.collection("metrics");

    for i in 0..3 {
        let mut tx = t.sink.start_tx(&Context::background()).unwrap();
        send_doc(&mut tx, &coll, json!({"i": i})).unwrap();
        tx.commit().unwrap();
    }
    let tx = t.sink.start_tx(&Context::background()).unwrap();
    tx.rollback().unwrap();

    let metrics = t.sink.metrics();
    assert_eq!(metrics.total_started, 4);
    assert_eq!(metrics.total_committed, 3);
    assert_eq!(metrics.total_rolled_back, 1);
    assert_eq!(metrics.active_count, 0);
    assert!((metrics.commit_rate - 0.75).abs() < f64::EPSILON);
}

#[test]
fn test_concurrent_transactions_are_independent() {
    let t = TestSink::new();
    let coll = t.collection("concurrent");

    std::thread::scope(|s| {
        for worker in 0..4 {
            let sink = &t.sink;
            let coll = coll.clone();
            s.spawn(move || {
                let mut tx = sink.start_tx(&Context::background()).unwrap();
                for i in 0..25 {
                    let c = coll.clone();
                    tx.send(move |ctx, w| {
                        w.write(ctx, &c, value(json!({"worker": worker, "i": i})))
                            .map(|_| ())
                    })
                    .unwrap();
                }
                tx.commit().unwrap();
            });
        }
    });

    assert_eq!(t.store.count(&coll), 100);
    assert_eq!(t.sink.metrics().total_committed, 4);
}
