//! Error reporting on the one-shot write path

use crate::common::*;
use docsink::{FaultMode, FaultPoint, Limits, Phase};
use serde_json::json;
use std::time::{Duration, Instant};

#[test]
fn test_malformed_json_is_decode_error() {
    let t = TestSink::new();
    let coll = t.collection("bad");
    for data in [r#"{"a": "#, "[1, 2", "true", "\"text\""] {
        let err = t
            .sink
            .upsert(&Context::background(), &UpsertRequest::new(coll.clone(), data))
            .unwrap_err();
        assert_eq!(err.phase(), Phase::Decode, "input {:?}", data);
    }
    assert_eq!(t.store.stats().bulk_write_calls, 0);
}

#[test]
fn test_scalar_root_is_convert_error() {
    let t = TestSink::new();
    let coll = t.collection("scalar");
    let err = t
        .sink
        .write(&Context::background(), &coll, value(json!(42)))
        .unwrap_err();
    assert_eq!(err.phase(), Phase::Convert);
}

#[test]
fn test_limit_violation_names_element() {
    let t = TestSink::with_config(SinkConfig::default().with_conversion_workers(2));
    let sink = t.sink.with_limits(Limits::with_small_limits());
    let coll = sink.collection("limits");
    let err = sink
        .write(
            &Context::background(),
            &coll,
            value(json!([{"ok": 1}, {"blob": "x".repeat(1024)}])),
        )
        .unwrap_err();
    match err {
        SinkError::Convert { index, .. } => assert_eq!(index, 1),
        other => panic!("unexpected error: {}", other),
    }
    // Nothing was written
    assert_eq!(t.store.count(&coll), 0);
}

#[test]
fn test_rejected_bulk_write_is_aggregated() {
    let t = TestSink::new();
    let coll = t.collection("rejected");
    let err = t
        .sink
        .write(
            &Context::background(),
            &coll,
            value(json!([{"ok": 1}, {"$bad": 1}, {"$worse": 2}])),
        )
        .unwrap_err();
    match err {
        SinkError::BulkWriteFailed {
            collection,
            failed,
            total,
            reason,
        } => {
            assert_eq!(collection, "defaultdb.rejected");
            assert_eq!(failed, 2);
            assert_eq!(total, 3);
            assert!(reason.contains("$bad"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_injected_failure_is_retryable() {
    let t = TestSink::new();
    let coll = t.collection("retry");
    t.store.faults().arm(FaultPoint::BulkWrite, FaultMode::Once);

    let err = t
        .sink
        .write(&Context::background(), &coll, numbered(3))
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.phase(), Phase::BulkWrite);

    t.sink
        .write(&Context::background(), &coll, numbered(3))
        .unwrap();
    assert_eq!(t.store.count(&coll), 3);
}

#[test]
fn test_cancelled_context() {
    let t = TestSink::new();
    let coll = t.collection("cancelled");
    let ctx = Context::background();
    ctx.cancel();
    let err = t.sink.write(&ctx, &coll, numbered(5)).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(t.store.count(&coll), 0);
}

#[test]
fn test_expired_deadline() {
    let t = TestSink::new();
    let coll = t.collection("deadline");
    let ctx = Context::with_deadline(Instant::now() - Duration::from_millis(1));
    let err = t.sink.write(&ctx, &coll, numbered(1)).unwrap_err();
    assert!(err.is_cancelled());
}
