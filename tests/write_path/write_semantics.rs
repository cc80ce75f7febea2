//! Semantics of the one-shot write path

use crate::common::*;
use docsink::WriteInstruction;
use serde_json::json;

#[test]
fn test_write_twice_is_idempotent() {
    let t = TestSink::new();
    let coll = t.collection("idem");
    let input = value(json!([{"a": 1}, {"b": [1, 2]}, {"c": {"d": null}}]));

    t.sink
        .write(&Context::background(), &coll, input.clone())
        .unwrap();
    let once = t.contents(&coll);

    let ack = t
        .sink
        .write(&Context::background(), &coll, input)
        .unwrap();
    assert_eq!(t.contents(&coll), once);
    assert_eq!(ack.upserted, 0);
    assert_eq!(ack.matched, 3);
    assert_eq!(ack.modified, 0);
}

#[test]
fn test_empty_list_makes_no_backend_call() {
    let t = TestSink::new();
    let coll = t.collection("noop");
    let ack = t
        .sink
        .write(&Context::background(), &coll, value(json!([])))
        .unwrap();
    assert_eq!(ack.total(), 0);
    assert_eq!(t.store.stats().bulk_write_calls, 0);
}

#[test]
fn test_empty_object_makes_one_write() {
    let t = TestSink::new();
    let coll = t.collection("one");
    t.sink
        .write(&Context::background(), &coll, value(json!({})))
        .unwrap();
    assert_eq!(t.store.stats().bulk_write_calls, 1);
    assert_eq!(t.store.count(&coll), 1);
}

#[test]
fn test_scalars_in_list_are_skipped() {
    let t = TestSink::new();
    let coll = t.collection("skip");
    let ack = t
        .sink
        .write(
            &Context::background(),
            &coll,
            value(json!([{"a": 1}, "skip-me", {"b": 2}])),
        )
        .unwrap();
    assert_eq!(ack.upserted, 2);
    assert_eq!(t.contents(&coll), sorted(vec![json!({"a": 1}), json!({"b": 2})]));
}

#[test]
fn test_list_inside_object_is_a_field_value() {
    let t = TestSink::new();
    let coll = t.collection("nested");
    t.sink
        .write(
            &Context::background(),
            &coll,
            value(json!({"foo": [{"bar": "baz"}]})),
        )
        .unwrap();

    let stored = t.contents(&coll);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["foo"], value(json!([{"bar": "baz"}])));
}

#[test]
fn test_nested_lists_are_flattened() {
    let t = TestSink::new();
    let coll = t.collection("flatten");
    t.sink
        .write(
            &Context::background(),
            &coll,
            value(json!([[{"a": 1}, [[{"b": 2}]]], [], {"c": 3}, null])),
        )
        .unwrap();
    assert_eq!(
        t.contents(&coll),
        sorted(vec![json!({"a": 1}), json!({"b": 2}), json!({"c": 3})])
    );
}

#[test]
fn test_deep_list_nesting() {
    let t = TestSink::new();
    let coll = t.collection("deep");
    let mut root = value(json!({"deep": true}));
    for _ in 0..1000 {
        root = StructuredValue::List(vec![root]);
    }
    t.sink.write(&Context::background(), &coll, root).unwrap();
    assert_eq!(t.contents(&coll), sorted(vec![json!({"deep": true})]));
}

#[test]
fn test_fan_out_complete_across_runs() {
    let t = TestSink::new();
    for run in 0..10 {
        let coll = t.collection(&format!("fan_out_{}", run));
        let ack = t
            .sink
            .write(&Context::background(), &coll, numbered(1000))
            .unwrap();
        assert_eq!(ack.upserted, 1000);
        assert_eq!(t.store.count(&coll), 1000);
    }
}

#[test]
fn test_one_bulk_call_per_write() {
    let t = TestSink::new();
    let coll = t.collection("calls");
    t.sink
        .write(&Context::background(), &coll, numbered(250))
        .unwrap();
    assert_eq!(t.store.stats().bulk_write_calls, 1);
}

#[test]
fn test_upsert_merges_into_matching_document() {
    let t = TestSink::new();
    let coll = t.collection("merge");
    t.sink
        .write(&Context::background(), &coll, value(json!({"a": 1, "b": 2})))
        .unwrap();
    // {"a": 1} matches the stored superset document
    let ack = t
        .sink
        .write(&Context::background(), &coll, value(json!({"a": 1})))
        .unwrap();
    assert_eq!(ack.matched, 1);
    assert_eq!(t.store.count(&coll), 1);
}

#[test]
fn test_instruction_wire_form() {
    let instruction = WriteInstruction::upsert(doc(json!({"name": "test1"})));
    assert_eq!(
        serde_json::to_value(&instruction).unwrap(),
        json!({
            "filter": {"name": "test1"},
            "update": {"$set": {"name": "test1"}},
            "upsert": true
        })
    );
}
