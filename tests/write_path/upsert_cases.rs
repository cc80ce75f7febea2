//! Payload cases a document-store sink must accept
//!
//! Each case writes one JSON payload into a fresh collection and checks the
//! resulting documents.

use crate::common::*;
use serde_json::json;

fn run(name: &str, data: &str, expected: Vec<serde_json::Value>) {
    let t = TestSink::new();
    let coll = t.collection(name);
    t.sink
        .upsert(&Context::background(), &UpsertRequest::new(coll.clone(), data))
        .unwrap();
    assert_eq!(t.contents(&coll), sorted(expected), "case {}", name);

    t.store.drop_collection(&coll);
    assert!(t.contents(&coll).is_empty());
}

#[test]
fn test_empty_object() {
    run("test1", "{}", vec![json!({})]);
}

#[test]
fn test_simple_object() {
    run("test2", r#"{"name": "test1"}"#, vec![json!({"name": "test1"})]);
}

#[test]
fn test_empty_array() {
    run("test3", "[]", vec![]);
}

#[test]
fn test_simple_array() {
    run(
        "test4",
        r#"[{"name": "test1"}, {"name": "test2"}]"#,
        vec![json!({"name": "test1"}), json!({"name": "test2"})],
    );
}

#[test]
fn test_nested_object() {
    run(
        "test5",
        r#"{"foo": {"bar": "baz"}}"#,
        vec![json!({"foo": {"bar": "baz"}})],
    );
}

#[test]
fn test_nested_array() {
    run(
        "test6",
        r#"{"foo": [{"bar": "baz"}]}"#,
        vec![json!({"foo": [{"bar": "baz"}]})],
    );
}

#[test]
fn test_leading_whitespace() {
    run("test7", "  \n\t[{\"a\": true}]", vec![json!({"a": true})]);
}

#[test]
fn test_list_writer_matches_sink_upsert() {
    let t = TestSink::new();
    let coll = t.collection("writer");
    let writer = t.sink.writer(coll.clone());
    writer
        .write_json(&Context::background(), br#"[{"name": "test1"}, {"name": "test2"}]"#)
        .unwrap();
    assert_eq!(
        t.contents(&coll),
        sorted(vec![json!({"name": "test1"}), json!({"name": "test2"})])
    );
}
