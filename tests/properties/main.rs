//! Property Test Suite
//!
//! Randomized value trees written through the one-shot path:
//! - every leaf document ends up stored (completeness)
//! - writing the same tree twice leaves the store unchanged (idempotence)
//! - conversion output does not depend on worker count

#[path = "../common/mod.rs"]
mod common;

use common::*;
use docsink::{leaves, Context, SinkConfig};
use proptest::prelude::*;
use serde_json::{json, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,4}".prop_map(Value::from),
    ]
}

fn tree() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-d]{1,2}", inner, 0..4)
                .prop_map(|m| json!(m)),
        ]
    })
}

fn root() -> impl Strategy<Value = Value> {
    prop::collection::vec(tree(), 0..12).prop_map(Value::Array)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_every_leaf_is_stored(input in root()) {
        let t = TestSink::new();
        let coll = t.collection("complete");
        t.sink.write(&Context::background(), &coll, value(input.clone())).unwrap();

        for leaf in leaves(value(input)) {
            prop_assert!(
                !t.store.find(&coll, &leaf).is_empty(),
                "leaf {:?} not stored",
                leaf
            );
        }
    }

    #[test]
    fn test_second_write_changes_nothing(input in root()) {
        let t = TestSink::new();
        let coll = t.collection("idempotent");
        t.sink.write(&Context::background(), &coll, value(input.clone())).unwrap();
        let first = t.contents(&coll);

        let ack = t.sink.write(&Context::background(), &coll, value(input)).unwrap();
        prop_assert_eq!(ack.upserted, 0);
        prop_assert_eq!(ack.modified, 0);
        prop_assert_eq!(t.contents(&coll), first);
    }

    #[test]
    fn test_worker_count_does_not_change_result(input in root()) {
        let single = TestSink::with_config(SinkConfig::default().with_conversion_workers(1));
        let many = TestSink::with_config(SinkConfig::default().with_conversion_workers(8));
        let a = single.collection("workers");
        let b = many.collection("workers");

        single.sink.write(&Context::background(), &a, value(input.clone())).unwrap();
        many.sink.write(&Context::background(), &b, value(input)).unwrap();
        prop_assert_eq!(single.contents(&a), many.contents(&b));
    }
}
