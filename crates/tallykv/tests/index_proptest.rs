//! Property tests: the occurrence index always matches a full recount.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, HashMap};
use tallykv::Store;
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Op {
    Set(String, String),
    Delete(String),
    Begin,
    Commit,
    Rollback,
}

/// Small key and value alphabets so operations collide often.
fn op() -> impl Strategy<Value = Op> {
    let key = prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(String::from);
    let value = prop::sample::select(vec!["x", "y", "z"]).prop_map(String::from);
    prop_oneof![
        4 => (key.clone(), value).prop_map(|(k, v)| Op::Set(k, v)),
        2 => key.prop_map(Op::Delete),
        1 => Just(Op::Begin),
        1 => Just(Op::Commit),
        1 => Just(Op::Rollback),
    ]
}

/// Effective key to value mapping as seen through `get`.
fn visible(store: &Store, model_keys: &[&str]) -> BTreeMap<String, String> {
    model_keys
        .iter()
        .filter_map(|k| store.get(k).map(|v| ((*k).to_string(), v.to_string())))
        .collect()
}

fn recount(records: &BTreeMap<String, String>) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for value in records.values() {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}

proptest! {
    /// Counts match a recount of visible records after every operation,
    /// inside and outside transactions.
    #[test]
    fn counts_match_visible_records(ops in prop::collection::vec(op(), 0..60)) {
        let dir = TempDir::new().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut store = Store::open(dir.path().join("db.csv"))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let keys = ["a", "b", "c", "d"];

        for op in ops {
            match op {
                Op::Set(k, v) => store.set(&k, &v),
                Op::Delete(k) => store.delete(&k),
                Op::Begin => {
                    let _ = store.begin();
                }
                Op::Commit => {
                    store.commit().map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
                Op::Rollback => {
                    let _ = store.rollback();
                }
            }

            let expected = recount(&visible(&store, &keys));
            for value in ["x", "y", "z"] {
                prop_assert_eq!(
                    store.count(value),
                    expected.get(value).copied().unwrap_or(0),
                    "count({}) after {:?}", value, store.records().collect::<Vec<_>>()
                );
            }
        }
    }

    /// Committed state reloads identically from the backing file.
    #[test]
    fn saved_state_reloads(ops in prop::collection::vec(op(), 0..40)) {
        let dir = TempDir::new().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let path = dir.path().join("db.csv");
        let mut store = Store::open(&path).map_err(|e| TestCaseError::fail(e.to_string()))?;

        for op in ops {
            match op {
                Op::Set(k, v) => store.set(&k, &v),
                Op::Delete(k) => store.delete(&k),
                Op::Begin => {
                    let _ = store.begin();
                }
                Op::Commit => {
                    store.commit().map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
                Op::Rollback => {
                    let _ = store.rollback();
                }
            }
        }
        let _ = store.rollback();
        store.save().map_err(|e| TestCaseError::fail(e.to_string()))?;

        let reloaded = Store::open(&path).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(
            reloaded.records().collect::<Vec<_>>(),
            store.records().collect::<Vec<_>>()
        );
        prop_assert_eq!(reloaded.index(), store.index());
    }
}
