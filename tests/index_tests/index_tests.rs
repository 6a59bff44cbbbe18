//! Ordered Index Tests
//!
//! Tests verify:
//! - insert-or-replace / get / delete semantics
//! - Key ordering
//! - Degree bookkeeping

use mergecache::{BTreeIndex, OrderedIndex, Value};

#[test]
fn test_new_index_is_empty() {
    let index = BTreeIndex::with_degree(4);
    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.degree(), 4);
}

#[test]
fn test_insert_and_get() {
    let mut index = BTreeIndex::default();
    index.insert_or_replace("a".to_string(), Value::Int(1));

    assert_eq!(index.get("a"), Some(Value::Int(1)));
    assert_eq!(index.get("b"), None);
}

#[test]
fn test_insert_replaces_existing() {
    let mut index = BTreeIndex::default();
    index.insert_or_replace("a".to_string(), Value::Int(1));
    index.insert_or_replace("a".to_string(), Value::from("two"));

    assert_eq!(index.len(), 1);
    assert_eq!(index.get("a"), Some(Value::from("two")));
}

#[test]
fn test_delete_existing_and_missing() {
    let mut index = BTreeIndex::default();
    index.insert_or_replace("a".to_string(), Value::Int(1));

    index.delete("a");
    index.delete("never-there");

    assert!(index.is_empty());
    assert_eq!(index.get("a"), None);
}

#[test]
fn test_keys_are_sorted() {
    let mut index = BTreeIndex::with_degree(8);
    for key in ["m", "b", "z", "a", "aa"] {
        index.insert_or_replace(key.to_string(), Value::Bool(true));
    }

    assert_eq!(index.keys(), vec!["a", "aa", "b", "m", "z"]);
}

#[test]
fn test_clear() {
    let mut index = BTreeIndex::default();
    for i in 0..100i64 {
        index.insert_or_replace(format!("k{}", i), Value::Int(i));
    }
    assert_eq!(index.len(), 100);

    index.clear();
    assert!(index.is_empty());
    assert_eq!(index.degree(), 4);
}
