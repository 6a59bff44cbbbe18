//! Pending Buffer Tests
//!
//! Tests verify:
//! - Put / get / overwrite
//! - Tombstones are kept as entries
//! - pop_any drains every entry exactly once
//! - Per-key guards and clear
//! - Concurrent writers across partitions

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use mergecache::buffer::{Mutation, PendingBuffer};
use mergecache::Value;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_buffer_is_empty() {
    let buffer = PendingBuffer::new();
    assert!(buffer.is_empty());
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.shard_count(), 1);
}

#[test]
fn test_put_and_get() {
    let buffer = PendingBuffer::new();
    buffer.put("key1", Mutation::Put(Value::Int(1)));

    assert_eq!(buffer.get("key1"), Some(Mutation::Put(Value::Int(1))));
    assert_eq!(buffer.get("missing"), None);
}

#[test]
fn test_put_overwrites_existing() {
    let buffer = PendingBuffer::new();
    buffer.put("key1", Mutation::Put(Value::Int(1)));
    buffer.put("key1", Mutation::Put(Value::Int(2)));

    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.get("key1"), Some(Mutation::Put(Value::Int(2))));
}

#[test]
fn test_tombstone_is_an_entry() {
    let buffer = PendingBuffer::new();
    buffer.put("key1", Mutation::Put(Value::Int(1)));
    buffer.put("key1", Mutation::Tombstone);

    let entry = buffer.get("key1").unwrap();
    assert!(entry.is_tombstone());
    assert_eq!(entry.value(), None);
    assert_eq!(buffer.len(), 1);
}

// =============================================================================
// Drain Tests
// =============================================================================

#[test]
fn test_pop_any_on_empty_buffer() {
    let buffer = PendingBuffer::with_shards(4);
    assert_eq!(buffer.pop_any(), None);
}

#[test]
fn test_pop_any_drains_every_entry_once() {
    for shards in [1, 3, 16] {
        let buffer = PendingBuffer::with_shards(shards);
        for i in 0..500 {
            buffer.put(format!("key{}", i), Mutation::Put(Value::Int(i)));
        }

        let mut seen = HashSet::new();
        while let Some((key, mutation)) = buffer.pop_any() {
            let expected: i64 = key[3..].parse().unwrap();
            assert_eq!(mutation, Mutation::Put(Value::Int(expected)));
            assert!(seen.insert(key), "key popped twice");
        }

        assert_eq!(seen.len(), 500);
        assert!(buffer.is_empty());
    }
}

#[test]
fn test_pop_any_returns_latest_mutation() {
    let buffer = PendingBuffer::new();
    buffer.put("key", Mutation::Put(Value::Int(1)));
    buffer.put("key", Mutation::Tombstone);

    assert_eq!(buffer.pop_any(), Some(("key".to_string(), Mutation::Tombstone)));
    assert_eq!(buffer.pop_any(), None);
}

#[test]
fn test_drain_large_buffer_then_reuse() {
    let buffer = PendingBuffer::new();
    for i in 0..200_000i64 {
        buffer.put(format!("burst{}", i), Mutation::Put(Value::Int(i)));
    }

    let mut drained = 0;
    while let Some((_, mutation)) = buffer.pop_any() {
        assert!(!mutation.is_tombstone());
        drained += 1;
    }
    assert_eq!(drained, 200_000);
    assert!(buffer.is_empty());

    // After a burst, single put/pop pairs must keep working
    for i in 0..10_000i64 {
        buffer.put("steady", Mutation::Put(Value::Int(i)));
        assert_eq!(
            buffer.pop_any(),
            Some(("steady".to_string(), Mutation::Put(Value::Int(i))))
        );
    }
    assert!(buffer.is_empty());
}

#[test]
fn test_pop_any_after_overwrite_yields_single_entry() {
    let buffer = PendingBuffer::new();
    buffer.put("a", Mutation::Put(Value::Int(1)));
    buffer.put("b", Mutation::Put(Value::Int(2)));
    buffer.put("a", Mutation::Tombstone);

    let mut popped = vec![buffer.pop_any().unwrap(), buffer.pop_any().unwrap()];
    popped.sort_by(|x, y| x.0.cmp(&y.0));

    assert_eq!(
        popped,
        vec![
            ("a".to_string(), Mutation::Tombstone),
            ("b".to_string(), Mutation::Put(Value::Int(2))),
        ]
    );
    assert_eq!(buffer.pop_any(), None);
}

// =============================================================================
// Guard Tests
// =============================================================================

#[test]
fn test_key_write_guard_reads_and_writes() {
    let buffer = PendingBuffer::with_shards(8);
    {
        let mut guard = buffer.lock_key("counter");
        assert_eq!(guard.get(), None);
        guard.set(Mutation::Put(Value::Int(5)));
        assert_eq!(guard.get(), Some(&Mutation::Put(Value::Int(5))));
    }
    assert_eq!(buffer.get("counter"), Some(Mutation::Put(Value::Int(5))));
}

#[test]
fn test_key_read_guard() {
    let buffer = PendingBuffer::new();
    buffer.put("a", Mutation::Tombstone);

    let guard = buffer.read_key("a");
    assert_eq!(guard.get(), Some(&Mutation::Tombstone));
    drop(guard);

    assert_eq!(buffer.read_key("b").get(), None);
}

#[test]
fn test_lock_all_and_clear() {
    let buffer = PendingBuffer::with_shards(4);
    for i in 0..50 {
        buffer.put(format!("k{}", i), Mutation::Tombstone);
    }

    {
        let mut all = buffer.lock_all();
        assert_eq!(all.len(), 50);
        all.clear();
        assert!(all.is_empty());
    }
    assert!(buffer.is_empty());

    buffer.put("again", Mutation::Tombstone);
    buffer.clear();
    assert_eq!(buffer.len(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_distinct_keys() {
    let buffer = Arc::new(PendingBuffer::with_shards(8));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..250 {
                    buffer.put(format!("t{}-{}", t, i), Mutation::Put(Value::Int(i)));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(buffer.len(), 2000);
    assert_eq!(buffer.get("t7-249"), Some(Mutation::Put(Value::Int(249))));
}
