//! The deduplicated value store.
//!
//! Holds every distinct value this node has observed, whether it arrived
//! from a client broadcast or from a peer's gossip.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use crate::types::Value;

/// Monotonically growing set of broadcast values.
///
/// Thread-safe via a single `RwLock`. Values are never removed, so a
/// poisoned lock still guards a consistent set and is recovered from.
#[derive(Debug, Default)]
pub struct ValueStore {
    inner: RwLock<HashSet<Value>>,
}

impl ValueStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value.
    ///
    /// Returns `true` if the value was not already present.
    pub fn add(&self, value: Value) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(value)
    }

    /// Insert a batch of values under one lock acquisition.
    ///
    /// Returns how many of them were new.
    pub fn extend<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        values
            .into_iter()
            .filter(|value| inner.insert(*value))
            .count()
    }

    /// Every value currently stored.
    ///
    /// The order is unspecified and may differ between calls.
    pub fn snapshot(&self) -> Vec<Value> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.iter().copied().collect()
    }

    /// Check whether a value has been seen.
    pub fn contains(&self, value: &Value) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.contains(value)
    }

    /// Number of distinct values stored.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no value has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn sorted(store: &ValueStore) -> Vec<Value> {
        let mut values = store.snapshot();
        values.sort();
        values
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = ValueStore::new();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let store = ValueStore::new();
        assert!(store.add(Value(1)));
        assert!(!store.add(Value(1)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot(), vec![Value(1)]);
    }

    #[test]
    fn test_extend_counts_new_values() {
        let store = ValueStore::new();
        store.add(Value(2));

        let added = store.extend([Value(1), Value(2), Value(3), Value(3)]);
        assert_eq!(added, 2);
        assert_eq!(sorted(&store), vec![Value(1), Value(2), Value(3)]);
    }

    #[test]
    fn test_concurrent_adds() {
        let store = Arc::new(ValueStore::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        // Every worker writes an overlapping range.
                        store.add(Value(i + worker * 50));
                        let _ = store.snapshot();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let expected: Vec<Value> = (0..450).map(Value).collect();
        assert_eq!(sorted(&store), expected);
    }

    proptest! {
        #[test]
        fn prop_add_twice_same_as_once(values in prop::collection::vec(any::<i64>(), 0..64)) {
            let once = ValueStore::new();
            let twice = ValueStore::new();
            for v in &values {
                once.add(Value(*v));
                twice.add(Value(*v));
                twice.add(Value(*v));
            }
            prop_assert_eq!(sorted(&once), sorted(&twice));
        }

        #[test]
        fn prop_order_independent(values in prop::collection::vec(any::<i64>(), 0..64)) {
            let forward = ValueStore::new();
            let backward = ValueStore::new();
            for v in &values {
                forward.add(Value(*v));
            }
            backward.extend(values.iter().rev().map(|v| Value(*v)));

            let expected: BTreeSet<Value> = values.iter().map(|v| Value(*v)).collect();
            prop_assert_eq!(sorted(&forward), expected.iter().copied().collect::<Vec<_>>());
            prop_assert_eq!(sorted(&forward), sorted(&backward));
        }
    }
}
