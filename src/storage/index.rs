//! In-memory ordered index
//!
//! The authoritative runtime view of the store: a sorted map from key to
//! the value of its last acknowledged Set. Point reads take shared access
//! only; `put` takes exclusive access just long enough to swap the
//! binding. Ordering makes prefix scans a bounded range walk, O(log n + k)
//! for k results, instead of a full sweep.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// Concurrent map from key to current value
#[derive(Debug)]
pub struct MemIndex {
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bind `key` to `value`, replacing any prior binding
    ///
    /// Returns true if the key was not bound before.
    pub fn put(&self, key: String, value: Vec<u8>) -> bool {
        let mut map = self.map.write().unwrap_or_else(|p| p.into_inner());
        map.insert(key, value).is_none()
    }

    /// Current binding for `key`, if any
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let map = self.map.read().unwrap_or_else(|p| p.into_inner());
        map.get(key).cloned()
    }

    /// Bindings whose keys start with `prefix`, ascending lexicographic
    ///
    /// `max_results <= 0` means no limit. Materialized under one shared
    /// read guard, so the returned set is a point-in-time snapshot.
    #[must_use]
    pub fn prefix_scan(&self, prefix: &str, max_results: i64) -> Vec<(String, Vec<u8>)> {
        let map = self.map.read().unwrap_or_else(|p| p.into_inner());

        let matching = map
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()));

        if max_results > 0 {
            matching.take(max_results as usize).collect()
        } else {
            matching.collect()
        }
    }

    /// Current number of bindings
    #[must_use]
    pub fn len(&self) -> usize {
        let map = self.map.read().unwrap_or_else(|p| p.into_inner());
        map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemIndex {
    fn default() -> Self {
        Self::new()
    }
}
