//! Pluggable map backends.
//!
//! The store keeps its entries in anything implementing [`Backend`]. Writers
//! are already serialized by the store lock; the backend only has to keep
//! concurrent readers safe, which is why reads never touch the store lock.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Concurrent `String -> Value` map that holds a [`JsonStore`](crate::JsonStore)'s
/// entries in memory.
///
/// Methods work with owned values, so reads clone.
pub trait Backend: Send + Sync {
    /// Insert a value, returning the previous one if any.
    fn insert(&self, key: String, value: Value) -> Option<Value>;

    /// Look up a value by key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Remove a key, returning its value if it was present.
    fn remove(&self, key: &str) -> Option<Value>;

    /// Owned copy of every entry. Must not hold locks after returning.
    fn snapshot(&self) -> Map<String, Value>;

    /// Number of entries.
    fn len(&self) -> usize;

    /// `true` when there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a key exists. The default clones the value; override when
    /// the backend can answer without that.
    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Every key, unordered. The default clones the values too; override
    /// when the backend can walk keys alone.
    fn keys(&self) -> Vec<String> {
        self.snapshot().into_iter().map(|(k, _)| k).collect()
    }

    /// Drop all entries. The default removes key by key.
    fn clear(&self) {
        for k in &self.keys() {
            self.remove(k);
        }
    }

    /// Swap the whole contents for `entries`.
    ///
    /// New values are written before stale keys are pruned, so a key present
    /// both before and after never reads as missing while the swap runs.
    fn replace_all(&self, entries: Map<String, Value>) {
        let stale: Vec<String> = self
            .keys()
            .into_iter()
            .filter(|k| !entries.contains_key(k))
            .collect();
        for (k, v) in entries {
            self.insert(k, v);
        }
        for k in &stale {
            self.remove(k);
        }
    }
}

// ---- DashMap -----------------------------------------------------------------

impl Backend for dashmap::DashMap<String, Value> {
    fn insert(&self, key: String, value: Value) -> Option<Value> {
        dashmap::DashMap::insert(self, key, value)
    }

    fn get(&self, key: &str) -> Option<Value> {
        dashmap::DashMap::get(self, key).map(|r| r.value().clone())
    }

    fn remove(&self, key: &str) -> Option<Value> {
        dashmap::DashMap::remove(self, key).map(|(_, v)| v)
    }

    fn snapshot(&self) -> Map<String, Value> {
        self.iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn len(&self) -> usize {
        dashmap::DashMap::len(self)
    }

    fn contains_key(&self, key: &str) -> bool {
        dashmap::DashMap::contains_key(self, key)
    }

    fn keys(&self) -> Vec<String> {
        self.iter().map(|r| r.key().clone()).collect()
    }

    fn clear(&self) {
        dashmap::DashMap::clear(self)
    }

    // Shard by shard: overwrite first, then prune what the new contents lack.
    fn replace_all(&self, entries: Map<String, Value>) {
        let keep: std::collections::HashSet<String> = entries.keys().cloned().collect();
        for (k, v) in entries {
            dashmap::DashMap::insert(self, k, v);
        }
        self.retain(|k, _| keep.contains(k));
    }
}

// ---- RwLock<HashMap> ---------------------------------------------------------

impl Backend for parking_lot::RwLock<HashMap<String, Value>> {
    fn insert(&self, key: String, value: Value) -> Option<Value> {
        self.write().insert(key, value)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    fn snapshot(&self) -> Map<String, Value> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn clear(&self) {
        self.write().clear()
    }

    // One write lock for the whole swap, so readers never see a half-filled map.
    fn replace_all(&self, entries: Map<String, Value>) {
        let mut map = self.write();
        map.clear();
        map.extend(entries);
    }
}
