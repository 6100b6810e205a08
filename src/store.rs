// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Keyed state storage for the gate.
//!
//! The gate owns two of these (counters and blocks) and is the only
//! component that mutates them. The trait keeps the gate independent of the
//! backing map so tests can substitute their own and a different deployment
//! can swap in another concurrent map implementation.

use std::collections::HashMap;
use std::sync::Mutex;

/// Abstract keyed store with per-key atomic read-modify-write.
///
/// `update` runs the supplied closure while holding the lock that covers
/// `key`, so concurrent requests from the same origin cannot interleave
/// between the read and the write.
pub trait StateStore<V: Clone + Send + 'static>: Send + Sync {
    /// Fetch a snapshot of the value for `key`.
    fn get(&self, key: &str) -> Option<V>;

    /// Insert or overwrite the value for `key`.
    fn put(&self, key: &str, value: V);

    /// Remove the entry for `key`, returning it if present.
    fn remove(&self, key: &str) -> Option<V>;

    /// Atomically transform the entry for `key`. The closure receives the
    /// current value (`None` if absent); returning `None` deletes the entry.
    /// Returns a snapshot of the stored result.
    fn update(&self, key: &str, f: &mut dyn FnMut(Option<V>) -> Option<V>) -> Option<V>;

    /// Drop every entry for which `keep` returns false. Returns the number
    /// of evicted entries.
    fn retain(&self, keep: &mut dyn FnMut(&str, &V) -> bool) -> usize;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all keys.
    fn keys(&self) -> Vec<String>;
}

const SHARD_COUNT: usize = 16;

/// In-memory store sharded across mutex-guarded maps.
///
/// Lock hold times are bounded by the caller's closure, which never blocks
/// or awaits, keeping evaluation on the request path sub-millisecond.
#[derive(Debug)]
pub struct ShardedStore<V> {
    shards: Vec<Mutex<HashMap<String, V>>>,
}

impl<V> Default for ShardedStore<V> {
    fn default() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }
}

impl<V> ShardedStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, key: &str) -> &Mutex<HashMap<String, V>> {
        // FNV-1a over the key bytes picks the shard.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in key.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        &self.shards[(hash as usize) % SHARD_COUNT]
    }
}

impl<V: Clone + Send + 'static> StateStore<V> for ShardedStore<V> {
    fn get(&self, key: &str) -> Option<V> {
        self.shard(key).lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, value: V) {
        self.shard(key).lock().unwrap().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<V> {
        self.shard(key).lock().unwrap().remove(key)
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(Option<V>) -> Option<V>) -> Option<V> {
        let mut guard = self.shard(key).lock().unwrap();
        let next = f(guard.get(key).cloned());
        match next {
            Some(value) => {
                guard.insert(key.to_string(), value.clone());
                Some(value)
            }
            None => {
                guard.remove(key);
                None
            }
        }
    }

    fn retain(&self, keep: &mut dyn FnMut(&str, &V) -> bool) -> usize {
        let mut evicted = 0;
        for shard in &self.shards {
            let mut guard = shard.lock().unwrap();
            let before = guard.len();
            guard.retain(|k, v| keep(k, v));
            evicted += before - guard.len();
        }
        evicted
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().unwrap().len()).sum()
    }

    fn keys(&self) -> Vec<String> {
        self.shards
            .iter()
            .flat_map(|s| s.lock().unwrap().keys().cloned().collect::<Vec<_>>())
            .collect()
    }
}
