//! The sharded keyspace.
//!
//! Sixteen independent shards, each a mutex around a hash map plus an
//! exact LRU list. Every operation hashes its key, locks exactly one
//! shard, and finishes inside that critical section. Different shards
//! proceed in parallel, and there is no cross-shard atomicity.
//!
//! Capacity is enforced per shard: inserting into a full shard evicts
//! from the back of that shard's LRU list until there is room. Expired
//! entries are reclaimed lazily whenever a keyed operation touches
//! them, and by the background sweep in [`crate::sweep`] for keys
//! nobody reads.

use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHashMap, RandomState};
use bytes::Bytes;
use parking_lot::Mutex;

use crate::lru::LruList;
use crate::time;

/// Number of keyspace partitions. Power of two so the shard index is a
/// mask of the low hash bits instead of a modulo.
pub const NUM_SHARDS: usize = 16;

/// Default total capacity when none is configured.
pub const DEFAULT_MAX_KEYS: usize = 100_000;

/// A single stored value with its expiry deadline and LRU position.
#[derive(Debug)]
struct Entry {
    value: Bytes,
    /// Monotonic expiry deadline in ms. 0 = no expiry.
    expires_at_ms: u64,
    /// Handle of this entry's node in the shard's LRU list.
    lru: usize,
}

impl Entry {
    fn is_expired(&self) -> bool {
        time::is_expired(self.expires_at_ms)
    }
}

/// One partition: the map and its recency list, guarded together.
///
/// Invariant: every map entry owns exactly one list node, identified by
/// its `lru` handle, so `entries.len() == lru.len()` at all times.
#[derive(Default)]
struct Shard {
    entries: AHashMap<Box<str>, Entry>,
    lru: LruList,
}

/// The partitioned key-value store.
///
/// Shared across connections behind an `Arc`; all methods take `&self`.
pub struct ShardedStore {
    shards: [Mutex<Shard>; NUM_SHARDS],
    hasher: RandomState,
    max_keys_per_shard: usize,
    expired_keys: AtomicU64,
    evicted_keys: AtomicU64,
}

impl ShardedStore {
    /// Creates a store capped at roughly `max_keys` entries.
    ///
    /// The cap is enforced per shard as `max(1, max_keys / 16)`, so the
    /// effective global capacity is that value times the shard count.
    pub fn new(max_keys: usize) -> Self {
        Self {
            shards: std::array::from_fn(|_| Mutex::new(Shard::default())),
            hasher: RandomState::new(),
            max_keys_per_shard: (max_keys / NUM_SHARDS).max(1),
            expired_keys: AtomicU64::new(0),
            evicted_keys: AtomicU64::new(0),
        }
    }

    /// Inserts or replaces `key`, clearing any prior TTL.
    pub fn set(&self, key: &str, value: Bytes) {
        let mut shard = self.shards[self.shard_index(key)].lock();
        self.insert_or_update(&mut shard, key, value, time::NO_EXPIRY);
    }

    /// Inserts or replaces `key` with a TTL of `secs` seconds.
    ///
    /// `secs` must be at least 1; callers validate before reaching the
    /// store.
    pub fn set_ttl(&self, key: &str, value: Bytes, secs: u64) {
        let mut shard = self.shards[self.shard_index(key)].lock();
        let deadline = time::deadline_in_secs(secs);
        self.insert_or_update(&mut shard, key, value, deadline);
    }

    /// Returns the live value for `key` and marks it most recently used.
    ///
    /// An expired entry is removed in place and `None` is returned.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut shard = self.shards[self.shard_index(key)].lock();
        if self.remove_if_expired(&mut shard, key) {
            return None;
        }
        let (handle, value) = match shard.entries.get(key) {
            Some(entry) => (entry.lru, entry.value.clone()),
            None => return None,
        };
        shard.lru.move_to_front(handle);
        Some(value)
    }

    /// Removes `key`. Returns `true` iff a live entry was removed;
    /// an expired entry is reclaimed as a side effect and reported as
    /// absent.
    pub fn delete(&self, key: &str) -> bool {
        let mut shard = self.shards[self.shard_index(key)].lock();
        if self.remove_if_expired(&mut shard, key) {
            return false;
        }
        match shard.entries.remove(key) {
            Some(entry) => {
                shard.lru.remove(entry.lru);
                true
            }
            None => false,
        }
    }

    /// Sets the TTL of an existing live entry to `secs` seconds from
    /// now. Returns `true` iff applied. Non-positive `secs` is refused
    /// without touching the entry.
    pub fn expire(&self, key: &str, secs: i64) -> bool {
        if secs <= 0 {
            return false;
        }
        let mut shard = self.shards[self.shard_index(key)].lock();
        if self.remove_if_expired(&mut shard, key) {
            return false;
        }
        match shard.entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at_ms = time::deadline_in_secs(secs as u64);
                true
            }
            None => false,
        }
    }

    /// Remaining TTL for `key` in whole seconds: `-1` if the entry is
    /// live without an expiry, `-2` if it is absent or expired.
    pub fn ttl(&self, key: &str) -> i64 {
        let mut shard = self.shards[self.shard_index(key)].lock();
        if self.remove_if_expired(&mut shard, key) {
            return -2;
        }
        match shard.entries.get(key) {
            Some(entry) => match time::remaining_secs(entry.expires_at_ms) {
                Some(secs) => secs as i64,
                None => -1,
            },
            None => -2,
        }
    }

    /// Total entry count, summed shard by shard under each shard's own
    /// lock. Transient states across shards may be observed.
    pub fn size(&self) -> usize {
        self.shards.iter().map(|s| s.lock().entries.len()).sum()
    }

    /// Cumulative count of entries reclaimed by expiration.
    pub fn expired_keys_count(&self) -> u64 {
        self.expired_keys.load(Ordering::Relaxed)
    }

    /// Cumulative count of entries evicted under capacity pressure.
    pub fn evicted_keys_count(&self) -> u64 {
        self.evicted_keys.load(Ordering::Relaxed)
    }

    /// Scans up to `max_scan` entries of one shard and removes any that
    /// have expired. Returns the number removed. Used by the background
    /// sweep; takes the shard lock only for the duration of the scan.
    pub(crate) fn sweep_shard(&self, index: usize, max_scan: usize) -> usize {
        let mut shard = self.shards[index].lock();
        let expired: Vec<Box<str>> = shard
            .entries
            .iter()
            .take(max_scan)
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            if let Some(entry) = shard.entries.remove(&**key) {
                shard.lru.remove(entry.lru);
                self.expired_keys.fetch_add(1, Ordering::Relaxed);
            }
        }
        expired.len()
    }

    fn shard_index(&self, key: &str) -> usize {
        (self.hasher.hash_one(key) as usize) & (NUM_SHARDS - 1)
    }

    /// Shared write path for `set` and `set_ttl`. An update refreshes
    /// value, deadline, and recency in place; an insert first evicts
    /// from the LRU tail until the shard has room.
    fn insert_or_update(&self, shard: &mut Shard, key: &str, value: Bytes, expires_at_ms: u64) {
        if let Some(entry) = shard.entries.get_mut(key) {
            entry.value = value;
            entry.expires_at_ms = expires_at_ms;
            shard.lru.move_to_front(entry.lru);
            return;
        }

        while shard.entries.len() >= self.max_keys_per_shard {
            let Some(victim) = shard.lru.pop_back() else {
                break;
            };
            shard.entries.remove(&victim);
            self.evicted_keys.fetch_add(1, Ordering::Relaxed);
        }

        let handle = shard.lru.push_front(Box::from(key));
        shard.entries.insert(
            Box::from(key),
            Entry {
                value,
                expires_at_ms,
                lru: handle,
            },
        );
    }

    /// Lazy expiration: removes `key` if it is present and expired.
    /// Returns `true` if it was reclaimed, in which case the caller
    /// reports the key as absent.
    fn remove_if_expired(&self, shard: &mut Shard, key: &str) -> bool {
        let expired = shard
            .entries
            .get(key)
            .map(Entry::is_expired)
            .unwrap_or(false);
        if expired {
            if let Some(entry) = shard.entries.remove(key) {
                shard.lru.remove(entry.lru);
                self.expired_keys.fetch_add(1, Ordering::Relaxed);
            }
        }
        expired
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_KEYS)
    }
}
