//! LFU eviction policy: evict the lowest access count, tie-broken
//! by insertion order. The `lru` crate has no LFU mode, so this is
//! hand-rolled.

use crate::cache::stats::CacheStats;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    freq: u64,
    inserted_at: u64,
    expires_at: Option<Instant>,
}

/// Bounded cache evicting the least-frequently-used entry on overflow.
pub struct LfuBoundedCache<K: Hash + Eq + Clone, V: Clone> {
    map: HashMap<K, Entry<V>>,
    max_size: usize,
    ttl: Option<Duration>,
    insertion_counter: u64,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V: Clone> LfuBoundedCache<K, V> {
    /// A new cache holding at most `max_size` live entries.
    #[must_use]
    pub fn new(max_size: usize, ttl: Option<Duration>) -> Self {
        Self {
            map: HashMap::new(),
            max_size: max_size.max(1),
            ttl,
            insertion_counter: 0,
            stats: CacheStats::new(max_size),
        }
    }

    fn next_order(&mut self) -> u64 {
        self.insertion_counter += 1;
        self.insertion_counter
    }

    fn evict_one(&mut self) {
        let victim = self
        .map
        .iter()
        .min_by_key(|(_, entry)| (entry.freq, entry.inserted_at))
        .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            self.map.remove(&key);
            self.stats.evictions += 1;
        }
    }

    /// Inserts or overwrites `key`. Overwriting preserves the existing
    /// access count rather than resetting it.
    pub fn set(&mut self, key: K, value: V) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        if let Some(entry) = self.map.get_mut(&key) {
            entry.value = value;
            entry.expires_at = expires_at;
        } else {
            if self.map.len() >= self.max_size {
                self.evict_one();
            }
            let inserted_at = self.next_order();
            self.map.insert(
                key,
                Entry {
                    value,
                    freq: 0,
                    inserted_at,
                    expires_at,
                },
            );
        }
        self.stats.current_size = self.map.len();
    }

    /// Returns the live value for `key`, incrementing its access count.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let expired = self
        .map
        .get(key)
        .is_some_and(|e| e.expires_at.is_some_and(|at| Instant::now() > at));
        if expired {
            self.map.remove(key);
            self.stats.current_size = self.map.len();
            self.stats.misses += 1;
            return None;
        }
        match self.map.get_mut(key) {
            Some(entry) => {
                entry.freq += 1;
                self.stats.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Whether `key` has a live entry, without affecting its access count.
    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        self.map
        .get(key)
        .is_some_and(|e| !e.expires_at.is_some_and(|at| Instant::now() > at))
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let removed = self.map.remove(key).is_some();
        self.stats.current_size = self.map.len();
        removed
    }

    /// Removes every entry, keeping accumulated stats.
    pub fn clear(&mut self) {
        self.map.clear();
        self.stats.current_size = 0;
    }

    /// All live keys, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.map.keys().cloned().collect()
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Sweeps all expired entries, returning how many were removed.
    pub fn evict_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<K> = self
        .map
        .iter()
        .filter(|(_, e)| e.expires_at.is_some_and(|at| now > at))
        .map(|(k, _)| k.clone())
        .collect();
        for key in &expired_keys {
            self.map.remove(key);
        }
        self.stats.current_size = self.map.len();
        expired_keys.len()
    }

    /// Shrinks or grows capacity, evicting down to the new size immediately
    /// if shrinking.
    pub fn resize(&mut self, new_max: usize) {
        self.max_size = new_max.max(1);
        while self.map.len() > self.max_size {
            self.evict_one();
        }
        self.stats.max_size = new_max;
        self.stats.current_size = self.map.len();
    }

    /// Current hit/miss/eviction counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Resets hit/miss/eviction counters.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_lowest_frequency_key() {
        let mut cache: LfuBoundedCache<&str, i32> = LfuBoundedCache::new(2, None);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get(&"a");
        cache.get(&"a");
        cache.get(&"b");
        cache.set("c", 3);
        assert!(cache.has(&"a"));
        assert!(!cache.has(&"b"));
        assert!(cache.has(&"c"));
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut cache: LfuBoundedCache<&str, i32> = LfuBoundedCache::new(2, None);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"c"));
    }
}
