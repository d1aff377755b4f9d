//! LRU eviction policy, built on the `lru` crate.

use crate::cache::stats::CacheStats;
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

fn expired<V>(entry: &Entry<V>) -> bool {
    entry.expires_at.is_some_and(|at| Instant::now() > at)
}

/// Bounded cache evicting the least-recently-used entry on overflow.
pub struct LruBoundedCache<K: Hash + Eq + Clone, V: Clone> {
    inner: LruCache<K, Entry<V>>,
    ttl: Option<Duration>,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V: Clone> LruBoundedCache<K, V> {
    /// A new cache holding at most `max_size` live entries, each expiring
    /// after `ttl` if set.
    #[must_use]
    pub fn new(max_size: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(max_size.max(1)).expect("max(1) is never zero");
        Self {
            inner: LruCache::new(cap),
            ttl,
            stats: CacheStats::new(max_size),
        }
    }

    /// Inserts or overwrites `key`, refreshing its TTL and LRU position.
    pub fn set(&mut self, key: K, value: V) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        let evicted = self.inner.push(key, Entry { value, expires_at });
        if evicted.is_some() {
            self.stats.evictions += 1;
        }
        self.stats.current_size = self.inner.len();
    }

    /// Returns the live value for `key`, moving it to the most-recently-used
    /// position. Expired entries are evicted and counted as a miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        if let Some(entry) = self.inner.peek(key) {
            if expired(entry) {
                self.inner.pop(key);
                self.stats.current_size = self.inner.len();
                self.stats.misses += 1;
                return None;
            }
        }
        match self.inner.get(key) {
            Some(entry) => {
                self.stats.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Whether `key` has a live entry, without affecting LRU order (
    /// "`has(k)` does not reorder LRU").
    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        self.inner.peek(key).is_some_and(|e| !expired(e))
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let removed = self.inner.pop(key).is_some();
        self.stats.current_size = self.inner.len();
        removed
    }

    /// Removes every entry, keeping accumulated stats.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.stats.current_size = 0;
    }

    /// All live keys, in most-recently-used-first order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Number of entries currently stored (including not-yet-swept expired
    /// ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Sweeps all expired entries, returning how many were removed.
    pub fn evict_expired(&mut self) -> usize {
        let expired_keys: Vec<K> = self
        .inner
        .iter()
        .filter(|(_, entry)| expired(entry))
        .map(|(k, _)| k.clone())
        .collect();
        for key in &expired_keys {
            self.inner.pop(key);
        }
        self.stats.current_size = self.inner.len();
        expired_keys.len()
    }

    /// Shrinks or grows capacity, evicting least-recently-used entries
    /// immediately if shrinking below the current size.
    pub fn resize(&mut self, new_max: usize) {
        let cap = NonZeroUsize::new(new_max.max(1)).expect("max(1) is never zero");
        self.inner.resize(cap);
        self.stats.max_size = new_max;
        self.stats.current_size = self.inner.len();
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
    fn eviction_with_hit_accounting_matches_scenario() {
        let mut cache: LruBoundedCache<&str, i32> = LruBoundedCache::new(2, None);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("c", 3);

        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"c"), Some(3));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn has_does_not_reorder_lru() {
        let mut cache: LruBoundedCache<&str, i32> = LruBoundedCache::new(2, None);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.has(&"a"));
        cache.set("c", 3);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn ttl_expiry_counts_as_miss() {
        let mut cache: LruBoundedCache<&str, i32> = LruBoundedCache::new(4, Some(Duration::from_millis(1)));
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn shrinking_evicts_down_to_new_capacity() {
        let mut cache: LruBoundedCache<&str, i32> = LruBoundedCache::new(4, None);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.resize(1);
        assert_eq!(cache.len(), 1);
    }
}
