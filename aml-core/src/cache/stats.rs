//! Cache hit/miss/eviction bookkeeping.

/// Hit/miss/eviction counters for one cache instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of `get` calls that found a live entry.
    pub hits: u64,
    /// Number of `get` calls that found nothing (absent or expired).
    pub misses: u64,
    /// Number of entries evicted (capacity or TTL).
    pub evictions: u64,
    /// Current number of entries.
    pub current_size: usize,
    /// Configured capacity.
    pub max_size: usize,
}

impl CacheStats {
    /// A fresh, empty stats block for a cache of the given capacity.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Default::default()
        }
    }

    /// `hits / (hits + misses)`, or `0.0` if there have been no lookups.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Resets hit/miss/eviction counters, leaving `current_size`/`max_size`
    /// untouched.
    pub fn reset(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }
}
