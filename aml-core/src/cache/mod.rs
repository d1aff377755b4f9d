//! Bounded cache layer: a generic LRU/LFU cache plus the AML Cache
//! Manager that composes four quota-allocated sub-caches.

pub mod lfu_cache;
pub mod lru_cache;
pub mod stats;

use crate::types::{Decision, Pattern, Solution};
use lfu_cache::LfuBoundedCache;
use lru_cache::LruBoundedCache;
use std::hash::Hash;
use std::time::Duration;
use uuid::Uuid;

pub use stats::CacheStats;

/// Which eviction policy a [`Cache`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Evict least-recently-used.
    Lru,
    /// Evict least-frequently-used.
    Lfu,
}

/// A generic bounded cache, policy-parameterized.
pub enum Cache<K: Hash + Eq + Clone, V: Clone> {
    /// LRU-backed.
    Lru(LruBoundedCache<K, V>),
    /// LFU-backed.
    Lfu(LfuBoundedCache<K, V>),
}

impl<K: Hash + Eq + Clone, V: Clone> Cache<K, V> {
    /// A new cache of `max_size` entries under `policy`, each entry
    /// expiring after `ttl` if set.
    #[must_use]
    pub fn new(policy: CachePolicy, max_size: usize, ttl: Option<Duration>) -> Self {
        match policy {
            CachePolicy::Lru => Self::Lru(LruBoundedCache::new(max_size, ttl)),
            CachePolicy::Lfu => Self::Lfu(LfuBoundedCache::new(max_size, ttl)),
        }
    }

    /// Inserts or overwrites `key`.
    pub fn set(&mut self, key: K, value: V) {
        match self {
            Self::Lru(c) => c.set(key, value),
            Self::Lfu(c) => c.set(key, value),
        }
    }

    /// Returns the live value for `key`, recording a hit or miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self {
            Self::Lru(c) => c.get(key),
            Self::Lfu(c) => c.get(key),
        }
    }

    /// Whether `key` has a live entry, without affecting eviction order.
    #[must_use]
    pub fn has(&self, key: &K) -> bool {
        match self {
            Self::Lru(c) => c.has(key),
            Self::Lfu(c) => c.has(key),
        }
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        match self {
            Self::Lru(c) => c.delete(key),
            Self::Lfu(c) => c.delete(key),
        }
    }

    /// Removes every entry, keeping accumulated stats.
    pub fn clear(&mut self) {
        match self {
            Self::Lru(c) => c.clear(),
            Self::Lfu(c) => c.clear(),
        }
    }

    /// All live keys.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        match self {
            Self::Lru(c) => c.keys(),
            Self::Lfu(c) => c.keys(),
        }
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Lru(c) => c.len(),
            Self::Lfu(c) => c.len(),
        }
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweeps expired entries, returning how many were removed.
    pub fn evict_expired(&mut self) -> usize {
        match self {
            Self::Lru(c) => c.evict_expired(),
            Self::Lfu(c) => c.evict_expired(),
        }
    }

    /// Shrinks or grows capacity, evicting down to the new size if needed.
    pub fn resize(&mut self, new_max: usize) {
        match self {
            Self::Lru(c) => c.resize(new_max),
            Self::Lfu(c) => c.resize(new_max),
        }
    }

    /// Current hit/miss/eviction counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        match self {
            Self::Lru(c) => c.stats(),
            Self::Lfu(c) => c.stats(),
        }
    }

    /// Resets hit/miss/eviction counters.
    pub fn reset_stats(&mut self) {
        match self {
            Self::Lru(c) => c.reset_stats(),
            Self::Lfu(c) => c.reset_stats(),
        }
    }
}

/// Combined stats across all sub-caches in the [`AmlCacheManager`].
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CombinedCacheStats {
    /// Sum of hits across sub-caches.
    pub hits: u64,
    /// Sum of misses across sub-caches.
    pub misses: u64,
    /// Sum of evictions across sub-caches.
    pub evictions: u64,
    /// Overall hit rate across all sub-caches.
    pub hit_rate: f64,
}

const PATTERN_QUOTA: f64 = 0.40;
const SOLUTION_QUOTA: f64 = 0.30;
const DECISION_QUOTA: f64 = 0.15;
const QUERY_QUOTA: f64 = 0.15;

fn quota(total: usize, fraction: f64) -> usize {
    ((total as f64) * fraction).round().max(1.0) as usize
}

/// Composes four independent caches (pattern, solution, decision, query)
/// with proportional quotas (40/30/15/15) of a shared entry budget.
pub struct AmlCacheManager {
    patterns: Cache<Uuid, Pattern>,
    solutions: Cache<Uuid, Solution>,
    decisions: Cache<Uuid, Decision>,
    queries: Cache<String, Vec<u8>>,
}

impl AmlCacheManager {
    /// Builds the manager, splitting `total_capacity` entries across the
    /// four sub-caches by their fixed quota.
    #[must_use]
    pub fn new(total_capacity: usize, ttl: Option<Duration>, policy: CachePolicy) -> Self {
        Self {
            patterns: Cache::new(policy, quota(total_capacity, PATTERN_QUOTA), ttl),
            solutions: Cache::new(policy, quota(total_capacity, SOLUTION_QUOTA), ttl),
            decisions: Cache::new(policy, quota(total_capacity, DECISION_QUOTA), ttl),
            queries: Cache::new(policy, quota(total_capacity, QUERY_QUOTA), ttl),
        }
    }

    /// The pattern sub-cache.
    pub fn patterns(&mut self) -> &mut Cache<Uuid, Pattern> {
        &mut self.patterns
    }

    /// The solution sub-cache.
    pub fn solutions(&mut self) -> &mut Cache<Uuid, Solution> {
        &mut self.solutions
    }

    /// The decision sub-cache.
    pub fn decisions(&mut self) -> &mut Cache<Uuid, Decision> {
        &mut self.decisions
    }

    /// The query-result sub-cache.
    pub fn queries(&mut self) -> &mut Cache<String, Vec<u8>> {
        &mut self.queries
    }

    /// Seeds the pattern/solution/decision sub-caches with `preload`
    /// entries ahead of first use.
    pub fn warm_cache(
        &mut self,
        patterns: Vec<Pattern>,
        solutions: Vec<Solution>,
        decisions: Vec<Decision>,
    ) {
        for pattern in patterns {
            self.patterns.set(pattern.id, pattern);
        }
        for solution in solutions {
            self.solutions.set(solution.id, solution);
        }
        for decision in decisions {
            self.decisions.set(decision.id, decision);
        }
    }

    /// Sums hit/miss/eviction counters across all four sub-caches and
    /// derives an overall hit rate.
    #[must_use]
    pub fn combined_stats(&self) -> CombinedCacheStats {
        let all = [
            self.patterns.stats(),
            self.solutions.stats(),
            self.decisions.stats(),
            self.queries.stats(),
        ];
        let hits: u64 = all.iter().map(|s| s.hits).sum();
        let misses: u64 = all.iter().map(|s| s.misses).sum();
        let evictions: u64 = all.iter().map(|s| s.evictions).sum();
        let total = hits + misses;
        CombinedCacheStats {
            hits,
            misses,
            evictions,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotas_split_budget_proportionally() {
        let manager = AmlCacheManager::new(100, None, CachePolicy::Lru);
        assert_eq!(manager.patterns.len(), 0);
        // indirectly exercised via resize-independent capacity checks below
        let mut manager = manager;
        for _ in 0..41 {
            manager.patterns.set(Uuid::new_v4(), sample_pattern());
        }
        assert!(manager.patterns.len() <= 40);
    }

    #[test]
    fn combined_stats_sum_across_sub_caches() {
        let mut manager = AmlCacheManager::new(20, None, CachePolicy::Lru);
        let id = Uuid::new_v4();
        manager.patterns.set(id, sample_pattern());
        manager.patterns.get(&id);
        manager.solutions.get(&Uuid::new_v4());
        let combined = manager.combined_stats();
        assert_eq!(combined.hits, 1);
        assert_eq!(combined.misses, 1);
    }

    fn sample_pattern() -> Pattern {
        use crate::types::{Approach, Conditions, Evolution, Metrics, PatternBody, ValueMap};
        let now = chrono::Utc::now();
        Pattern {
            id: Uuid::new_v4(),
            agent: "agent-1".into(),
            timestamp: now,
            pattern: PatternBody {
                r#type: "t".into(),
                context: ValueMap::new(),
                approach: Approach {
                    technique: "memo".into(),
                    code_template: String::new(),
                    rationale: String::new(),
                },
                conditions: Conditions::default(),
            },
            metrics: Metrics {
                success_rate: 0.5,
                execution_count: 1,
                avg_time_saved_ms: 0.0,
                error_prevention_count: 0,
            },
            evolution: Evolution {
                created: now,
                last_used: now,
                refinements: 0,
                confidence_score: 0.5,
            },
        }
    }
}
