//! Metrics: rolled-up per-agent performance, learning,
//! usage and storage counters, plus a derived health score.
//!
//! Unlike the other components, metrics are read-side only: nothing here
//! mutates the store. [`AgentMetricsReport::collect`] snapshots whatever
//! the facade, cache manager, audit logger and learning coordinator
//! already expose, assembling a point-in-time view rather than
//! maintaining a parallel counter store.

use crate::cache::CombinedCacheStats;
use crate::learning::LearningCoordinator;
use crate::memory::MemoryStore;
use crate::types::AgentName;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Storage-side counters for one agent's partition of the memory tree.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StorageMetrics {
    /// Total bytes on disk under the agent's directory.
    pub bytes_used: u64,
    /// Number of pattern records.
    pub pattern_count: usize,
    /// Number of solution records.
    pub solution_count: usize,
    /// Number of decision records.
    pub decision_count: usize,
}

impl StorageMetrics {
    /// Total entity count across all three collections.
    #[must_use]
    pub fn total_entities(&self) -> usize {
        self.pattern_count + self.solution_count + self.decision_count
    }
}

/// Cache hit-rate counters, re-exported at the agent level.
pub type CacheMetrics = CombinedCacheStats;

/// Reinforcement-learning and trend counters for one agent.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct LearningMetrics {
    /// Number of `(state, action)` entries in the agent's Q-table.
    pub q_table_size: usize,
    /// Mean Q-value across the table; near zero with an empty table.
    pub mean_q_value: f64,
    /// Current exploration rate.
    pub epsilon: f64,
    /// Number of experiences retained for replay.
    pub replay_size: usize,
}

/// Audit-derived usage counters for one agent.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct UsageMetrics {
    /// Total audit events recorded for the agent in the report window.
    pub total_operations: usize,
    /// Events where `success == false`.
    pub failed_operations: usize,
    /// Events of type `Delete`.
    pub delete_count: usize,
    /// Events where access was denied.
    pub access_denied_count: usize,
}

impl UsageMetrics {
    /// Fraction of operations that succeeded, 1.0 if none were recorded.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            1.0
        } else {
            1.0 - (self.failed_operations as f64 / self.total_operations as f64)
        }
    }
}

/// A rolled-up snapshot for one agent, combining storage, cache, learning
/// and usage counters plus a derived 0..=1 health score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentMetricsReport {
    /// Agent the snapshot covers.
    pub agent: AgentName,
    /// When the snapshot was taken.
    pub collected_at: DateTime<Utc>,
    /// Storage counters.
    pub storage: StorageMetrics,
    /// Cache counters.
    pub cache: CacheMetrics,
    /// Learning counters.
    pub learning: LearningMetrics,
    /// Audit-derived usage counters over the report window.
    pub usage: UsageMetrics,
    /// Derived health score in `[0, 1]`; see [`AgentMetricsReport::health_score`].
    pub health_score: f64,
}

fn directory_size(root: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(meta) = entry.metadata() {
                total += meta.len();
            }
        }
    }
    total
}

impl AgentMetricsReport {
    /// Assembles a snapshot for `agent` as of now, covering audit events
    /// since `usage_window_start`.
    pub fn collect(
        store: &MemoryStore,
        learning: &LearningCoordinator,
        agent: &AgentName,
        usage_window_start: DateTime<Utc>,
    ) -> crate::error::Result<Self> {
        let (pattern_count, solution_count, decision_count) = store.entity_counts(agent)?;
        let agent_dir = store.storage_root().join(agent.as_str());
        let bytes_used = if agent_dir.exists() { directory_size(&agent_dir) } else { 0 };
        let storage = StorageMetrics {
            bytes_used,
            pattern_count,
            solution_count,
            decision_count,
        };

        let cache = store.cache_stats();

        let q_stats = learning.q_stats(agent);
        let lr = LearningMetrics {
            q_table_size: q_stats.as_ref().map_or(0, |s| s.entry_count),
            mean_q_value: q_stats.as_ref().map_or(0.0, |s| s.mean_value),
            epsilon: q_stats.as_ref().map_or(0.0, |s| s.epsilon),
            replay_size: q_stats.as_ref().map_or(0, |s| s.replay_size),
        };

        let report = store.audit().generate_report(usage_window_start, Utc::now());
        let usage = UsageMetrics {
            total_operations: report.total_events,
            failed_operations: report.failure_count,
            delete_count: report.delete_count,
            access_denied_count: report.access_denied_count,
        };

        let health_score = Self::compute_health_score(&storage, &cache, &usage);

        Ok(Self {
                agent: agent.clone(),
                collected_at: Utc::now(),
                storage,
                cache,
                learning: lr,
                usage,
                health_score,
        })
    }

    /// Weighted blend of cache effectiveness, audit success rate, and
    /// storage headroom into a single `[0, 1]` health indicator. Usage
    /// success rate dominates, cache hit rate is a secondary efficiency
    /// signal, and storage headroom only matters once an agent's
    /// partition is close to exhaustion.
    #[must_use]
    fn compute_health_score(storage: &StorageMetrics, cache: &CacheMetrics, usage: &UsageMetrics) -> f64 {
        const SUCCESS_WEIGHT: f64 = 0.5;
        const CACHE_WEIGHT: f64 = 0.3;
        const HEADROOM_WEIGHT: f64 = 0.2;

        let success = usage.success_rate();
        let cache_component = if storage.total_entities() == 0 { 1.0 } else { cache.hit_rate };
        // Headroom degrades only past 10k entities per agent; below that
        // storage pressure isn't a meaningful health signal.
        let headroom = (1.0 - (storage.total_entities() as f64 / 10_000.0)).clamp(0.0, 1.0);

        (SUCCESS_WEIGHT * success + CACHE_WEIGHT * cache_component + HEADROOM_WEIGHT * headroom).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_score_is_perfect_for_an_empty_fresh_agent() {
        let storage = StorageMetrics::default();
        let cache = CacheMetrics::default();
        let usage = UsageMetrics::default();
        let score = AgentMetricsReport::compute_health_score(&storage, &cache, &usage);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn health_score_drops_with_failures() {
        let storage = StorageMetrics {
            pattern_count: 10,
            ..Default::default()
        };
        let cache = CacheMetrics {
            hits: 8,
            misses: 2,
            evictions: 0,
            hit_rate: 0.8,
        };
        let healthy_usage = UsageMetrics {
            total_operations: 100,
            failed_operations: 0,
            delete_count: 0,
            access_denied_count: 0,
        };
        let unhealthy_usage = UsageMetrics {
            total_operations: 100,
            failed_operations: 80,
            delete_count: 0,
            access_denied_count: 5,
        };
        let healthy = AgentMetricsReport::compute_health_score(&storage, &cache, &healthy_usage);
        let unhealthy = AgentMetricsReport::compute_health_score(&storage, &cache, &unhealthy_usage);
        assert!(healthy > unhealthy);
    }

    #[test]
    fn health_score_is_bounded() {
        let storage = StorageMetrics {
            pattern_count: 50_000,
            ..Default::default()
        };
        let cache = CacheMetrics {
            hits: 0,
            misses: 100,
            evictions: 50,
            hit_rate: 0.0,
        };
        let usage = UsageMetrics {
            total_operations: 10,
            failed_operations: 10,
            delete_count: 0,
            access_denied_count: 10,
        };
        let score = AgentMetricsReport::compute_health_score(&storage, &cache, &usage);
        assert!((0.0..=1.0).contains(&score));
    }
}
