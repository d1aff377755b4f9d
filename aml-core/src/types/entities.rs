//! Core data-model entities: Pattern, Solution, Decision, Agent Profile,
//! Time-series Point, Q-Table Entry, Audit Event, Backup Descriptor.

use crate::types::ids::AgentName;
use crate::types::value::ValueMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a pattern, solution, or decision was arrived at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approach {
    /// Short name of the technique applied.
    pub technique: String,
    /// Reusable code fragment, if any.
    pub code_template: String,
    /// Why this approach works, for future agents reading it back.
    pub rationale: String,
}

/// Preconditions under which a pattern is (and isn't) a good fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Contexts where the pattern is known to apply.
    pub when_applicable: Vec<String>,
    /// Contexts where the pattern is known not to apply.
    pub when_not_applicable: Vec<String>,
}

/// Observed outcome statistics for a pattern or solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Fraction of applications that succeeded, in `[0, 1]`.
    pub success_rate: f64,
    /// Total number of times the pattern has been applied.
    pub execution_count: u64,
    /// Average wall-clock time saved per application, in milliseconds.
    pub avg_time_saved_ms: f64,
    /// Number of times applying the pattern prevented an error.
    pub error_prevention_count: u64,
}

impl Metrics {
    /// Derives `(successCount, failureCount)` from `success_rate` and
    /// `execution_count`, rounding to the nearest integer split. Kept
    /// derivable rather than stored twice so the invariant
    /// `executionCount = successCount + failureCount` can never drift.
    #[must_use]
    pub fn success_failure_counts(&self) -> (u64, u64) {
        let successes = (self.success_rate * self.execution_count as f64).round() as u64;
        let successes = successes.min(self.execution_count);
        (successes, self.execution_count - successes)
    }

    /// Folds in one new observation, updating `success_rate` and
    /// `execution_count` in place.
    pub fn record_observation(&mut self, succeeded: bool, time_saved_ms: f64) {
        let (successes, _) = self.success_failure_counts();
        let new_successes = successes + u64::from(succeeded);
        self.execution_count += 1;
        self.success_rate = new_successes as f64 / self.execution_count as f64;
        self.avg_time_saved_ms = (self.avg_time_saved_ms * (self.execution_count - 1) as f64
            + time_saved_ms)
        / self.execution_count as f64;
    }
}

/// Evolution metadata: how a pattern has aged and been refined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evolution {
    /// When the pattern was first observed.
    pub created: DateTime<Utc>,
    /// When the pattern was last applied.
    pub last_used: DateTime<Utc>,
    /// Number of times the pattern's approach has been refined.
    pub refinements: u32,
    /// Wilson-score confidence in `[0, 1]`.
    pub confidence_score: f64,
}

/// The technique body of a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternBody {
    /// Free-form category, e.g. `"react-opt"`.
    pub r#type: String,
    /// Free-form key/value context the pattern was observed in.
    pub context: ValueMap,
    /// The technique itself.
    pub approach: Approach,
    /// Applicability preconditions.
    pub conditions: Conditions,
}

/// A reusable technique extracted from repeated agent actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning agent.
    pub agent: AgentName,
    /// When this record was created.
    pub timestamp: DateTime<Utc>,
    /// The technique.
    pub pattern: PatternBody,
    /// Observed outcome statistics.
    pub metrics: Metrics,
    /// Aging/refinement metadata.
    pub evolution: Evolution,
}

impl Pattern {
    /// Validates the invariants from `lastUsed >= created` and
    /// `confidenceScore`/`successRate` within `[0, 1]`.
    pub fn check_invariants(&self) -> crate::error::Result<()> {
        if self.evolution.last_used < self.evolution.created {
            return Err(crate::error::Error::Validation(
                    "evolution.lastUsed must be >= evolution.created".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.metrics.success_rate) {
            return Err(crate::error::Error::Validation(
                    "metrics.successRate must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.evolution.confidence_score) {
            return Err(crate::error::Error::Validation(
                    "evolution.confidenceScore must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Symptoms and fingerprint identifying a reproducible problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Stable fingerprint (e.g. a hash of the error signature).
    pub fingerprint: String,
    /// Human-observable symptoms of the problem.
    pub symptoms: Vec<String>,
}

/// The fix applied to resolve a problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Unified diff, if the fix is code-shaped.
    pub diff: Option<String>,
    /// Ordered remediation steps, if the fix is procedural.
    pub steps: Option<Vec<String>>,
    /// How to confirm the fix worked.
    pub verification: String,
}

/// A concrete fix keyed by a problem fingerprint. Shape parallels
/// [`Pattern`] but swaps `pattern`/`conditions` for `problem`/`fix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning agent.
    pub agent: AgentName,
    /// When this record was created.
    pub timestamp: DateTime<Utc>,
    /// The problem this solution addresses.
    pub problem: Problem,
    /// The fix.
    pub fix: Fix,
    /// Observed outcome statistics.
    pub metrics: Metrics,
    /// Aging/refinement metadata.
    pub evolution: Evolution,
}

impl Solution {
    /// Mirrors [`Pattern::check_invariants`].
    pub fn check_invariants(&self) -> crate::error::Result<()> {
        if self.evolution.last_used < self.evolution.created {
            return Err(crate::error::Error::Validation(
                    "evolution.lastUsed must be >= evolution.created".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.metrics.success_rate) {
            return Err(crate::error::Error::Validation(
                    "metrics.successRate must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// A durable architectural choice. Decisions are append-only;
/// superseding is modeled by a new decision referencing the old id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning agent.
    pub agent: AgentName,
    /// When this decision was recorded.
    pub timestamp: DateTime<Utc>,
    /// The question being decided.
    pub question: String,
    /// The option that was chosen.
    pub chosen_option: String,
    /// Alternatives that were considered and rejected.
    pub alternatives: Vec<String>,
    /// Why the chosen option won.
    pub rationale: String,
    /// Expected downstream consequences.
    pub consequences: Vec<String>,
    /// Supporting references (URLs, doc paths, other decision ids as text).
    pub references: Vec<String>,
    /// If this decision supersedes an earlier one, its id.
    pub supersedes: Option<Uuid>,
}

/// How advanced an agent's typical task complexity is, for cross-agent
/// adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// Simple, narrowly scoped tasks.
    Basic,
    /// Typical day-to-day tasks.
    Intermediate,
    /// Architecturally significant tasks.
    Advanced,
}

/// Registered capabilities of an agent, used for cross-agent compatibility
/// scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Agent name.
    pub name: AgentName,
    /// Capability tags, e.g. `"refactoring"`, `"testing"`.
    pub capabilities: Vec<String>,
    /// Domain tags, e.g. `"frontend"`, `"infra"`.
    pub domains: Vec<String>,
    /// What the agent tends to focus on.
    pub focus_areas: Vec<String>,
    /// Typical task complexity this agent handles.
    pub complexity: ComplexityLevel,
    /// Learning rate used by this agent's RL policy.
    pub learning_rate: f64,
}

/// One observation in a per-pattern time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// The pattern this point belongs to.
    pub pattern_id: Uuid,
    /// When the observation was taken.
    pub timestamp: DateTime<Utc>,
    /// The observed value (e.g. a rolling success rate).
    pub value: f64,
}

/// A single `(agent, state, action) -> q-value` entry with its visit count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QTableEntry {
    /// Current Q-value estimate.
    pub q_value: f64,
    /// Number of times this `(state, action)` pair has been updated.
    pub visit_count: u64,
}

/// Backup type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupType {
    /// Complete snapshot of the memory tree.
    Full,
    /// Only files that changed since the base full backup.
    Incremental,
}

/// Manifest entry for a single archived file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFileEntry {
    /// Path relative to the memory root.
    pub path: String,
    /// Lowercase hex SHA-256 of the file's plaintext content.
    pub sha256: String,
    /// File size in bytes.
    pub size: u64,
}

/// Metadata describing one backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDescriptor {
    /// Unique backup identifier.
    pub backup_id: String,
    /// When the backup was taken.
    pub timestamp: DateTime<Utc>,
    /// Full or incremental.
    pub r#type: BackupType,
    /// For incremental backups, the full backup it is relative to.
    pub base_backup_id: Option<String>,
    /// Total archived size in bytes.
    pub size: u64,
    /// SHA-256 checksum of the archive as a whole.
    pub archive_checksum: String,
    /// Per-file manifest entries.
    pub files: Vec<BackupFileEntry>,
    /// Agents whose data is present in this backup.
    pub agents_included: Vec<AgentName>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics(rate: f64, count: u64) -> Metrics {
        Metrics {
            success_rate: rate,
            execution_count: count,
            avg_time_saved_ms: 0.0,
            error_prevention_count: 0,
        }
    }

    #[test]
    fn success_failure_counts_sum_to_execution_count() {
        let m = sample_metrics(0.75, 4);
        let (s, f) = m.success_failure_counts();
        assert_eq!(s + f, m.execution_count);
        assert_eq!(s, 3);
        assert_eq!(f, 1);
    }

    #[test]
    fn record_observation_updates_rate_and_count() {
        let mut m = sample_metrics(1.0, 1);
        m.record_observation(false, 50.0);
        assert_eq!(m.execution_count, 2);
        assert!((m.success_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn pattern_invariant_rejects_last_used_before_created() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(10);
        let pattern = Pattern {
            id: Uuid::new_v4(),
            agent: AgentName::from("agent-1"),
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
            metrics: sample_metrics(0.5, 2),
            evolution: Evolution {
                created: now,
                last_used: earlier,
                refinements: 0,
                confidence_score: 0.5,
            },
        };
        assert!(pattern.check_invariants().is_err());
    }
}
