//! Configuration schema and validation.
//!
//! Validation collects every failure into a single `ConfigError` list of
//! `{path, message}` entries rather than raising on the first problem, so
//! callers can surface all of a bad config's mistakes at once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigError {
    /// Dotted path to the offending field, e.g. `"storage.maxSizeGb"`.
    pub path: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ConfigError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// `storage.backupSchedule` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupSchedule {
    /// Take a backup every hour.
    Hourly,
    /// Take a backup once a day.
    Daily,
    /// Take a backup once a week.
    Weekly,
}

/// `sharing.telemetry` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryLevel {
    /// No telemetry emitted.
    None,
    /// Telemetry with identifying fields stripped.
    Anonymous,
    /// Telemetry with full context.
    Full,
}

/// `storage` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSection {
    /// Storage backend identifier; only `"filesystem"` is implemented.
    pub backend: String,
    /// Root directory for the memory tree.
    pub path: String,
    /// Whether records are AEAD-encrypted at rest.
    pub encryption: bool,
    /// Whether records are transparently compressed.
    pub compression: bool,
    /// Maximum total size of the memory tree, in gigabytes.
    pub max_size_gb: f64,
    /// Whether the backup manager is active.
    pub backup_enabled: bool,
    /// Root directory for backup archives and manifests.
    pub backup_path: String,
    /// How often backups should be taken.
    pub backup_schedule: BackupSchedule,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "filesystem".to_string(),
            path: "memory".to_string(),
            encryption: true,
            compression: true,
            max_size_gb: 1.0,
            backup_enabled: true,
            backup_path: "memory-backups".to_string(),
            backup_schedule: BackupSchedule::Daily,
        }
    }
}

/// `learning` configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSection {
    /// Floor below which a pattern is no longer recommended.
    pub min_confidence: f64,
    /// Number of successful uses before a pattern is "promoted".
    pub promotion_threshold: u32,
    /// Q-learning step size (α).
    pub learning_rate: f64,
    /// Q-learning discount factor (γ).
    pub discount_factor: f64,
    /// ε-greedy exploration rate.
    pub exploration_rate: f64,
}

impl Default for LearningSection {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            promotion_threshold: 3,
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 0.2,
        }
    }
}

/// `pruning` configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruningSection {
    /// Whether background pruning is enabled.
    pub enabled: bool,
    /// Maximum age, in days, before a low-value entity is eligible for pruning.
    pub max_age_days: u32,
    /// Confidence floor below which a pattern is eligible for pruning.
    pub min_confidence: f64,
    /// Usage-rate floor below which a pattern is eligible for pruning.
    pub min_usage_rate: f64,
    /// Prune more aggressively (e.g. ignore the age floor).
    pub aggressive_mode: bool,
    /// Whether deleting a pattern also deletes its time-series history.
    pub cascade_delete_history: bool,
}

impl Default for PruningSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_days: 90,
            min_confidence: 0.2,
            min_usage_rate: 0.1,
            aggressive_mode: false,
            cascade_delete_history: true,
        }
    }
}

/// `sharing` configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingSection {
    /// Whether patterns may be auto-shared across agents within a project.
    pub cross_agent: bool,
    /// Whether patterns may be shared across projects (disabled by default,
    /// when enabled, implemented as a read-only reference to the other
    /// project's store, never a merged namespace).
    pub cross_project: bool,
    /// Telemetry verbosity for sharing events.
    pub telemetry: TelemetryLevel,
    /// Whether background sync across agents is enabled.
    pub sync_enabled: bool,
}

impl Default for SharingSection {
    fn default() -> Self {
        Self {
            cross_agent: true,
            cross_project: false,
            telemetry: TelemetryLevel::None,
            sync_enabled: false,
        }
    }
}

/// `performance` configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSection {
    /// Whether the cache layer is active.
    pub cache_enabled: bool,
    /// Cache budget, in megabytes, shared across the four sub-caches.
    pub cache_max_size_mb: u64,
    /// Cache entry time-to-live, in seconds.
    pub cache_ttl_seconds: u64,
    /// Soft deadline for read operations, in milliseconds.
    pub query_timeout_ms: u64,
    /// Soft deadline for write operations, in milliseconds.
    pub write_timeout_ms: u64,
    /// Whether secondary indexes are maintained.
    pub indexing_enabled: bool,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_max_size_mb: 100,
            cache_ttl_seconds: 3600,
            query_timeout_ms: 50,
            write_timeout_ms: 100,
            indexing_enabled: true,
        }
    }
}

/// Per-agent partial override of the global sections above, plus
/// agent-specific quotas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOverride {
    /// Override for `learning.minConfidence`.
    pub min_confidence: Option<f64>,
    /// Override for `learning.learningRate`.
    pub learning_rate: Option<f64>,
    /// Override for `learning.explorationRate`.
    pub exploration_rate: Option<f64>,
    /// Per-agent memory budget, in megabytes.
    pub memory_limit_mb: Option<u64>,
    /// Declared areas this agent tends to work in.
    pub focus_areas: Vec<String>,
    /// Maximum number of patterns retained for this agent.
    pub max_pattern_count: u32,
    /// Maximum number of solutions retained for this agent.
    pub max_solution_count: u32,
    /// Maximum number of decisions retained for this agent.
    pub max_decision_count: u32,
}

impl AgentOverride {
    /// Defaults (`maxPatternCount (500)`, etc.), with all scalar
    /// overrides unset so they fall back to the global section.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            max_pattern_count: 500,
            max_solution_count: 300,
            max_decision_count: 200,
            ..Default::default()
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmlConfig {
    /// Storage engine settings.
    pub storage: StorageSection,
    /// Learning-algorithm settings.
    pub learning: LearningSection,
    /// Pruning policy settings.
    pub pruning: PruningSection,
    /// Cross-agent/cross-project sharing settings.
    pub sharing: SharingSection,
    /// Cache and latency budget settings.
    pub performance: PerformanceSection,
    /// Per-agent partial overrides, keyed by agent name.
    #[serde(default)]
    pub agent_overrides: BTreeMap<String, AgentOverride>,
}

impl Default for AmlConfig {
    fn default() -> Self {
        Self {
            storage: StorageSection::default(),
            learning: LearningSection::default(),
            pruning: PruningSection::default(),
            sharing: SharingSection::default(),
            performance: PerformanceSection::default(),
            agent_overrides: BTreeMap::new(),
        }
    }
}

impl AmlConfig {
    /// Parses a TOML document, merging onto defaults for any omitted
    /// fields, then validates the result.
    pub fn from_toml_str(text: &str) -> Result<Self, Vec<ConfigError>> {
        let partial: PartialConfig = toml::from_str(text).map_err(|e| {
                vec![ConfigError::new("<root>", format!("TOML parse error: {e}"))]
        })?;
        let config = partial.merge_onto_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Effective learning rate for `agent`, applying any per-agent override.
    #[must_use]
    pub fn learning_rate_for(&self, agent: &str) -> f64 {
        self.agent_overrides
        .get(agent)
        .and_then(|o| o.learning_rate)
        .unwrap_or(self.learning.learning_rate)
    }

    /// Effective exploration rate for `agent`, applying any per-agent override.
    #[must_use]
    pub fn exploration_rate_for(&self, agent: &str) -> f64 {
        self.agent_overrides
        .get(agent)
        .and_then(|o| o.exploration_rate)
        .unwrap_or(self.learning.exploration_rate)
    }

    /// Effective minimum confidence for `agent`, applying any per-agent override.
    #[must_use]
    pub fn min_confidence_for(&self, agent: &str) -> f64 {
        self.agent_overrides
        .get(agent)
        .and_then(|o| o.min_confidence)
        .unwrap_or(self.learning.min_confidence)
    }

    /// Validates numeric ranges and cross-field constraints, returning the
    /// full list of violations rather than failing fast.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.storage.max_size_gb <= 0.0 {
            errors.push(ConfigError::new(
                    "storage.maxSizeGb",
                    "must be a positive number of gigabytes",
            ));
        }
        if self.storage.path.trim().is_empty() {
            errors.push(ConfigError::new("storage.path", "must not be empty"));
        }
        if self.storage.backend != "filesystem" {
            errors.push(ConfigError::new(
                    "storage.backend",
                    format!("unsupported backend '{}'; only 'filesystem' is implemented", self.storage.backend),
            ));
        }

        for (path, value) in [
            ("learning.minConfidence", self.learning.min_confidence),
            ("learning.learningRate", self.learning.learning_rate),
            ("learning.discountFactor", self.learning.discount_factor),
            ("learning.explorationRate", self.learning.exploration_rate),
            ("pruning.minConfidence", self.pruning.min_confidence),
            ("pruning.minUsageRate", self.pruning.min_usage_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(path, "must be in [0, 1]"));
            }
        }

        if self.performance.cache_max_size_mb == 0 {
            errors.push(ConfigError::new(
                    "performance.cacheMaxSizeMb",
                    "must be greater than zero",
            ));
        }

        for (agent, over) in &self.agent_overrides {
            for (field, value) in [
                ("minConfidence", over.min_confidence),
                ("learningRate", over.learning_rate),
                ("explorationRate", over.exploration_rate),
            ] {
                if let Some(v) = value {
                    if !(0.0..=1.0).contains(&v) {
                        errors.push(ConfigError::new(
                                &format!("agentOverrides.{agent}.{field}"),
                                "must be in [0, 1]",
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Mirrors [`AmlConfig`] with every field optional, used purely as a TOML
/// deserialization target so a config file only needs to name the fields
/// it overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialConfig {
    storage: Option<PartialStorage>,
    learning: Option<PartialLearning>,
    pruning: Option<PartialPruning>,
    sharing: Option<PartialSharing>,
    performance: Option<PartialPerformance>,
    #[serde(default)]
    agent_overrides: BTreeMap<String, AgentOverride>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialStorage {
    backend: Option<String>,
    path: Option<String>,
    encryption: Option<bool>,
    compression: Option<bool>,
    max_size_gb: Option<f64>,
    backup_enabled: Option<bool>,
    backup_path: Option<String>,
    backup_schedule: Option<BackupSchedule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialLearning {
    min_confidence: Option<f64>,
    promotion_threshold: Option<u32>,
    learning_rate: Option<f64>,
    discount_factor: Option<f64>,
    exploration_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialPruning {
    enabled: Option<bool>,
    max_age_days: Option<u32>,
    min_confidence: Option<f64>,
    min_usage_rate: Option<f64>,
    aggressive_mode: Option<bool>,
    cascade_delete_history: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialSharing {
    cross_agent: Option<bool>,
    cross_project: Option<bool>,
    telemetry: Option<TelemetryLevel>,
    sync_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialPerformance {
    cache_enabled: Option<bool>,
    cache_max_size_mb: Option<u64>,
    cache_ttl_seconds: Option<u64>,
    query_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    indexing_enabled: Option<bool>,
}

impl PartialConfig {
    fn merge_onto_defaults(self) -> AmlConfig {
        let mut config = AmlConfig::default();

        if let Some(s) = self.storage {
            if let Some(v) = s.backend { config.storage.backend = v; }
            if let Some(v) = s.path { config.storage.path = v; }
            if let Some(v) = s.encryption { config.storage.encryption = v; }
            if let Some(v) = s.compression { config.storage.compression = v; }
            if let Some(v) = s.max_size_gb { config.storage.max_size_gb = v; }
            if let Some(v) = s.backup_enabled { config.storage.backup_enabled = v; }
            if let Some(v) = s.backup_path { config.storage.backup_path = v; }
            if let Some(v) = s.backup_schedule { config.storage.backup_schedule = v; }
        }
        if let Some(l) = self.learning {
            if let Some(v) = l.min_confidence { config.learning.min_confidence = v; }
            if let Some(v) = l.promotion_threshold { config.learning.promotion_threshold = v; }
            if let Some(v) = l.learning_rate { config.learning.learning_rate = v; }
            if let Some(v) = l.discount_factor { config.learning.discount_factor = v; }
            if let Some(v) = l.exploration_rate { config.learning.exploration_rate = v; }
        }
        if let Some(p) = self.pruning {
            if let Some(v) = p.enabled { config.pruning.enabled = v; }
            if let Some(v) = p.max_age_days { config.pruning.max_age_days = v; }
            if let Some(v) = p.min_confidence { config.pruning.min_confidence = v; }
            if let Some(v) = p.min_usage_rate { config.pruning.min_usage_rate = v; }
            if let Some(v) = p.aggressive_mode { config.pruning.aggressive_mode = v; }
            if let Some(v) = p.cascade_delete_history { config.pruning.cascade_delete_history = v; }
        }
        if let Some(sh) = self.sharing {
            if let Some(v) = sh.cross_agent { config.sharing.cross_agent = v; }
            if let Some(v) = sh.cross_project { config.sharing.cross_project = v; }
            if let Some(v) = sh.telemetry { config.sharing.telemetry = v; }
            if let Some(v) = sh.sync_enabled { config.sharing.sync_enabled = v; }
        }
        if let Some(perf) = self.performance {
            if let Some(v) = perf.cache_enabled { config.performance.cache_enabled = v; }
            if let Some(v) = perf.cache_max_size_mb { config.performance.cache_max_size_mb = v; }
            if let Some(v) = perf.cache_ttl_seconds { config.performance.cache_ttl_seconds = v; }
            if let Some(v) = perf.query_timeout_ms { config.performance.query_timeout_ms = v; }
            if let Some(v) = perf.write_timeout_ms { config.performance.write_timeout_ms = v; }
            if let Some(v) = perf.indexing_enabled { config.performance.indexing_enabled = v; }
        }
        config.agent_overrides = self.agent_overrides;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AmlConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_toml_merges_onto_defaults_deterministically() {
        let a = AmlConfig::from_toml_str("").expect("empty config should validate");
        let b = AmlConfig::from_toml_str("").expect("empty config should validate");
        assert_eq!(a, b);
        assert_eq!(a, AmlConfig::default());
    }

    #[test]
    fn out_of_range_learning_rate_is_rejected() {
        let toml = "[learning]\nlearningRate = 1.5\n";
        let errs = AmlConfig::from_toml_str(toml).expect_err("should fail validation");
        assert!(errs.iter().any(|e| e.path == "learning.learningRate"));
    }

    #[test]
    fn unsupported_backend_is_rejected() {
        let toml = "[storage]\nbackend = \"s3\"\n";
        let errs = AmlConfig::from_toml_str(toml).expect_err("should fail validation");
        assert!(errs.iter().any(|e| e.path == "storage.backend"));
    }

    #[test]
    fn partial_override_only_changes_named_field() {
        let toml = "[storage]\nmaxSizeGb = 5.0\n";
        let config = AmlConfig::from_toml_str(toml).expect("valid config");
        assert_eq!(config.storage.max_size_gb, 5.0);
        assert_eq!(config.storage.path, StorageSection::default().path);
    }

    #[test]
    fn agent_override_changes_effective_rate() {
        let mut config = AmlConfig::default();
        config.agent_overrides.insert(
            "agent-1".to_string(),
            AgentOverride {
                learning_rate: Some(0.5),
                ..AgentOverride::with_defaults()
            },
        );
        assert_eq!(config.learning_rate_for("agent-1"), 0.5);
        assert_eq!(config.learning_rate_for("agent-2"), config.learning.learning_rate);
    }
}
