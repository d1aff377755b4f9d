//! The Memory Store Facade: the per-agent CRUD surface over
//! patterns, solutions and decisions, composing storage, cache, access
//! control, and audit.

use crate::cache::AmlCacheManager;
use crate::error::{Error, Result};
use crate::security::audit::{AuditEvent, AuditEventType, AuditLogger};
use crate::security::roles::{Operation, Principal, ResourceRef};
use crate::security::AccessControl;
use crate::storage::{Collection, FsStorageEngine, StorageKey};
use crate::types::{AgentName, Decision, Pattern, ProjectId, Solution, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Fired after a successful write, consumed by the learning coordinator to
/// update weights, Q-values, and time series.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    /// Agent the event belongs to.
    pub agent: AgentName,
    /// What kind of entity was written.
    pub entity_kind: EntityKind,
    /// The entity's id.
    pub entity_id: Uuid,
    /// Whether the write represented a success outcome, where applicable.
    pub succeeded: Option<bool>,
}

/// Which collection a [`UsageEvent`]/audit event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A pattern.
    Pattern,
    /// A solution.
    Solution,
    /// A decision.
    Decision,
}

impl EntityKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Solution => "solution",
            Self::Decision => "decision",
        }
    }
}

/// Hook the facade calls after every successful write, decoupling it from
/// the learning modules. Errors here are swallowed and only traced:
/// learning-module errors never block a storage write.
pub trait LearningEventSink: Send + Sync {
    /// Handles one usage event. Must not panic; any internal failure should
    /// be logged and absorbed.
    fn on_usage_event(&self, event: &UsageEvent);
}

struct NoopSink;
impl LearningEventSink for NoopSink {
    fn on_usage_event(&self, _event: &UsageEvent) {}
}

/// The per-project memory store: patterns, solutions, decisions, and
/// global key/value data for every agent in the project.
pub struct MemoryStore {
    storage: FsStorageEngine,
    cache: Mutex<AmlCacheManager>,
    access_control: AccessControl,
    audit: Arc<AuditLogger>,
    project_id: ProjectId,
    learning_sink: Arc<dyn LearningEventSink>,
}

impl MemoryStore {
    /// Assembles a facade over an already-open storage engine, cache
    /// manager, and audit logger.
    #[must_use]
    pub fn new(
        storage: FsStorageEngine,
        cache: AmlCacheManager,
        audit: Arc<AuditLogger>,
        project_id: ProjectId,
    ) -> Self {
        Self {
            storage,
            cache: Mutex::new(cache),
            access_control: AccessControl::new(),
            audit,
            project_id,
            learning_sink: Arc::new(NoopSink),
        }
    }

    /// Installs a learning-module dispatch sink, replacing the no-op
    /// default.
    pub fn set_learning_sink(&mut self, sink: Arc<dyn LearningEventSink>) {
        self.learning_sink = sink;
    }

    /// Creates the on-disk directory tree for `agent` if it doesn't exist.
    pub fn ensure_agent_directory(&self, agent: &AgentName) -> Result<()> {
        self.storage.ensure_agent_directory(agent)
    }

    /// Root of the live storage tree, for components (e.g. [`crate::metrics`],
    /// [`crate::backup::BackupManager`]) that need to walk it directly.
    #[must_use]
    pub fn storage_root(&self) -> &std::path::Path {
        self.storage.root()
    }

    /// Combined hit/miss/eviction counters across the four sub-caches.
    #[must_use]
    pub fn cache_stats(&self) -> crate::cache::CombinedCacheStats {
        self.cache.lock().combined_stats()
    }

    /// The audit logger backing this store, for report generation.
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    /// Counts of live patterns/solutions/decisions owned by `agent`.
    pub fn entity_counts(&self, agent: &AgentName) -> Result<(usize, usize, usize)> {
        Ok((
                self.storage.list(agent, Collection::Patterns)?.len(),
                self.storage.list(agent, Collection::Solutions)?.len(),
                self.storage.list(agent, Collection::Decisions)?.len(),
        ))
    }

    fn resource_for(&self, agent: &AgentName) -> ResourceRef {
        ResourceRef {
            project_id: Some(self.project_id.clone()),
            agent_name: Some(agent.clone()),
            owner_id: None,
            resource_id: None,
        }
    }

    fn record_audit(
        &self,
        event_type: AuditEventType,
        principal: &Principal,
        agent: Option<&AgentName>,
        action: &str,
        resource_id: Option<Uuid>,
        resource_type: Option<&str>,
        success: bool,
        error: Option<&Error>,
    ) {
        self.audit.record(AuditEvent {
                id: Uuid::new_v4(),
                timestamp: chrono::Utc::now(),
                event_type,
                agent: agent.cloned(),
                project: Some(self.project_id.clone()),
                action: action.to_string(),
                resource_id,
                resource_type: resource_type.map(str::to_string),
                success,
                error: error.map(|e| e.kind().to_string()),
                metadata: None,
                user_id: Some(principal.user_id.clone()),
        });
    }

    // ---- Patterns -----------------------------------------------------

    /// Creates `pattern`, owned by `pattern.agent`. Fails with
    /// `AlreadyExists` if the id is already present.
    pub fn add_pattern(&self, principal: &Principal, pattern: Pattern) -> Result<Pattern> {
        pattern.check_invariants()?;
        self.access_control.require_access(
            principal,
            Operation::PatternWrite,
            Some(&self.resource_for(&pattern.agent)),
        )?;

        let key = StorageKey::pattern(pattern.agent.clone(), pattern.id);
        if self.storage.exists(&key) {
            let err = Error::AlreadyExists(pattern.id);
            self.record_audit(
                AuditEventType::Write,
                principal,
                Some(&pattern.agent),
                "pattern.create",
                Some(pattern.id),
                Some("pattern"),
                false,
                Some(&err),
            );
            return Err(err);
        }

        let bytes = serde_json::to_vec(&pattern)?;
        self.storage.put(&key, &bytes)?;
        self.cache.lock().patterns().set(pattern.id, pattern.clone());
        self.record_audit(
            AuditEventType::Write,
            principal,
            Some(&pattern.agent),
            "pattern.create",
            Some(pattern.id),
            Some("pattern"),
            true,
            None,
        );
        self.learning_sink.on_usage_event(&UsageEvent {
                agent: pattern.agent.clone(),
                entity_kind: EntityKind::Pattern,
                entity_id: pattern.id,
                succeeded: Some(pattern.metrics.success_rate >= 0.5),
        });
        Ok(pattern)
    }

    /// Reads every pattern owned by `agent`, applying `predicate` if given.
    pub fn get_patterns(
        &self,
        principal: &Principal,
        agent: &AgentName,
        predicate: Option<&dyn Fn(&Pattern) -> bool>,
    ) -> Result<Vec<Pattern>> {
        self.access_control.require_access(
            principal,
            Operation::PatternRead,
            Some(&self.resource_for(agent)),
        )?;

        let ids = self.storage.list(agent, Collection::Patterns)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let pattern = self.load_pattern(agent, id)?;
            if predicate.is_none_or(|f| f(&pattern)) {
                out.push(pattern);
            }
        }
        self.record_audit(
            AuditEventType::Read,
            principal,
            Some(agent),
            "pattern.list",
            None,
            Some("pattern"),
            true,
            None,
        );
        Ok(out)
    }

    fn load_pattern(&self, agent: &AgentName, id: Uuid) -> Result<Pattern> {
        if let Some(cached) = self.cache.lock().patterns().get(&id) {
            return Ok(cached);
        }
        let key = StorageKey::pattern(agent.clone(), id);
        let bytes = self.storage.get(&key)?;
        let pattern: Pattern = serde_json::from_slice(&bytes)?;
        self.cache.lock().patterns().set(id, pattern.clone());
        Ok(pattern)
    }

    /// Overwrites an existing pattern. Fails with `NotFound` if absent.
    pub fn update_pattern(&self, principal: &Principal, pattern: Pattern) -> Result<Pattern> {
        pattern.check_invariants()?;
        self.access_control.require_access(
            principal,
            Operation::PatternWrite,
            Some(&self.resource_for(&pattern.agent)),
        )?;

        let key = StorageKey::pattern(pattern.agent.clone(), pattern.id);
        if !self.storage.exists(&key) {
            let err = Error::NotFound(pattern.id.to_string());
            self.record_audit(
                AuditEventType::Write,
                principal,
                Some(&pattern.agent),
                "pattern.update",
                Some(pattern.id),
                Some("pattern"),
                false,
                Some(&err),
            );
            return Err(err);
        }

        let bytes = serde_json::to_vec(&pattern)?;
        self.storage.put(&key, &bytes)?;
        self.cache.lock().patterns().set(pattern.id, pattern.clone());
        self.record_audit(
            AuditEventType::Write,
            principal,
            Some(&pattern.agent),
            "pattern.update",
            Some(pattern.id),
            Some("pattern"),
            true,
            None,
        );
        self.learning_sink.on_usage_event(&UsageEvent {
                agent: pattern.agent.clone(),
                entity_kind: EntityKind::Pattern,
                entity_id: pattern.id,
                succeeded: Some(pattern.metrics.success_rate >= 0.5),
        });
        Ok(pattern)
    }

    /// Deletes a pattern by id. Idempotent: deleting an absent id succeeds.
    /// Cascades to the pattern's time-series history unless
    /// `cascade_history` is `false`.
    pub fn delete_pattern(
        &self,
        principal: &Principal,
        agent: &AgentName,
        id: Uuid,
        cascade_history: bool,
    ) -> Result<()> {
        self.access_control.require_access(
            principal,
            Operation::PatternDelete,
            Some(&self.resource_for(agent)),
        )?;

        let key = StorageKey::pattern(agent.clone(), id);
        self.storage.delete(&key)?;
        self.cache.lock().patterns().delete(&id);
        if cascade_history {
            let _ = self.storage.delete(&StorageKey::Global(format!("timeseries/{id}")));
        }
        self.record_audit(
            AuditEventType::Delete,
            principal,
            Some(agent),
            "pattern.delete",
            Some(id),
            Some("pattern"),
            true,
            None,
        );
        Ok(())
    }

    // ---- Solutions ------------------------------------------------------

    /// Creates `solution`. Fails with `AlreadyExists` if the id is already
    /// present.
    pub fn add_solution(&self, principal: &Principal, solution: Solution) -> Result<Solution> {
        solution.check_invariants()?;
        self.access_control.require_access(
            principal,
            Operation::SolutionWrite,
            Some(&self.resource_for(&solution.agent)),
        )?;

        let key = StorageKey::solution(solution.agent.clone(), solution.id);
        if self.storage.exists(&key) {
            return Err(Error::AlreadyExists(solution.id));
        }
        let bytes = serde_json::to_vec(&solution)?;
        self.storage.put(&key, &bytes)?;
        self.cache.lock().solutions().set(solution.id, solution.clone());
        self.record_audit(
            AuditEventType::Write,
            principal,
            Some(&solution.agent),
            "solution.create",
            Some(solution.id),
            Some("solution"),
            true,
            None,
        );
        self.learning_sink.on_usage_event(&UsageEvent {
                agent: solution.agent.clone(),
                entity_kind: EntityKind::Solution,
                entity_id: solution.id,
                succeeded: Some(solution.metrics.success_rate >= 0.5),
        });
        Ok(solution)
    }

    /// Reads every solution owned by `agent`.
    pub fn get_solutions(&self, principal: &Principal, agent: &AgentName) -> Result<Vec<Solution>> {
        self.access_control.require_access(
            principal,
            Operation::SolutionRead,
            Some(&self.resource_for(agent)),
        )?;
        let ids = self.storage.list(agent, Collection::Solutions)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(cached) = self.cache.lock().solutions().get(&id) {
                out.push(cached);
                continue;
            }
            let bytes = self.storage.get(&StorageKey::solution(agent.clone(), id))?;
            let solution: Solution = serde_json::from_slice(&bytes)?;
            self.cache.lock().solutions().set(id, solution.clone());
            out.push(solution);
        }
        Ok(out)
    }

    /// Overwrites an existing solution. Fails with `NotFound` if absent.
    pub fn update_solution(&self, principal: &Principal, solution: Solution) -> Result<Solution> {
        solution.check_invariants()?;
        self.access_control.require_access(
            principal,
            Operation::SolutionWrite,
            Some(&self.resource_for(&solution.agent)),
        )?;
        let key = StorageKey::solution(solution.agent.clone(), solution.id);
        if !self.storage.exists(&key) {
            let err = Error::NotFound(solution.id.to_string());
            self.record_audit(
                AuditEventType::Write,
                principal,
                Some(&solution.agent),
                "solution.update",
                Some(solution.id),
                Some("solution"),
                false,
                Some(&err),
            );
            return Err(err);
        }
        let bytes = serde_json::to_vec(&solution)?;
        self.storage.put(&key, &bytes)?;
        self.cache.lock().solutions().set(solution.id, solution.clone());
        self.record_audit(
            AuditEventType::Write,
            principal,
            Some(&solution.agent),
            "solution.update",
            Some(solution.id),
            Some("solution"),
            true,
            None,
        );
        self.learning_sink.on_usage_event(&UsageEvent {
                agent: solution.agent.clone(),
                entity_kind: EntityKind::Solution,
                entity_id: solution.id,
                succeeded: Some(solution.metrics.success_rate >= 0.5),
        });
        Ok(solution)
    }

    /// Deletes a solution by id. Idempotent.
    pub fn delete_solution(&self, principal: &Principal, agent: &AgentName, id: Uuid) -> Result<()> {
        self.access_control.require_access(
            principal,
            Operation::SolutionDelete,
            Some(&self.resource_for(agent)),
        )?;
        self.storage.delete(&StorageKey::solution(agent.clone(), id))?;
        self.cache.lock().solutions().delete(&id);
        self.record_audit(
            AuditEventType::Delete,
            principal,
            Some(agent),
            "solution.delete",
            Some(id),
            Some("solution"),
            true,
            None,
        );
        Ok(())
    }

    // ---- Decisions (append-only; no update) ----------------------------

    /// Records a new decision. Decisions are append-only; there is no
    /// `update_decision`.
    pub fn add_decision(&self, principal: &Principal, decision: Decision) -> Result<Decision> {
        self.access_control.require_access(
            principal,
            Operation::DecisionWrite,
            Some(&self.resource_for(&decision.agent)),
        )?;
        let key = StorageKey::decision(decision.agent.clone(), decision.id);
        if self.storage.exists(&key) {
            return Err(Error::AlreadyExists(decision.id));
        }
        let bytes = serde_json::to_vec(&decision)?;
        self.storage.put(&key, &bytes)?;
        self.cache.lock().decisions().set(decision.id, decision.clone());
        self.record_audit(
            AuditEventType::Write,
            principal,
            Some(&decision.agent),
            "decision.create",
            Some(decision.id),
            Some("decision"),
            true,
            None,
        );
        self.learning_sink.on_usage_event(&UsageEvent {
                agent: decision.agent.clone(),
                entity_kind: EntityKind::Decision,
                entity_id: decision.id,
                succeeded: None,
        });
        Ok(decision)
    }

    /// Reads every decision recorded by `agent`.
    pub fn get_decisions(&self, principal: &Principal, agent: &AgentName) -> Result<Vec<Decision>> {
        self.access_control.require_access(
            principal,
            Operation::DecisionRead,
            Some(&self.resource_for(agent)),
        )?;
        let ids = self.storage.list(agent, Collection::Decisions)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(cached) = self.cache.lock().decisions().get(&id) {
                out.push(cached);
                continue;
            }
            let bytes = self.storage.get(&StorageKey::decision(agent.clone(), id))?;
            let decision: Decision = serde_json::from_slice(&bytes)?;
            self.cache.lock().decisions().set(id, decision.clone());
            out.push(decision);
        }
        Ok(out)
    }

    /// Deletes a decision by id. Admin escape hatch only ( minimum
    /// role); idempotent.
    pub fn delete_decision(&self, principal: &Principal, agent: &AgentName, id: Uuid) -> Result<()> {
        self.access_control.require_access(
            principal,
            Operation::DecisionDelete,
            Some(&self.resource_for(agent)),
        )?;
        self.storage.delete(&StorageKey::decision(agent.clone(), id))?;
        self.cache.lock().decisions().delete(&id);
        self.record_audit(
            AuditEventType::Delete,
            principal,
            Some(agent),
            "decision.delete",
            Some(id),
            Some("decision"),
            true,
            None,
        );
        Ok(())
    }

    // ---- Global data ----------------------------------------------------

    /// Reads a project-wide (non agent-scoped) key.
    pub fn get_global_data(&self, principal: &Principal, key: &str) -> Result<Value> {
        self.access_control.require_access(principal, Operation::ConfigRead, None)?;
        let bytes = self.storage.get_global(key)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes a project-wide key.
    pub fn set_global_data(&self, principal: &Principal, key: &str, value: &Value) -> Result<()> {
        self.access_control.require_access(principal, Operation::ConfigWrite, None)?;
        let bytes = serde_json::to_vec(value)?;
        self.storage.set_global(key, &bytes)?;
        self.record_audit(
            AuditEventType::Write,
            principal,
            None,
            "global.set",
            None,
            Some("global"),
            true,
            None,
        );
        Ok(())
    }

    // ---- Bulk operations -------------------------------------------------

    /// Exports every pattern, solution, and decision owned by `agent` as a
    /// single JSON-serializable bundle.
    pub fn export_memory(&self, principal: &Principal, agent: &AgentName) -> Result<ExportedMemory> {
        self.access_control.require_access(
            principal,
            Operation::MemoryExport,
            Some(&self.resource_for(agent)),
        )?;
        Ok(ExportedMemory {
                agent: agent.clone(),
                patterns: self.get_patterns(principal, agent, None)?,
                solutions: self.get_solutions(principal, agent)?,
                decisions: self.get_decisions(principal, agent)?,
        })
    }

    /// Deletes every pattern, solution and decision owned by `agent`.
    pub fn clear_memory(&self, principal: &Principal, agent: &AgentName) -> Result<()> {
        self.access_control.require_access(
            principal,
            Operation::MemoryClear,
            Some(&self.resource_for(agent)),
        )?;
        for id in self.storage.list(agent, Collection::Patterns)? {
            self.storage.delete(&StorageKey::pattern(agent.clone(), id))?;
            self.cache.lock().patterns().delete(&id);
        }
        for id in self.storage.list(agent, Collection::Solutions)? {
            self.storage.delete(&StorageKey::solution(agent.clone(), id))?;
            self.cache.lock().solutions().delete(&id);
        }
        for id in self.storage.list(agent, Collection::Decisions)? {
            self.storage.delete(&StorageKey::decision(agent.clone(), id))?;
            self.cache.lock().decisions().delete(&id);
        }
        self.record_audit(
            AuditEventType::Delete,
            principal,
            Some(agent),
            "memory.clear",
            None,
            None,
            true,
            None,
        );
        Ok(())
    }
}

/// The result of [`MemoryStore::export_memory`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportedMemory {
    /// The agent this export covers.
    pub agent: AgentName,
    /// All of the agent's patterns.
    pub patterns: Vec<Pattern>,
    /// All of the agent's solutions.
    pub solutions: Vec<Solution>,
    /// All of the agent's decisions.
    pub decisions: Vec<Decision>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;
    use crate::security::Role;
    use crate::storage::StorageOptions;
    use crate::types::{Approach, Conditions, Evolution, Metrics, PatternBody, ValueMap};

    fn sample_pattern(agent: &str, id: Uuid) -> Pattern {
        let now = chrono::Utc::now();
        Pattern {
            id,
            agent: agent.into(),
            timestamp: now,
            pattern: PatternBody {
                r#type: "react-opt".into(),
                context: ValueMap::new(),
                approach: Approach {
                    technique: "memo".into(),
                    code_template: String::new(),
                    rationale: String::new(),
                },
                conditions: Conditions::default(),
            },
            metrics: Metrics {
                success_rate: 0.8,
                execution_count: 1,
                avg_time_saved_ms: 100.0,
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

    fn store(dir: &std::path::Path) -> MemoryStore {
        let storage = FsStorageEngine::open(
            dir,
            "proj".into(),
            StorageOptions {
                compression: false,
                encryption: false,
            },
            None,
            1.0,
        )
        .expect("open");
        let cache = AmlCacheManager::new(100, None, CachePolicy::Lru);
        let audit = Arc::new(AuditLogger::new(dir.join("audit")));
        MemoryStore::new(storage, cache, audit, "proj".into())
    }

    #[test]
    fn write_then_read_pattern_scenario() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let alice = Principal {
            user_id: "alice".into(),
            role: Role::Developer,
            project_id: "proj".into(),
            agent_name: Some("agent-1".into()),
        };
        let id = Uuid::new_v4();
        store.ensure_agent_directory(&"agent-1".into()).expect("mkdir");
        store.add_pattern(&alice, sample_pattern("agent-1", id)).expect("add");
        let patterns = store.get_patterns(&alice, &"agent-1".into(), None).expect("get");
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].id, id);
    }

    #[test]
    fn cross_agent_isolation_scenario() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let alice = Principal {
            user_id: "alice".into(),
            role: Role::Developer,
            project_id: "proj".into(),
            agent_name: Some("agent-1".into()),
        };
        let bob = Principal {
            user_id: "bob".into(),
            role: Role::Developer,
            project_id: "proj".into(),
            agent_name: Some("agent-2".into()),
        };
        let admin = Principal::admin("root", "proj".into());

        store.ensure_agent_directory(&"agent-1".into()).expect("mkdir");
        store.add_pattern(&alice, sample_pattern("agent-1", Uuid::new_v4())).expect("add");

        let denied = store.get_patterns(&bob, &"agent-1".into(), None);
        assert!(matches!(denied, Err(Error::AccessDenied(_))));

        let allowed = store.get_patterns(&admin, &"agent-1".into(), None).expect("admin read");
        assert_eq!(allowed.len(), 1);
    }

    #[test]
    fn duplicate_create_fails_and_delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let admin = Principal::admin("root", "proj".into());
        let id = Uuid::new_v4();
        store.ensure_agent_directory(&"agent-1".into()).expect("mkdir");
        store.add_pattern(&admin, sample_pattern("agent-1", id)).expect("add");
        let dup = store.add_pattern(&admin, sample_pattern("agent-1", id));
        assert!(matches!(dup, Err(Error::AlreadyExists(_))));

        store.delete_pattern(&admin, &"agent-1".into(), id, true).expect("delete");
        store.delete_pattern(&admin, &"agent-1".into(), id, true).expect("idempotent delete");
    }

    #[test]
    fn update_on_absent_id_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(dir.path());
        let admin = Principal::admin("root", "proj".into());
        store.ensure_agent_directory(&"agent-1".into()).expect("mkdir");
        let result = store.update_pattern(&admin, sample_pattern("agent-1", Uuid::new_v4()));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
