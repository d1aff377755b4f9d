//! Shared fixtures for exercising the AML storage, facade and learning
//! layers without every test/benchmark re-deriving sample entities from
//! scratch.

use aml_core::cache::{AmlCacheManager, CachePolicy};
use aml_core::memory::MemoryStore;
use aml_core::security::audit::AuditLogger;
use aml_core::security::roles::{Principal, Role};
use aml_core::storage::{FsStorageEngine, StorageOptions};
use aml_core::types::{
    Approach, Conditions, Decision, Evolution, Fix, Metrics, Pattern, PatternBody, Problem,
    ProjectId, Solution, Value, ValueMap,
};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Builds a [`Pattern`] with plausible, fully-populated fields. Override
/// individual fields on the returned value as a test needs.
#[must_use]
pub fn sample_pattern(agent: &str, pattern_type: &str) -> Pattern {
    let now = chrono::Utc::now();
    let mut context = ValueMap::new();
    context.insert("framework".into(), Value::from("react"));

    Pattern {
        id: Uuid::new_v4(),
        agent: agent.into(),
        timestamp: now,
        pattern: PatternBody {
            r#type: pattern_type.to_string(),
            context,
            approach: Approach {
                technique: "memo".into(),
                code_template: "const X = React.memo(Component);".into(),
                rationale: "avoids re-render when props are unchanged".into(),
            },
            conditions: Conditions {
                when_applicable: vec!["pure-functional-component".into()],
                when_not_applicable: vec!["props-change-every-render".into()],
            },
        },
        metrics: Metrics {
            success_rate: 0.8,
            execution_count: 10,
            avg_time_saved_ms: 120.0,
            error_prevention_count: 1,
        },
        evolution: Evolution {
            created: now,
            last_used: now,
            refinements: 0,
            confidence_score: 0.6,
        },
    }
}

/// Builds a [`Solution`] keyed by a synthetic problem fingerprint.
#[must_use]
pub fn sample_solution(agent: &str, fingerprint: &str) -> Solution {
    let now = chrono::Utc::now();
    Solution {
        id: Uuid::new_v4(),
        agent: agent.into(),
        timestamp: now,
        problem: Problem {
            fingerprint: fingerprint.to_string(),
            symptoms: vec!["TypeError: cannot read property of undefined".into()],
        },
        fix: Fix {
            diff: Some("- a.b.c\n+ a?.b?.c".into()),
            steps: None,
            verification: "re-run the failing test suite".into(),
        },
        metrics: Metrics {
            success_rate: 0.9,
            execution_count: 5,
            avg_time_saved_ms: 300.0,
            error_prevention_count: 2,
        },
        evolution: Evolution {
            created: now,
            last_used: now,
            refinements: 0,
            confidence_score: 0.7,
        },
    }
}

/// Builds a [`Decision`] with no predecessor.
#[must_use]
pub fn sample_decision(agent: &str, question: &str) -> Decision {
    Decision {
        id: Uuid::new_v4(),
        agent: agent.into(),
        timestamp: chrono::Utc::now(),
        question: question.to_string(),
        chosen_option: "option-a".into(),
        alternatives: vec!["option-b".into()],
        rationale: "option-a has lower operational overhead".into(),
        consequences: vec!["requires a migration".into()],
        references: vec![],
        supersedes: None,
    }
}

/// A developer-role principal scoped to `project`/`agent`.
#[must_use]
pub fn developer_principal(user_id: &str, project: &str, agent: &str) -> Principal {
    Principal {
        user_id: user_id.to_string(),
        role: Role::Developer,
        project_id: project.into(),
        agent_name: Some(agent.into()),
    }
}

/// An admin-role principal with no agent scope restriction.
#[must_use]
pub fn admin_principal(user_id: &str, project: &str) -> Principal {
    Principal::admin(user_id, ProjectId::from(project))
}

/// Opens a [`MemoryStore`] rooted at `dir`, with compression and
/// encryption disabled so tests don't need to provision a key.
pub fn open_store(dir: &Path, project: &str) -> anyhow::Result<MemoryStore> {
    let storage = FsStorageEngine::open(
        dir,
        ProjectId::from(project),
        StorageOptions {
            compression: false,
            encryption: false,
        },
        None,
        1.0,
    )?;
    let cache = AmlCacheManager::new(200, None, CachePolicy::Lru);
    let audit = Arc::new(AuditLogger::new(dir.join("audit")));
    Ok(MemoryStore::new(storage, cache, audit, ProjectId::from(project)))
}
