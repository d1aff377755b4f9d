//! Learning Algorithms: the five statistical subsystems that
//! turn raw usage events from the memory facade into recommendations,
//! adapted patterns, and tuned Q-values.
//!
//! [`LearningCoordinator`] is the glue: it implements
//! [`crate::memory::LearningEventSink`] and fans each
//! [`crate::memory::UsageEvent`] out to per-entity trend tracking and a
//! per-agent reinforcement-learning table. The heavier, context-rich
//! algorithms ([`pattern_recognition`], [`cross_agent`]) take their inputs
//! directly rather than through the thin usage-event channel, since they
//! need data (action sequences, agent profiles) the facade doesn't capture
//! in a single CRUD event.

pub mod cross_agent;
pub mod pattern_recognition;
pub mod reinforcement;
pub mod stats;
pub mod success_weighting;
pub mod trend_analysis;

use crate::memory::{LearningEventSink, UsageEvent};
use crate::types::{AgentName, TimeSeriesPoint};
use parking_lot::Mutex;
use reinforcement::{ActionKey, QLearner, ReinforcementConfig, RewardConfig, RewardSignal, StateKey};
use std::collections::HashMap;
use trend_analysis::TimeSeries;
use uuid::Uuid;

const DEFAULT_TREND_HISTORY: usize = 500;

/// Coordinates the learning subsystems that can react to a bare usage event
/// alone: per-entity outcome trend history and per-agent reinforcement
/// learning. Cross-agent and pattern-recognition operations are exposed as
/// direct methods since they need richer input than a [`UsageEvent`]
/// carries.
pub struct LearningCoordinator {
    trends: Mutex<HashMap<Uuid, TimeSeries>>,
    q_learners: Mutex<HashMap<AgentName, QLearner>>,
    cross_agent: cross_agent::CrossAgentLearner,
    reinforcement_config: ReinforcementConfig,
    reward_config: RewardConfig,
}

impl LearningCoordinator {
    /// Builds a coordinator with default subsystem configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trends: Mutex::new(HashMap::new()),
            q_learners: Mutex::new(HashMap::new()),
            cross_agent: cross_agent::CrossAgentLearner::new(cross_agent::CrossAgentConfig::default()),
            reinforcement_config: ReinforcementConfig::default(),
            reward_config: RewardConfig::default(),
        }
    }

    /// The cross-agent learning subsystem, for registering profiles and
    /// requesting adaptation/sharing/conflict-resolution directly.
    #[must_use]
    pub fn cross_agent(&self) -> &cross_agent::CrossAgentLearner {
        &self.cross_agent
    }

    /// A snapshot of the outcome trend recorded for `entity_id`, if any
    /// events have been observed for it yet.
    pub fn trend_for(&self, entity_id: Uuid, f: impl FnOnce(&TimeSeries)) {
        if let Some(series) = self.trends.lock().get(&entity_id) {
            f(series);
        }
    }

    /// Current reinforcement-learning statistics for `agent`, if it has a
    /// table yet.
    #[must_use]
    pub fn q_stats(&self, agent: &AgentName) -> Option<reinforcement::QLearnerStats> {
        self.q_learners.lock().get(agent).map(QLearner::statistics)
    }
}

impl Default for LearningCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningEventSink for LearningCoordinator {
    fn on_usage_event(&self, event: &UsageEvent) {
        let value = match event.succeeded {
            Some(true) => 1.0,
            Some(false) => 0.0,
            None => return,
        };

        {
            let mut trends = self.trends.lock();
            let series = trends.entry(event.entity_id).or_insert_with(|| TimeSeries::new(DEFAULT_TREND_HISTORY));
            series.push(TimeSeriesPoint {
                    pattern_id: event.entity_id,
                    timestamp: chrono::Utc::now(),
                    value,
            });
        }

        let reward = reinforcement::shape_reward(
            &RewardSignal {
                success: event.succeeded.unwrap_or(false),
                time_saved_ms: 0.0,
                quality_score: value,
                is_novel: false,
                risk_level: 0.0,
            },
            &self.reward_config,
        );
        let state = StateKey(reinforcement::hash_key(&[event.agent.as_str(), entity_kind_label(event)]));
        let action = ActionKey(reinforcement::hash_key(&["apply", &event.entity_id.to_string()]));
        let mut learners = self.q_learners.lock();
        let learner = learners
        .entry(event.agent.clone())
        .or_insert_with(|| QLearner::new(self.reinforcement_config));
        learner.update(&state, &action, reward, None, &[]);

        tracing::debug!(
            agent = %event.agent,
            entity_id = %event.entity_id,
            reward,
            "learning coordinator processed usage event"
        );
    }
}

fn entity_kind_label(event: &UsageEvent) -> &'static str {
    match event.entity_kind {
        crate::memory::EntityKind::Pattern => "pattern",
        crate::memory::EntityKind::Solution => "solution",
        crate::memory::EntityKind::Decision => "decision",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::EntityKind;

    #[test]
    fn on_usage_event_records_trend_history() {
        let coordinator = LearningCoordinator::new();
        let entity_id = Uuid::new_v4();
        for succeeded in [true, true, false, true] {
            coordinator.on_usage_event(&UsageEvent {
                    agent: "agent-a".into(),
                    entity_kind: EntityKind::Pattern,
                    entity_id,
                    succeeded: Some(succeeded),
            });
        }
        let mut observed = 0;
        coordinator.trend_for(entity_id, |series| observed = series.len());
        assert_eq!(observed, 4);
    }

    #[test]
    fn on_usage_event_updates_q_table_for_agent() {
        let coordinator = LearningCoordinator::new();
        let agent: AgentName = "agent-a".into();
        for _ in 0..5 {
            coordinator.on_usage_event(&UsageEvent {
                    agent: agent.clone(),
                    entity_kind: EntityKind::Pattern,
                    entity_id: Uuid::new_v4(),
                    succeeded: Some(true),
            });
        }
        let stats = coordinator.q_stats(&agent).expect("q-learner exists");
        assert!(stats.entry_count > 0);
    }

    #[test]
    fn on_usage_event_ignores_events_without_an_outcome() {
        let coordinator = LearningCoordinator::new();
        let entity_id = Uuid::new_v4();
        coordinator.on_usage_event(&UsageEvent {
                agent: "agent-a".into(),
                entity_kind: EntityKind::Decision,
                entity_id,
                succeeded: None,
        });
        let mut observed = None;
        coordinator.trend_for(entity_id, |series| observed = Some(series.len()));
        assert_eq!(observed, None);
    }
}
