//! Reinforcement Learning: a tabular Q-learning agent over
//! content-hashed state/action keys, with epsilon-greedy exploration,
//! reward shaping, experience replay and table pruning.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

/// Opaque, content-derived key for a (state) or (state, action) pair. Built
/// from a SHA-256 digest of the caller's serialized context so callers never
/// need to design a key scheme themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey(pub String);

/// See [`StateKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey(pub String);

/// Hashes arbitrary context fields into a [`StateKey`]/[`ActionKey`].
#[must_use]
pub fn hash_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// One entry of the Q-table ( `QTableEntry`, reused here keyed by
/// `(state, action)`).
#[derive(Debug, Clone, Copy, Default)]
pub struct QValue {
    /// Current estimated value.
    pub value: f64,
    /// Number of updates applied (visit count).
    pub visits: u64,
}

/// One transition recorded for experience replay.
#[derive(Debug, Clone)]
pub struct Experience {
    /// State before the action.
    pub state: StateKey,
    /// Action taken.
    pub action: ActionKey,
    /// Shaped reward received.
    pub reward: f64,
    /// State after the action, if the episode did not terminate.
    pub next_state: Option<StateKey>,
    /// Actions available from `next_state`, for the max-Q bootstrap.
    pub next_actions: Vec<ActionKey>,
}

/// Tunables for the Q-learning update and maintenance.
#[derive(Debug, Clone, Copy)]
pub struct ReinforcementConfig {
    /// Learning rate `alpha`.
    pub learning_rate: f64,
    /// Discount factor `gamma`.
    pub discount_factor: f64,
    /// Initial exploration rate `epsilon`.
    pub initial_epsilon: f64,
    /// Minimum exploration rate epsilon decays to.
    pub min_epsilon: f64,
    /// Multiplicative decay applied to epsilon after each episode.
    pub epsilon_decay: f64,
    /// Maximum number of transitions retained for replay.
    pub replay_capacity: usize,
    /// Number of transitions drawn per `replay` call.
    pub replay_batch_size: usize,
    /// Hard cap on the number of (state, action) entries kept in the table.
    pub max_table_size: usize,
    /// Entries below this absolute value are pruning candidates.
    pub prune_value_threshold: f64,
    /// Entries with fewer visits than this are pruning candidates.
    pub prune_visit_threshold: u64,
    /// Run [`QLearner::prune`] every this many updates, independent of the
    /// hard `max_table_size` cap.
    pub prune_interval: u64,
    /// Value returned for an unseen (state, action) pair.
    pub initial_q_value: f64,
    /// Bonus added to a candidate's value during exploitation when it has
    /// never been visited, so `select_action` doesn't ignore novel actions
    /// once it stops exploring at random.
    pub novelty_bonus: f64,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            initial_epsilon: 0.2,
            min_epsilon: 0.01,
            epsilon_decay: 0.995,
            replay_capacity: 10_000,
            replay_batch_size: 32,
            max_table_size: 50_000,
            prune_value_threshold: 0.05,
            prune_visit_threshold: 2,
            prune_interval: 1_000,
            initial_q_value: 0.5,
            novelty_bonus: 0.2,
        }
    }
}

/// Components combined into a shaped reward.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardSignal {
    /// Whether the action succeeded outright.
    pub success: bool,
    /// Time saved relative to a baseline, in milliseconds (can be negative).
    pub time_saved_ms: f64,
    /// A caller-supplied quality score for the outcome, in `[0,1]`.
    pub quality_score: f64,
    /// Whether the action represents a novel (previously unseen) approach.
    pub is_novel: bool,
    /// Risk level of the action, in `[0,1]`; scaled by `risk_penalty`.
    pub risk_level: f64,
}

/// Tunables for [`shape_reward`]'s per-term multipliers.
#[derive(Debug, Clone, Copy)]
pub struct RewardConfig {
    /// Base reward for a successful outcome.
    pub success_reward: f64,
    /// Base reward for a failed outcome (typically negative).
    pub failure_reward: f64,
    /// Multiplier on `tanh(timeSavedMs / 1000)`.
    pub efficiency_multiplier: f64,
    /// Multiplier on the caller-supplied quality score.
    pub quality_multiplier: f64,
    /// Flat bonus applied when `is_novel` is set.
    pub novelty_reward: f64,
    /// Multiplier on `risk_level` (typically negative, a penalty).
    pub risk_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            success_reward: 1.0,
            failure_reward: -1.0,
            efficiency_multiplier: 0.3,
            quality_multiplier: 0.2,
            novelty_reward: 0.1,
            risk_penalty: -0.2,
        }
    }
}

/// Combines a [`RewardSignal`] into a scalar reward in `[-1, 1]` (
/// `shapeReward`):
///
/// `r = (success ? successReward: failureReward)
/// + efficiencyMultiplier * tanh(timeSavedMs / 1000)
/// + qualityMultiplier * qualityScore
/// + (isNovel ? noveltyReward: 0)
/// + riskPenalty * riskLevel`
#[must_use]
pub fn shape_reward(signal: &RewardSignal, config: &RewardConfig) -> f64 {
    let mut reward = if signal.success { config.success_reward } else { config.failure_reward };
    reward += config.efficiency_multiplier * (signal.time_saved_ms / 1000.0).tanh();
    reward += config.quality_multiplier * signal.quality_score.clamp(0.0, 1.0);
    if signal.is_novel {
        reward += config.novelty_reward;
    }
    reward += config.risk_penalty * signal.risk_level.clamp(0.0, 1.0);
    reward.clamp(-1.0, 1.0)
}

/// A tabular Q-learning agent.
pub struct QLearner {
    table: HashMap<(StateKey, ActionKey), QValue>,
    replay: VecDeque<Experience>,
    epsilon: f64,
    config: ReinforcementConfig,
    update_count: u64,
}

impl QLearner {
    /// Builds a fresh learner with an empty table.
    #[must_use]
    pub fn new(config: ReinforcementConfig) -> Self {
        let epsilon = config.initial_epsilon;
        Self {
            table: HashMap::new(),
            replay: VecDeque::with_capacity(config.replay_capacity.min(1024)),
            epsilon,
            config,
            update_count: 0,
        }
    }

    /// Current exploration rate.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Current number of (state, action) entries.
    #[must_use]
    pub fn table_size(&self) -> usize {
        self.table.len()
    }

    fn value_of(&self, state: &StateKey, action: &ActionKey) -> f64 {
        self.table
        .get(&(state.clone(), action.clone()))
        .map_or(self.config.initial_q_value, |q| q.value)
    }

    /// Whether `(state, action)` has never been updated.
    fn is_novel(&self, state: &StateKey, action: &ActionKey) -> bool {
        !self.table.contains_key(&(state.clone(), action.clone()))
    }

    /// The value `select_action` ranks a candidate by: its Q-value plus a
    /// flat `novelty_bonus` if the pair has never been visited, so untried
    /// actions aren't starved once the learner stops exploring at random.
    fn scored_value_of(&self, state: &StateKey, action: &ActionKey) -> f64 {
        let bonus = if self.is_novel(state, action) { self.config.novelty_bonus } else { 0.0 };
        self.value_of(state, action) + bonus
    }

    /// Epsilon-greedy action selection: with probability `epsilon` returns a
    /// uniformly random candidate (using `random_unit` supplied by the
    /// caller so the learner has no hidden RNG state), otherwise the
    /// candidate with the highest current Q-value plus novelty bonus, ties
    /// broken by first occurrence.
    #[must_use]
    pub fn select_action(&self, state: &StateKey, candidates: &[ActionKey], random_unit: f64) -> Option<ActionKey> {
        if candidates.is_empty() {
            return None;
        }
        if random_unit < self.epsilon {
            let index = ((random_unit / self.epsilon.max(f64::EPSILON)) * candidates.len() as f64) as usize;
            return Some(candidates[index.min(candidates.len() - 1)].clone());
        }
        candidates
        .iter()
        .max_by(|a, b| {
                self.scored_value_of(state, a)
                .partial_cmp(&self.scored_value_of(state, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
    }

    /// Standard Q-learning update:
    /// `Q(s,a) += alpha * (reward + gamma * max_a' Q(s',a') - Q(s,a))`.
    /// `next_actions` is empty for a terminal
    /// transition, in which case the bootstrap term is zero.
    pub fn update(&mut self, state: &StateKey, action: &ActionKey, reward: f64, next_state: Option<&StateKey>, next_actions: &[ActionKey]) {
        let max_next = next_state.map_or(0.0, |ns| {
                next_actions
                .iter()
                .map(|a| self.value_of(ns, a))
                .fold(f64::NEG_INFINITY, f64::max)
                .max(0.0)
        });
        let initial_value = self.config.initial_q_value;
        let entry = self
        .table
        .entry((state.clone(), action.clone()))
        .or_insert(QValue { value: initial_value, visits: 0 });
        let td_target = reward + self.config.discount_factor * max_next;
        entry.value += self.config.learning_rate * (td_target - entry.value);
        entry.visits += 1;

        self.replay.push_back(Experience {
                state: state.clone(),
                action: action.clone(),
                reward,
                next_state: next_state.cloned(),
                next_actions: next_actions.to_vec(),
        });
        while self.replay.len() > self.config.replay_capacity {
            self.replay.pop_front();
        }

        self.update_count += 1;
        let due_for_periodic_prune =
        self.config.prune_interval > 0 && self.update_count % self.config.prune_interval == 0;
        if self.table.len() > self.config.max_table_size || due_for_periodic_prune {
            self.prune();
        }
    }

    /// Decays epsilon by `epsilon_decay`, floored at `min_epsilon`; call
    /// once per completed episode.
    pub fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);
    }

    /// Replays up to `replay_batch_size` stored transitions through
    /// [`Self::update`] again, the simplest form of experience replay
    ///: revisits past transitions without needing a live
    /// environment.
    pub fn replay_batch(&mut self, indices: &[usize]) {
        let batch: Vec<Experience> = indices
        .iter()
        .filter_map(|&i| self.replay.get(i).cloned())
        .take(self.config.replay_batch_size)
        .collect();
        for exp in batch {
            self.update(&exp.state, &exp.action, exp.reward, exp.next_state.as_ref(), &exp.next_actions);
        }
    }

    /// Removes entries with both low magnitude and low visit count,
    /// oldest-inserted-order ties aside, until the table is back under
    /// `max_table_size` or no more pruning candidates remain (
    /// `pruneQTable`).
    pub fn prune(&mut self) {
        let threshold_value = self.config.prune_value_threshold;
        let threshold_visits = self.config.prune_visit_threshold;
        let mut candidates: Vec<(StateKey, ActionKey)> = self
        .table
        .iter()
        .filter(|(_, q)| q.value.abs() < threshold_value && q.visits < threshold_visits)
        .map(|(k, _)| k.clone())
        .collect();

        if candidates.is_empty() {
            let mut by_magnitude: Vec<((StateKey, ActionKey), f64)> = self
            .table
            .iter()
            .map(|(k, q)| (k.clone(), q.value.abs() * (q.visits as f64 + 1.0)))
            .collect();
            by_magnitude.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            candidates = by_magnitude.into_iter().map(|(k, _)| k).collect();
        }

        let overflow = self.table.len().saturating_sub(self.config.max_table_size);
        for key in candidates.into_iter().take(overflow.max(0).max(1)) {
            if self.table.len() <= self.config.max_table_size {
                break;
            }
            self.table.remove(&key);
        }
    }

    /// Summary statistics over the whole table, for [`crate::metrics`].
    #[must_use]
    pub fn statistics(&self) -> QLearnerStats {
        let total = self.table.len();
        let mean_value = if total == 0 {
            0.0
        } else {
            self.table.values().map(|q| q.value).sum::<f64>() / total as f64
        };
        QLearnerStats {
            entry_count: total,
            mean_value,
            epsilon: self.epsilon,
            replay_size: self.replay.len(),
        }
    }
}

/// Reporting snapshot of a [`QLearner`]'s internal state.
#[derive(Debug, Clone, Copy)]
pub struct QLearnerStats {
    /// Number of (state, action) entries.
    pub entry_count: usize,
    /// Mean Q-value across all entries.
    pub mean_value: f64,
    /// Current exploration rate.
    pub epsilon: f64,
    /// Number of transitions retained for replay.
    pub replay_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> StateKey {
        StateKey(s.to_string())
    }
    fn action(s: &str) -> ActionKey {
        ActionKey(s.to_string())
    }

    #[test]
    fn shape_reward_penalizes_high_risk_regardless_of_success() {
        let signal = RewardSignal {
            success: true,
            time_saved_ms: 500.0,
            quality_score: 1.0,
            is_novel: true,
            risk_level: 1.0,
        };
        let config = RewardConfig::default();
        assert!(shape_reward(&signal, &config) < shape_reward(&RewardSignal { risk_level: 0.0,..signal }, &config));
    }

    #[test]
    fn shape_reward_rewards_success_and_time_saved() {
        let signal = RewardSignal {
            success: true,
            time_saved_ms: 500.0,
            quality_score: 0.5,
            is_novel: false,
            risk_level: 0.0,
        };
        let reward = shape_reward(&signal, &RewardConfig::default());
        assert!((-1.0..=1.0).contains(&reward));
        assert!(reward > 0.0);
    }

    #[test]
    fn shape_reward_is_always_clamped() {
        let config = RewardConfig::default();
        for success in [true, false] {
            for time_saved_ms in [-10_000.0, 0.0, 10_000.0] {
                for risk_level in [0.0, 0.5, 1.0] {
                    let signal = RewardSignal { success, time_saved_ms, quality_score: 1.0, is_novel: true, risk_level };
                    let reward = shape_reward(&signal, &config);
                    assert!((-1.0..=1.0).contains(&reward));
                }
            }
        }
    }

    #[test]
    fn update_increases_value_toward_positive_reward() {
        let mut learner = QLearner::new(ReinforcementConfig::default());
        let s = key("s1");
        let a = action("a1");
        for _ in 0..20 {
            learner.update(&s, &a, 1.0, None, &[]);
        }
        assert!(learner.value_of(&s, &a) > 0.5);
    }

    #[test]
    fn select_action_prefers_higher_value_when_exploiting() {
        let mut learner = QLearner::new(ReinforcementConfig::default());
        let s = key("s1");
        let good = action("good");
        let bad = action("bad");
        for _ in 0..10 {
            learner.update(&s, &good, 1.0, None, &[]);
            learner.update(&s, &bad, -1.0, None, &[]);
        }
        let chosen = learner.select_action(&s, &[good.clone(), bad.clone()], 0.99).expect("some action");
        assert_eq!(chosen, good);
    }

    #[test]
    fn decay_epsilon_respects_floor() {
        let mut learner = QLearner::new(ReinforcementConfig {
                min_epsilon: 0.05,
                epsilon_decay: 0.1,
                ..ReinforcementConfig::default()
        });
        for _ in 0..50 {
            learner.decay_epsilon();
        }
        assert!((learner.epsilon() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn prune_keeps_table_under_cap() {
        let mut learner = QLearner::new(ReinforcementConfig {
                max_table_size: 5,
                ..ReinforcementConfig::default()
        });
        for i in 0..20 {
            learner.update(&key(&format!("s{i}")), &action("a"), 0.01, None, &[]);
        }
        assert!(learner.table_size() <= 5);
    }

    #[test]
    fn hash_key_is_deterministic() {
        assert_eq!(hash_key(&["a", "b"]), hash_key(&["a", "b"]));
        assert_ne!(hash_key(&["a", "b"]), hash_key(&["a", "c"]));
    }
}
