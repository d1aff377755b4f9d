//! A two-state bandit converges toward the higher-reward action under
//! repeated Q-learning updates.

use aml_core::learning::reinforcement::{ActionKey, QLearner, ReinforcementConfig, StateKey};

#[test]
fn q_learning_converges_to_the_higher_reward_action() {
    let state = StateKey("idle".into());
    let good = ActionKey("retry-with-backoff".into());
    let bad = ActionKey("retry-immediately".into());

    let config = ReinforcementConfig {
        learning_rate: 0.3,
        initial_epsilon: 0.0,
        ..ReinforcementConfig::default()
    };
    let mut learner = QLearner::new(config);

    for i in 0..200 {
        let reward = if i % 3 == 0 { -1.0 } else { 1.0 };
        learner.update(&state, &good, reward, None, &[]);
        learner.update(&state, &bad, -reward, None, &[]);
    }

    let chosen = learner
    .select_action(&state, &[good.clone(), bad.clone()], 0.9)
    .expect("candidates are non-empty");
    assert_eq!(chosen, good);
    assert_eq!(learner.table_size(), 2);
}

#[test]
fn epsilon_decays_toward_the_configured_floor() {
    let config = ReinforcementConfig {
        initial_epsilon: 1.0,
        epsilon_decay: 0.9,
        min_epsilon: 0.05,
        ..ReinforcementConfig::default()
    };
    let mut learner = QLearner::new(config);
    for _ in 0..200 {
        learner.decay_epsilon();
    }
    assert!((learner.epsilon() - 0.05).abs() < 1e-9);
}

#[test]
fn replay_batch_reinforces_previously_seen_transitions() {
    let state = StateKey("s".into());
    let action = ActionKey("a".into());
    let mut learner = QLearner::new(ReinforcementConfig::default());

    learner.update(&state, &action, 1.0, None, &[]);
    let before = learner.statistics().mean_value;

    learner.replay_batch(&[0, 0, 0]);
    let after = learner.statistics().mean_value;

    assert!(after >= before);
}
