//! Reinforcement Learning throughput: Q-value update cost and
//! action-selection cost as the table grows, plus periodic replay/pruning.

use aml_core::learning::reinforcement::{ActionKey, QLearner, ReinforcementConfig, StateKey};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn seeded_learner(states: usize, actions: usize) -> QLearner {
    let mut learner = QLearner::new(ReinforcementConfig::default());
    for s in 0..states {
        let state = StateKey(format!("state-{s}"));
        for a in 0..actions {
            let action = ActionKey(format!("action-{a}"));
            learner.update(&state, &action, 0.5, None, &[]);
        }
    }
    learner
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("q_update");
    for &size in &[10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
                let mut learner = seeded_learner(size, 4);
                let state = StateKey("state-0".into());
                let action = ActionKey("action-0".into());
                b.iter(|| learner.update(&state, &action, black_box(0.7), None, &[]));
        });
    }
    group.finish();
}

fn bench_select_action(c: &mut Criterion) {
    let learner = seeded_learner(200, 8);
    let state = StateKey("state-0".into());
    let actions: Vec<ActionKey> = (0..8).map(|a| ActionKey(format!("action-{a}"))).collect();

    c.bench_function("select_action_greedy", |b| {
            b.iter(|| black_box(learner.select_action(&state, &actions, 0.99)));
    });
}

fn bench_replay(c: &mut Criterion) {
    let mut learner = seeded_learner(50, 4);
    c.bench_function("replay_batch_32", |b| {
            let indices: Vec<usize> = (0..32).collect();
            b.iter(|| learner.replay_batch(&indices));
    });
}

criterion_group!(benches, bench_update, bench_select_action, bench_replay);
criterion_main!(benches);
