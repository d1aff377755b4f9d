//! Pattern Recognition throughput: sequence extraction and
//! ensemble similarity scoring over a synthetic agent action history.

use aml_core::learning::pattern_recognition::{
    extract_sequences, similarity_score, AgentAction, PatternRecognitionConfig,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic_actions(count: usize) -> Vec<AgentAction> {
    let action_types = ["Edit", "RunTest", "ReadFile", "Commit", "Review"];
    let mut now = chrono::Utc::now();
    (0..count)
    .map(|i| {
            now += chrono::Duration::seconds(30);
            AgentAction {
                action_type: action_types[i % action_types.len()].to_string(),
                target: Some(format!("src/module_{}.rs", i % 7)),
                timestamp: now,
                outcome: Some(i % 4 != 0),
            }
    })
    .collect()
}

fn bench_extract_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_sequences");
    let config = PatternRecognitionConfig::default();
    for &count in &[64usize, 512, 4096] {
        let actions = synthetic_actions(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &actions, |b, actions| {
                b.iter(|| black_box(extract_sequences(actions, &config)));
        });
    }
    group.finish();
}

fn bench_similarity_score(c: &mut Criterion) {
    let config = PatternRecognitionConfig::default();
    let actions = synthetic_actions(128);
    let sequences = extract_sequences(&actions, &config);
    assert!(sequences.len() >= 2, "need at least two sequences to compare");

    c.bench_function("similarity_score_pairwise", |b| {
            b.iter(|| {
                    let mut total = 0.0;
                    for i in 0..sequences.len().min(32) {
                        for j in (i + 1)..sequences.len().min(32) {
                            total += similarity_score(&sequences[i], &sequences[j]);
                        }
                    }
                    black_box(total)
            });
    });
}

criterion_group!(benches, bench_extract_sequences, bench_similarity_score);
criterion_main!(benches);
