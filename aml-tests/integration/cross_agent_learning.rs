//! Compatibility scoring, pattern adaptation and weighted conflict
//! resolution across agents.

use aml_core::learning::cross_agent::{CrossAgentConfig, CrossAgentLearner, Tiebreaker, Vote};
use aml_core::types::{AgentProfile, ComplexityLevel};
use aml_test_utils::sample_pattern;

fn profile(name: &str, capabilities: &[&str], domains: &[&str]) -> AgentProfile {
    AgentProfile {
        name: name.into(),
        capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
        domains: domains.iter().map(|s| s.to_string()).collect(),
        focus_areas: vec![],
        complexity: ComplexityLevel::Intermediate,
        learning_rate: 0.1,
    }
}

#[test]
fn agents_with_fully_overlapping_capabilities_are_compatible() {
    let learner = CrossAgentLearner::new(CrossAgentConfig::default());
    learner.register_agent(profile("scout", &["react", "testing"], &["frontend"]));
    learner.register_agent(profile("ranger", &["react", "testing"], &["frontend"]));

    let result = learner.check_compatibility(&"scout".into(), &"ranger".into()).unwrap();
    assert!(result.compatible);
    assert!(result.score > 0.6);
}

#[test]
fn agents_with_disjoint_capabilities_and_domains_are_not_compatible() {
    let learner = CrossAgentLearner::new(CrossAgentConfig::default());
    learner.register_agent(profile("scout", &["react"], &["frontend"]));
    learner.register_agent(profile("archivist", &["sql"], &["data"]));

    let result = learner.check_compatibility(&"scout".into(), &"archivist".into()).unwrap();
    assert!(!result.compatible);
}

#[test]
fn adapting_a_pattern_to_a_compatible_agent_reduces_confidence_by_the_incompatibility_gap() {
    let learner = CrossAgentLearner::new(CrossAgentConfig::default());
    learner.register_agent(profile("scout", &["memo"], &["frontend"]));
    learner.register_agent(profile("ranger", &["memo"], &["frontend"]));

    let pattern = sample_pattern("scout", "react-opt");
    let original_confidence = pattern.evolution.confidence_score;

    let adapted = learner.adapt_pattern(&pattern, &"scout".into(), &"ranger".into()).unwrap();
    assert_eq!(adapted.agent, "ranger".into());
    assert!(adapted.evolution.confidence_score <= original_confidence);
}

#[test]
fn adaptation_is_refused_when_the_destination_has_no_matching_capability_and_architecture_changes_are_disallowed() {
    let config = CrossAgentConfig {
        allow_architectural_changes: false,
        require_domain_overlap: false,
        min_compatibility_score: 0.0,
        ..CrossAgentConfig::default()
    };
    let learner = CrossAgentLearner::new(config);
    learner.register_agent(profile("scout", &["memo"], &["frontend"]));
    learner.register_agent(profile("archivist", &["sql-indexing"], &["data"]));

    let pattern = sample_pattern("scout", "react-opt");
    let result = learner.adapt_pattern(&pattern, &"scout".into(), &"archivist".into());
    assert!(result.is_err());
}

fn vote(option: &str, success_rate: f64, confidence: f64) -> Vote {
    Vote {
        option: option.to_string(),
        success_rate,
        confidence,
        usage_count: 10,
        max_usage_count: 10,
        expertise: 0.5,
    }
}

#[test]
fn the_higher_weighted_option_wins_the_conflict() {
    let learner = CrossAgentLearner::new(CrossAgentConfig::default());
    let votes = vec![
        vote("retry", 0.9, 0.9),
        vote("retry", 0.9, 0.9),
        vote("fail-fast", 0.4, 0.4),
    ];

    let resolution = learner.resolve_conflict(&votes, 3, Tiebreaker::HighestConfidence).unwrap();
    assert_eq!(resolution.winning_option, "retry");
    assert_eq!(resolution.minority_opinion.len(), 1);
}

#[test]
fn resolving_a_conflict_without_quorum_fails() {
    let learner = CrossAgentLearner::new(CrossAgentConfig::default());
    let votes = vec![vote("retry", 0.9, 0.9)];

    let result = learner.resolve_conflict(&votes, 10, Tiebreaker::HighestConfidence);
    assert!(result.is_err());
}
