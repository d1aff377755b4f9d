//! Pattern Recognition: sequence extraction from an agent's action
//! history, common-subsequence grouping, an ensemble similarity score, and
//! a significance test gating which candidates become accepted patterns.

use super::stats::{chi_square_2x2, wilson_interval, DEFAULT_Z};
use crate::error::{Error, Result};
use crate::types::ValueMap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One observed action taken by an agent, the raw input to sequence
/// extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentAction {
    /// Free-form action type, e.g. `"Edit"`, `"RunTest"`.
    pub action_type: String,
    /// The target the action operated on, if any (e.g. a file path).
    pub target: Option<String>,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// Whether the action's outcome was a success, if known.
    pub outcome: Option<bool>,
}

/// Tunables for sequence extraction and significance gating.
#[derive(Debug, Clone, Copy)]
pub struct PatternRecognitionConfig {
    /// Shortest window length to slide over the action history.
    pub min_sequence_length: usize,
    /// Longest window length to slide over the action history.
    pub max_sequence_length: usize,
    /// Maximum gap between adjacent actions' timestamps to still group them
    /// into the same sequence.
    pub temporal_window: chrono::Duration,
    /// Minimum group frequency to keep a common subsequence.
    pub min_frequency: usize,
    /// Minimum ensemble similarity score to call two sequences a match.
    pub min_similarity: f64,
    /// p-value threshold for the χ² significance test.
    pub significance_threshold: f64,
    /// Minimum observed success rate for a pattern to be accepted.
    pub success_rate_floor: f64,
}

impl Default for PatternRecognitionConfig {
    fn default() -> Self {
        Self {
            min_sequence_length: 2,
            max_sequence_length: 5,
            temporal_window: chrono::Duration::minutes(10),
            min_frequency: 3,
            min_similarity: 0.7,
            significance_threshold: 0.05,
            success_rate_floor: 0.5,
        }
    }
}

/// One action within a normalized sequence: lowercased type, target
/// replaced by its coarse type class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedAction {
    /// Lowercased action type.
    pub action_type: String,
    /// Coarse class of the target (e.g. `"file"`, `"test"`), not the raw
    /// target string, so sequences over different concrete files still
    /// compare equal.
    pub target_class: Option<String>,
    /// The action's outcome, carried through for semantic similarity.
    pub outcome: Option<bool>,
}

/// A normalized window of actions extracted from one agent's history.
pub type NormalizedSequence = Vec<NormalizedAction>;

fn target_class(target: &str) -> String {
    match target.rsplit('.').next() {
        Some(ext) if ext != target => format!("file:{ext}"),
        _ => "target".to_string(),
    }
}

fn normalize(action: &AgentAction) -> NormalizedAction {
    NormalizedAction {
        action_type: action.action_type.to_lowercase(),
        target_class: action.target.as_deref().map(target_class),
        outcome: action.outcome,
    }
}

/// Slides a window of length `L ∈ [min, max]` over `actions`, grouping only
/// actions whose adjacent timestamps differ by at most `temporal_window`,
/// and emits each resulting window normalized.
#[must_use]
pub fn extract_sequences(actions: &[AgentAction], config: &PatternRecognitionConfig) -> Vec<NormalizedSequence> {
    let mut sequences = Vec::new();
    if actions.is_empty() {
        return sequences;
    }

    // Break the action list into temporally-contiguous runs first, then
    // slide the window only within each run.
    let mut runs: Vec<Vec<&AgentAction>> = Vec::new();
    let mut current: Vec<&AgentAction> = vec![&actions[0]];
    for pair in actions.windows(2) {
        let gap = pair[1].timestamp - pair[0].timestamp;
        if gap <= config.temporal_window {
            current.push(&pair[1]);
        } else {
            runs.push(std::mem::take(&mut current));
            current.push(&pair[1]);
        }
    }
    runs.push(current);

    for run in &runs {
        for window_len in config.min_sequence_length..=config.max_sequence_length.min(run.len()) {
            if window_len == 0 || window_len > run.len() {
                continue;
            }
            for window in run.windows(window_len) {
                sequences.push(window.iter().map(|a| normalize(a)).collect());
            }
        }
    }
    sequences
}

/// Groups `sequences` by normalized form and keeps groups whose frequency
/// is at least `min_frequency`.
#[must_use]
pub fn common_subsequences(
    sequences: &[NormalizedSequence],
    min_frequency: usize,
) -> Vec<(NormalizedSequence, usize)> {
    let mut counts: HashMap<&NormalizedSequence, usize> = HashMap::new();
    for seq in sequences {
        *counts.entry(seq).or_insert(0) += 1;
    }
    let mut groups: Vec<(NormalizedSequence, usize)> = counts
    .into_iter()
    .filter(|(_, count)| *count >= min_frequency)
    .map(|(seq, count)| (seq.clone(), count))
    .collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups
}

fn type_counts(seq: &NormalizedSequence) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for action in seq {
        *counts.entry(action.action_type.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity over a sparse feature vector of action-type counts.
#[must_use]
pub fn cosine_similarity(a: &NormalizedSequence, b: &NormalizedSequence) -> f64 {
    let ca = type_counts(a);
    let cb = type_counts(b);
    if ca.is_empty() || cb.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    for (k, va) in &ca {
        if let Some(vb) = cb.get(k) {
            dot += (*va as f64) * (*vb as f64);
        }
    }
    let norm_a: f64 = ca.values().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = cb.values().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Normalized Levenshtein similarity (`1 - editDistance / max(len)`) over
/// the sequences' action-type strings, via `strsim`.
#[must_use]
pub fn levenshtein_similarity(a: &NormalizedSequence, b: &NormalizedSequence) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let joined_a: String = a.iter().map(|x| x.action_type.as_str()).collect::<Vec<_>>().join(",");
    let joined_b: String = b.iter().map(|x| x.action_type.as_str()).collect::<Vec<_>>().join(",");
    let max_len = joined_a.chars().count().max(joined_b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(&joined_a, &joined_b);
    1.0 - (distance as f64 / max_len as f64)
}

/// Fraction of aligned `(type, outcome)` pairs that match, position by
/// position, over the shorter sequence's length.
#[must_use]
pub fn semantic_similarity(a: &NormalizedSequence, b: &NormalizedSequence) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let matches = a
    .iter()
    .zip(b.iter())
    .take(len)
    .filter(|(x, y)| x.action_type == y.action_type && x.outcome == y.outcome)
    .count();
    matches as f64 / len as f64
}

/// Weighted ensemble: cosine 40%, normalized Levenshtein 30%, semantic
/// alignment 30%.
#[must_use]
pub fn similarity_score(a: &NormalizedSequence, b: &NormalizedSequence) -> f64 {
    0.4 * cosine_similarity(a, b) + 0.3 * levenshtein_similarity(a, b) + 0.3 * semantic_similarity(a, b)
}

/// Whether `a` and `b` are considered a match under the ensemble score and
/// `min_similarity` threshold.
#[must_use]
pub fn is_similar(a: &NormalizedSequence, b: &NormalizedSequence, min_similarity: f64) -> bool {
    similarity_score(a, b) >= min_similarity
}

/// Inputs to [`score_candidate`]: how often the candidate was observed, the
/// highest observed frequency among competing candidates, and the contexts
/// to compare for contextual fit.
#[derive(Debug, Clone, Copy)]
pub struct CandidateObservation {
    /// Number of times this candidate sequence was observed.
    pub frequency: usize,
    /// Highest frequency among all candidates being scored together.
    pub max_frequency: usize,
}

/// Scores a candidate pattern against prior accepted patterns and a
/// context: weighted sum of a frequency factor, a novelty factor,
/// and a contextual-fit factor, each in `[0, 1]`, averaged evenly since the
/// spec does not name explicit sub-weights here.
#[must_use]
pub fn score_candidate(
    observation: CandidateObservation,
    max_similarity_to_accepted: f64,
    candidate_context: &ValueMap,
    reference_context: &ValueMap,
) -> f64 {
    let frequency_factor = if observation.max_frequency == 0 {
        0.0
    } else {
        (1.0 + observation.frequency as f64).ln() / (1.0 + observation.max_frequency as f64).ln()
    };
    let novelty = (1.0 - max_similarity_to_accepted).clamp(0.0, 1.0);
    let contextual_fit = crate::types::value::key_overlap_ratio(candidate_context, reference_context);
    ((frequency_factor + novelty + contextual_fit) / 3.0).clamp(0.0, 1.0)
}

/// Outcome of [`validate_significance`]: the observed counts, the χ²
/// statistic, its p-value, and whether the candidate clears every bar.
#[derive(Debug, Clone, Copy)]
pub struct SignificanceResult {
    /// χ² statistic for the 2×2 table.
    pub chi_square: f64,
    /// Two-tailed p-value derived from the χ² statistic (df = 1).
    pub p_value: f64,
    /// Observed success rate among the candidate's executions.
    pub observed_success_rate: f64,
}

/// Validates a candidate pattern via Pearson's χ² on a 2×2
/// success/failure-vs-global-base table. Accepts iff
/// `p < significance_threshold` **and** `frequency >= min_frequency`
/// **and** the observed success rate clears `success_rate_floor`;
/// otherwise returns `Error::InsufficientEvidence`.
pub fn validate_significance(
    observed_success: u64,
    observed_failure: u64,
    base_success: u64,
    base_failure: u64,
    frequency: usize,
    config: &PatternRecognitionConfig,
) -> Result<SignificanceResult> {
    let total = observed_success + observed_failure;
    let observed_success_rate = if total == 0 {
        0.0
    } else {
        observed_success as f64 / total as f64
    };
    let (chi_square, p_value) = chi_square_2x2(observed_success, observed_failure, base_success, base_failure);
    let result = SignificanceResult {
        chi_square,
        p_value,
        observed_success_rate,
    };

    if p_value < config.significance_threshold
    && frequency >= config.min_frequency
    && observed_success_rate >= config.success_rate_floor
    {
        Ok(result)
    } else {
        Err(Error::InsufficientEvidence(format!(
                    "p={p_value:.4} freq={frequency} rate={observed_success_rate:.2} (need p<{}, freq>={}, rate>={})",
                    config.significance_threshold, config.min_frequency, config.success_rate_floor
        )))
    }
}

/// Wilson-score confidence after folding in one new observation, used as
/// `evolution.confidenceScore`.
#[must_use]
pub fn confidence_after_observation(successes: u64, failures: u64) -> f64 {
    wilson_interval(successes, failures, DEFAULT_Z).center
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: &str, minute: i64, outcome: Option<bool>) -> AgentAction {
        AgentAction {
            action_type: action_type.to_string(),
            target: Some("file.rs".to_string()),
            timestamp: Utc::now() + chrono::Duration::minutes(minute),
            outcome,
        }
    }

    #[test]
    fn extract_sequences_respects_temporal_window() {
        let config = PatternRecognitionConfig {
            min_sequence_length: 2,
            max_sequence_length: 2,
            temporal_window: chrono::Duration::minutes(5),
            ..PatternRecognitionConfig::default()
        };
        let actions = vec![
            action("edit", 0, Some(true)),
            action("test", 2, Some(true)),
            action("commit", 100, Some(true)),
        ];
        let sequences = extract_sequences(&actions, &config);
        // The large gap before "commit" should split it into its own run,
        // which is too short to yield a length-2 window.
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].len(), 2);
    }

    #[test]
    fn common_subsequences_filters_below_min_frequency() {
        let seq_a: NormalizedSequence = vec![NormalizedAction {
                action_type: "edit".into(),
                target_class: None,
                outcome: Some(true),
        }];
        let sequences = vec![seq_a.clone(), seq_a.clone(), seq_a];
        let groups = common_subsequences(&sequences, 2);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1, 3);
        assert!(common_subsequences(&vec![], 1).is_empty());
    }

    #[test]
    fn similarity_score_is_bounded_and_identical_sequences_score_high() {
        let seq: NormalizedSequence = vec![
            NormalizedAction {
                action_type: "edit".into(),
                target_class: Some("file:rs".into()),
                outcome: Some(true),
            },
            NormalizedAction {
                action_type: "test".into(),
                target_class: None,
                outcome: Some(true),
            },
        ];
        let score = similarity_score(&seq, &seq);
        assert!((0.0..=1.0001).contains(&score));
        assert!(score > 0.99);
    }

    #[test]
    fn score_candidate_is_bounded() {
        let mut ctx = ValueMap::new();
        ctx.insert("framework".into(), "react".into());
        let score = score_candidate(
            CandidateObservation {
                frequency: 5,
                max_frequency: 10,
            },
            0.2,
            &ctx,
            &ctx,
        );
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn significance_validation_rejects_weak_evidence() {
        let config = PatternRecognitionConfig::default();
        let result = validate_significance(2, 1, 10, 10, 1, &config);
        assert!(matches!(result, Err(Error::InsufficientEvidence(_))));
    }

    #[test]
    fn significance_validation_accepts_strong_evidence() {
        let config = PatternRecognitionConfig::default();
        let result = validate_significance(95, 5, 20, 80, 10, &config).expect("should validate");
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn confidence_after_observation_is_in_unit_interval() {
        let c = confidence_after_observation(8, 2);
        assert!((0.0..=1.0).contains(&c));
    }
}
