//! Success Weighting: a multi-factor recommendation weight for a
//! pattern in a given context, plus dynamic threshold adaptation.

use super::stats::{wilson_interval, WilsonInterval, DEFAULT_Z};
use crate::types::value::key_overlap_ratio;
use crate::types::ValueMap;
use std::collections::VecDeque;

/// Tunables for recency decay and the complexity penalty.
#[derive(Debug, Clone, Copy)]
pub struct WeightingConfig {
    /// Recency half-life, in days.
    pub half_life_days: f64,
    /// Floor recency never decays below.
    pub recency_floor: f64,
    /// Age beyond which recency is clamped to the floor.
    pub max_age_days: f64,
    /// Scales how strongly step count penalizes the complexity factor.
    pub complexity_penalty_factor: f64,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            half_life_days: 30.0,
            recency_floor: 0.1,
            max_age_days: 180.0,
            complexity_penalty_factor: 1.0,
        }
    }
}

/// Exponential recency decay: `max(floor, exp(-ageDays * ln2 / halfLife))`,
/// capped at `maxAgeDays`. Monotone non-increasing in `age_days`.
#[must_use]
pub fn recency(age_days: f64, config: &WeightingConfig) -> f64 {
    let age_days = age_days.min(config.max_age_days).max(0.0);
    let decayed = (-age_days * std::f64::consts::LN_2 / config.half_life_days).exp();
    decayed.max(config.recency_floor)
}

/// `max(0.1, 1 - log(steps+1)/log(2) * penaltyFactor)`.
#[must_use]
pub fn complexity(steps: u32, config: &WeightingConfig) -> f64 {
    let penalty = ((steps as f64) + 1.0).ln() / std::f64::consts::LN_2 * config.complexity_penalty_factor;
    (1.0 - penalty).max(0.1)
}

/// Overlap of required tech/domain tags with project metadata, in `[0,1]`.
#[must_use]
pub fn project_fit(required_tags: &ValueMap, project_metadata: &ValueMap) -> f64 {
    key_overlap_ratio(required_tags, project_metadata)
}

/// Bucketized recommendation strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationStrength {
    /// `weight >= 0.85`.
    VeryStrong,
    /// `0.7 <= weight < 0.85`.
    Strong,
    /// `0.5 <= weight < 0.7`.
    Moderate,
    /// `0.3 <= weight < 0.5`.
    Weak,
    /// `weight < 0.3`.
    Avoid,
}

impl RecommendationStrength {
    #[must_use]
    fn from_weight(weight: f64) -> Self {
        if weight >= 0.85 {
            Self::VeryStrong
        } else if weight >= 0.7 {
            Self::Strong
        } else if weight >= 0.5 {
            Self::Moderate
        } else if weight >= 0.3 {
            Self::Weak
        } else {
            Self::Avoid
        }
    }
}

/// The individual factors that make up a [`Weight`], for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct WeightFactors {
    /// `metrics.successRate` of the pattern.
    pub base_success_rate: f64,
    /// Recency decay, see [`recency`].
    pub recency: f64,
    /// Complexity penalty, see [`complexity`].
    pub complexity: f64,
    /// Project-fit overlap, see [`project_fit`].
    pub project_fit: f64,
}

/// Output of [`compute_weight`].
#[derive(Debug, Clone, Copy)]
pub struct Weight {
    /// `0.4*base + 0.3*recency + 0.1*complexity + 0.2*projectFit`.
    pub total_weight: f64,
    /// The individual factors.
    pub factors: WeightFactors,
    /// Wilson interval over observed successes/failures.
    pub confidence_interval: WilsonInterval,
    /// Bucketed strength of the recommendation.
    pub recommendation_strength: RecommendationStrength,
}

/// Computes a recommendation weight for a pattern in a given context.
/// `0 <= total_weight <= 1` for all inputs.
#[must_use]
pub fn compute_weight(
    base_success_rate: f64,
    age_days: f64,
    steps: u32,
    required_tags: &ValueMap,
    project_metadata: &ValueMap,
    successes: u64,
    failures: u64,
    config: &WeightingConfig,
) -> Weight {
    let factors = WeightFactors {
        base_success_rate: base_success_rate.clamp(0.0, 1.0),
        recency: recency(age_days, config),
        complexity: complexity(steps, config),
        project_fit: project_fit(required_tags, project_metadata),
    };
    let total_weight = (0.4 * factors.base_success_rate
        + 0.3 * factors.recency
        + 0.1 * factors.complexity
        + 0.2 * factors.project_fit)
    .clamp(0.0, 1.0);
    Weight {
        total_weight,
        factors,
        confidence_interval: wilson_interval(successes, failures, DEFAULT_Z),
        recommendation_strength: RecommendationStrength::from_weight(total_weight),
    }
}

/// Moves an accept/reject threshold toward the moving mean of the last `N`
/// evaluated weights, at `adjustment_rate` per step, clamped to
/// `[min_weight, max_weight]`.
pub struct ThresholdAdjuster {
    history: VecDeque<f64>,
    window: usize,
    adjustment_rate: f64,
    min_weight: f64,
    max_weight: f64,
    threshold: f64,
}

impl ThresholdAdjuster {
    /// Builds an adjuster seeded at `initial_threshold`, tracking a moving
    /// mean over the last `window` evaluations.
    #[must_use]
    pub fn new(initial_threshold: f64, window: usize, adjustment_rate: f64, min_weight: f64, max_weight: f64) -> Self {
        Self {
            history: VecDeque::with_capacity(window),
            window: window.max(1),
            adjustment_rate,
            min_weight,
            max_weight,
            threshold: initial_threshold.clamp(min_weight, max_weight),
        }
    }

    /// Records a new observed weight and moves the threshold toward the
    /// resulting moving mean.
    pub fn observe(&mut self, weight: f64) -> f64 {
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(weight);
        let mean: f64 = self.history.iter().sum::<f64>() / self.history.len() as f64;
        self.threshold += (mean - self.threshold) * self.adjustment_rate;
        self.threshold = self.threshold.clamp(self.min_weight, self.max_weight);
        self.threshold
    }

    /// Current threshold value.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_is_monotone_non_increasing_in_age() {
        let config = WeightingConfig::default();
        let mut previous = recency(0.0, &config);
        for age in [1.0, 10.0, 30.0, 60.0, 180.0, 400.0] {
            let current = recency(age, &config);
            assert!(current <= previous + 1e-9);
            previous = current;
        }
        assert!(recency(10_000.0, &config) >= config.recency_floor);
    }

    #[test]
    fn weight_is_bounded_for_extreme_inputs() {
        let config = WeightingConfig::default();
        for base in [0.0, 0.5, 1.0] {
            for age in [0.0, 365.0] {
                let w = compute_weight(base, age, 50, &ValueMap::new(), &ValueMap::new(), 10, 10, &config);
                assert!((0.0..=1.0).contains(&w.total_weight));
            }
        }
    }

    #[test]
    fn recommendation_strength_buckets_are_ordered() {
        assert_eq!(RecommendationStrength::from_weight(0.9), RecommendationStrength::VeryStrong);
        assert_eq!(RecommendationStrength::from_weight(0.75), RecommendationStrength::Strong);
        assert_eq!(RecommendationStrength::from_weight(0.55), RecommendationStrength::Moderate);
        assert_eq!(RecommendationStrength::from_weight(0.35), RecommendationStrength::Weak);
        assert_eq!(RecommendationStrength::from_weight(0.1), RecommendationStrength::Avoid);
    }

    #[test]
    fn threshold_adjuster_moves_toward_moving_mean() {
        let mut adjuster = ThresholdAdjuster::new(0.5, 5, 0.5, 0.1, 0.9);
        for _ in 0..10 {
            adjuster.observe(0.9);
        }
        assert!(adjuster.threshold() > 0.7);
        assert!(adjuster.threshold() <= 0.9);
    }

    #[test]
    fn threshold_adjuster_stays_within_clamp() {
        let mut adjuster = ThresholdAdjuster::new(0.5, 3, 1.0, 0.4, 0.6);
        for _ in 0..5 {
            adjuster.observe(0.99);
        }
        assert!(adjuster.threshold() <= 0.6);
    }
}
