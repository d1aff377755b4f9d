//! Cross-Agent Learning: compatibility scoring between agent
//! profiles, pattern adaptation across agents, auto-sharing, and weighted
//! conflict resolution.

use crate::error::{Error, Result};
use crate::types::{AgentName, AgentProfile, ComplexityLevel, Pattern, Value, ValueMap};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Outcome of [`CrossAgentLearner::check_compatibility`].
#[derive(Debug, Clone)]
pub struct CompatibilityResult {
    /// Whether the pair clears `min_score` (and, if configured, shares a
    /// domain).
    pub compatible: bool,
    /// The weighted compatibility score in `[0, 1]`.
    pub score: f64,
    /// Capabilities present in both profiles.
    pub overlapping_capabilities: Vec<String>,
    /// Domains present in both profiles.
    pub overlapping_domains: Vec<String>,
}

fn jaccard(a: &[String], b: &[String]) -> (f64, Vec<String>) {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    if set_a.is_empty() && set_b.is_empty() {
        return (0.0, Vec::new());
    }
    let intersection: Vec<String> = set_a.intersection(&set_b).map(|s| (*s).to_string()).collect();
    let union_len = set_a.union(&set_b).count();
    let score = if union_len == 0 {
        0.0
    } else {
        intersection.len() as f64 / union_len as f64
    };
    (score, intersection)
}

fn focus_overlap(a: &[String], b: &[String]) -> f64 {
    jaccard(a, b).0
}

/// Configuration for compatibility and sharing thresholds.
#[derive(Debug, Clone, Copy)]
pub struct CrossAgentConfig {
    /// Minimum compatibility score to consider two agents compatible.
    pub min_compatibility_score: f64,
    /// Whether at least one shared domain is also required.
    pub require_domain_overlap: bool,
    /// Maximum confidence reduction applied during adaptation.
    pub max_confidence_penalty: f64,
    /// Whether adaptation may rewrite the approach's core technique.
    pub allow_architectural_changes: bool,
    /// Whether the core technique and rationale are kept verbatim during
    /// adaptation. When `false`, they are vocabulary-mapped like the rest
    /// of the approach instead of being preserved.
    pub preserve_core: bool,
    /// Success-rate floor for `sharePattern` auto-sharing.
    pub share_threshold: f64,
    /// Whether auto-sharing is enabled at all.
    pub auto_share: bool,
    /// Maximum cross-pollination depth before `sharePattern` stops.
    pub max_share_depth: u32,
    /// Fraction of eligible voters' weight required for `resolveConflict`
    /// to reach quorum.
    pub quorum_percent: f64,
}

impl Default for CrossAgentConfig {
    fn default() -> Self {
        Self {
            min_compatibility_score: 0.6,
            require_domain_overlap: false,
            max_confidence_penalty: 0.3,
            allow_architectural_changes: false,
            preserve_core: true,
            share_threshold: 0.8,
            auto_share: true,
            max_share_depth: 3,
            quorum_percent: 0.5,
        }
    }
}

/// A record of one pattern having been adapted and shared from one agent to
/// another, used to bound cross-pollination depth via
/// its provenance chain rather than weak references.
#[derive(Debug, Clone)]
pub struct SharingRecord {
    /// Agent the pattern was shared from.
    pub from: AgentName,
    /// Agent the pattern was shared to.
    pub to: AgentName,
    /// Id of the original pattern.
    pub pattern_id: Uuid,
    /// Id of the new, adapted pattern.
    pub adapted_pattern_id: Uuid,
    /// Ids of every sharing hop that led to this one, oldest first; its
    /// length is the cross-pollination depth.
    pub provenance: Vec<Uuid>,
    /// When the share happened.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Registry of agent profiles plus the cross-agent operations:
/// compatibility scoring, pattern adaptation, auto-sharing, and
/// conflict resolution.
pub struct CrossAgentLearner {
    profiles: RwLock<HashMap<AgentName, AgentProfile>>,
    config: CrossAgentConfig,
}

impl CrossAgentLearner {
    /// Builds an empty registry under `config`.
    #[must_use]
    pub fn new(config: CrossAgentConfig) -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Registers (or overwrites) an agent's profile.
    pub fn register_agent(&self, profile: AgentProfile) {
        self.profiles.write().insert(profile.name.clone(), profile);
    }

    /// Looks up a registered profile.
    #[must_use]
    pub fn profile(&self, agent: &AgentName) -> Option<AgentProfile> {
        self.profiles.read().get(agent).cloned()
    }

    /// Scores compatibility between two registered agents:
    /// `0.4*capabilityJaccard + 0.4*domainJaccard + 0.2*focusOverlap`.
    pub fn check_compatibility(&self, src: &AgentName, dst: &AgentName) -> Result<CompatibilityResult> {
        let profiles = self.profiles.read();
        let src_profile = profiles
        .get(src)
        .ok_or_else(|| Error::NotFound(format!("agent profile {src}")))?;
        let dst_profile = profiles
        .get(dst)
        .ok_or_else(|| Error::NotFound(format!("agent profile {dst}")))?;

        let (cap_score, overlapping_capabilities) = jaccard(&src_profile.capabilities, &dst_profile.capabilities);
        let (dom_score, overlapping_domains) = jaccard(&src_profile.domains, &dst_profile.domains);
        let focus = focus_overlap(&src_profile.focus_areas, &dst_profile.focus_areas);

        let score = (0.4 * cap_score + 0.4 * dom_score + 0.2 * focus).clamp(0.0, 1.0);
        let domain_ok = !self.config.require_domain_overlap || !overlapping_domains.is_empty();
        Ok(CompatibilityResult {
                compatible: score >= self.config.min_compatibility_score && domain_ok,
                score,
                overlapping_capabilities,
                overlapping_domains,
        })
    }

    /// Adapts `pattern` from `src`'s vocabulary to `dst`'s: maps vocabulary
    /// tokens in `context` and `approach` to the destination's vocabulary
    /// using the profiles' capabilities as a dictionary (preserving the core
    /// technique/rationale verbatim unless `preserve_core` is off),
    /// simplifies the code template on a complexity downgrade, and reduces
    /// confidence proportional to `(1 - compatibilityScore)`. Refuses with
    /// `Error::AdaptationRefused` if architectural changes are disallowed
    /// and the adaptation would need to rewrite the technique (i.e. no
    /// destination vocabulary maps onto the source technique at all).
    pub fn adapt_pattern(&self, pattern: &Pattern, src: &AgentName, dst: &AgentName) -> Result<Pattern> {
        let compatibility = self.check_compatibility(src, dst)?;
        let profiles = self.profiles.read();
        let src_profile = profiles
        .get(src)
        .ok_or_else(|| Error::NotFound(format!("agent profile {src}")))?;
        let dst_profile = profiles
        .get(dst)
        .ok_or_else(|| Error::NotFound(format!("agent profile {dst}")))?;

        let mut adapted = pattern.clone();
        adapted.agent = dst.clone();

        let technique_known = dst_profile
        .capabilities
        .iter()
        .any(|cap| pattern.pattern.approach.technique.to_lowercase().contains(&cap.to_lowercase()));
        if !technique_known && !self.config.allow_architectural_changes {
            return Err(Error::AdaptationRefused(format!(
                        "destination agent {dst} has no matching capability for technique '{}' and architectural changes are disallowed",
                        pattern.pattern.approach.technique
            )));
        }

        adapted.pattern.context = map_context(&pattern.pattern.context, &src_profile.capabilities, &dst_profile.capabilities);
        adapted.pattern.approach.code_template =
        map_vocabulary(&pattern.pattern.approach.code_template, &src_profile.capabilities, &dst_profile.capabilities);
        if !self.config.preserve_core {
            adapted.pattern.approach.technique =
            map_vocabulary(&pattern.pattern.approach.technique, &src_profile.capabilities, &dst_profile.capabilities);
            adapted.pattern.approach.rationale =
            map_vocabulary(&pattern.pattern.approach.rationale, &src_profile.capabilities, &dst_profile.capabilities);
        }

        if dst_profile.complexity < complexity_of(src, &profiles).unwrap_or(dst_profile.complexity) {
            adapted.pattern.approach.code_template = simplify_code_template(&adapted.pattern.approach.code_template);
        }

        let penalty = self.config.max_confidence_penalty * (1.0 - compatibility.score);
        adapted.evolution.confidence_score = (pattern.evolution.confidence_score - penalty).clamp(0.0, 1.0);

        Ok(adapted)
    }

    /// Auto-shares `pattern` from `agent` to every compatible registered
    /// agent, provided `autoShare` is on and the pattern clears
    /// `shareThreshold`. Stops expanding any provenance chain once it
    /// reaches `maxShareDepth` hops.
    pub fn share_pattern(
        &self,
        agent: &AgentName,
        pattern: &Pattern,
        provenance: &[Uuid],
    ) -> Result<Vec<(SharingRecord, Pattern)>> {
        if !self.config.auto_share || pattern.metrics.success_rate < self.config.share_threshold {
            return Ok(Vec::new());
        }
        if provenance.len() as u32 >= self.config.max_share_depth {
            return Ok(Vec::new());
        }

        let targets: Vec<AgentName> = {
            let profiles = self.profiles.read();
            profiles.keys().filter(|name| *name != agent).cloned().collect()
        };

        let mut shared = Vec::new();
        for target in targets {
            let compatibility = self.check_compatibility(agent, &target)?;
            if !compatibility.compatible {
                continue;
            }
            match self.adapt_pattern(pattern, agent, &target) {
                Ok(mut adapted) => {
                    adapted.id = Uuid::new_v4();
                    let mut chain = provenance.to_vec();
                    chain.push(pattern.id);
                    shared.push((
                            SharingRecord {
                                from: agent.clone(),
                                to: target,
                                pattern_id: pattern.id,
                                adapted_pattern_id: adapted.id,
                                provenance: chain,
                                timestamp: chrono::Utc::now(),
                            },
                            adapted,
                    ));
                }
                Err(Error::AdaptationRefused(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Ok(shared)
    }

    /// How agents have voted on resolving a conflict (
    /// `resolveConflict`).
    pub fn resolve_conflict(&self, votes: &[Vote], eligible_voters: usize, tiebreaker: Tiebreaker) -> Result<ConflictResolution> {
        if eligible_voters == 0 {
            return Err(Error::NoQuorum("no eligible voters configured".into()));
        }
        let weighted: Vec<(Vote, f64)> = votes.iter().map(|v| (v.clone(), vote_weight(v))).collect();
        let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
        let quorum_needed = eligible_voters as f64 * self.config.quorum_percent;
        if (votes.len() as f64) < quorum_needed {
            return Err(Error::NoQuorum(format!(
                        "{} of {eligible_voters} eligible voters participated, need {quorum_needed:.1}",
                        votes.len()
            )));
        }

        let mut by_option: HashMap<&str, f64> = HashMap::new();
        for (vote, weight) in &weighted {
            *by_option.entry(vote.option.as_str()).or_insert(0.0) += weight;
        }

        let mut ranked: Vec<(&str, f64)> = by_option.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let winner = if ranked.len() > 1 && (ranked[0].1 - ranked[1].1).abs() < f64::EPSILON {
            break_tie(&weighted, tiebreaker)
        } else {
            ranked
            .first()
            .map(|(opt, _)| (*opt).to_string())
            .ok_or_else(|| Error::NoQuorum("no votes to resolve".into()))?
        };

        let minority_opinion: Vec<Vote> = weighted
        .iter()
        .filter(|(vote, _)| vote.option != winner)
        .map(|(vote, _)| vote.clone())
        .collect();

        Ok(ConflictResolution {
                winning_option: winner,
                total_weight,
                minority_opinion,
        })
    }
}

fn complexity_of(
    agent: &AgentName,
    profiles: &HashMap<AgentName, AgentProfile>,
) -> Option<ComplexityLevel> {
    profiles.get(agent).map(|p| p.complexity)
}

/// Replaces whole-word occurrences of source capability tokens with the
/// destination capability at the same dictionary position, for every source
/// token the destination profile doesn't already share.
fn map_vocabulary(text: &str, src_capabilities: &[String], dst_capabilities: &[String]) -> String {
    let mut out = text.to_string();
    for (i, src_token) in src_capabilities.iter().enumerate() {
        if dst_capabilities.iter().any(|d| d.eq_ignore_ascii_case(src_token)) {
            continue;
        }
        let Some(dst_token) = dst_capabilities.get(i) else {
            continue;
        };
        out = replace_ignore_case(&out, src_token, dst_token);
    }
    out
}

fn replace_ignore_case(haystack: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return haystack.to_string();
    }
    let lower_haystack = haystack.to_lowercase();
    let lower_from = from.to_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    let mut rest_lower = lower_haystack.as_str();
    while let Some(pos) = rest_lower.find(&lower_from) {
        out.push_str(&rest[..pos]);
        out.push_str(to);
        rest = &rest[pos + from.len()..];
        rest_lower = &rest_lower[pos + from.len()..];
    }
    out.push_str(rest);
    out
}

/// Recursively applies [`map_vocabulary`] to every string leaf of a
/// pattern's `context` map.
fn map_context(context: &ValueMap, src_capabilities: &[String], dst_capabilities: &[String]) -> ValueMap {
    context
    .iter()
    .map(|(k, v)| (k.clone(), map_value(v, src_capabilities, dst_capabilities)))
    .collect()
}

fn map_value(value: &Value, src_capabilities: &[String], dst_capabilities: &[String]) -> Value {
    match value {
        Value::String(s) => Value::String(map_vocabulary(s, src_capabilities, dst_capabilities)),
        Value::List(items) => {
            Value::List(items.iter().map(|v| map_value(v, src_capabilities, dst_capabilities)).collect())
        }
        Value::Map(m) => Value::Map(map_context(m, src_capabilities, dst_capabilities)),
        other => other.clone(),
    }
}

fn simplify_code_template(template: &str) -> String {
    // Strip anything inside `/* optional */... /* end-optional */`
    // markers: these mark an opt-out section of the template.
    const START: &str = "/* optional */";
    const END: &str = "/* end-optional */";
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(START) {
        out.push_str(&rest[..start]);
        match rest[start..].find(END) {
            Some(end) => rest = &rest[start + end + END.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// One agent's vote in [`CrossAgentLearner::resolve_conflict`].
#[derive(Debug, Clone)]
pub struct Vote {
    /// Which option this agent voted for.
    pub option: String,
    /// The voting agent's observed success rate.
    pub success_rate: f64,
    /// The voting agent's confidence in its recommendation.
    pub confidence: f64,
    /// How many times the voting agent has used this pattern/solution.
    pub usage_count: u64,
    /// Normalizer for `usage_count` across all voters.
    pub max_usage_count: u64,
    /// Domain-expertise score for the voting agent, in `[0, 1]`.
    pub expertise: f64,
}

fn vote_weight(vote: &Vote) -> f64 {
    let usage_term = if vote.max_usage_count == 0 {
        0.0
    } else {
        vote.usage_count as f64 / vote.max_usage_count as f64
    };
    0.4 * vote.success_rate + 0.2 * vote.confidence + 0.1 * usage_term + 0.3 * vote.expertise
}

/// How to break a tie in [`CrossAgentLearner::resolve_conflict`].
#[derive(Debug, Clone, Copy)]
pub enum Tiebreaker {
    /// Prefer the option backed by the vote with the highest confidence.
    HighestConfidence,
}

fn break_tie(weighted: &[(Vote, f64)], tiebreaker: Tiebreaker) -> String {
    match tiebreaker {
        Tiebreaker::HighestConfidence => weighted
        .iter()
        .max_by(|a, b| a.0.confidence.partial_cmp(&b.0.confidence).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(v, _)| v.option.clone())
        .unwrap_or_default(),
    }
}

/// Result of [`CrossAgentLearner::resolve_conflict`]: the winning
/// option plus the dissenting votes, kept for auditability.
#[derive(Debug, Clone)]
pub struct ConflictResolution {
    /// The option with the highest cumulative weight.
    pub winning_option: String,
    /// Total weight of all participating votes.
    pub total_weight: f64,
    /// Every vote that did not go to the winning option.
    pub minority_opinion: Vec<Vote>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Approach, Conditions, Evolution, Metrics, PatternBody, ValueMap};

    fn profile(name: &str, caps: &[&str], domains: &[&str], complexity: ComplexityLevel) -> AgentProfile {
        AgentProfile {
            name: name.into(),
            capabilities: caps.iter().map(|s| s.to_string()).collect(),
            domains: domains.iter().map(|s| s.to_string()).collect(),
            focus_areas: vec![],
            complexity,
            learning_rate: 0.1,
        }
    }

    fn sample_pattern(agent: &str, technique: &str) -> Pattern {
        let now = chrono::Utc::now();
        Pattern {
            id: Uuid::new_v4(),
            agent: agent.into(),
            timestamp: now,
            pattern: PatternBody {
                r#type: "react-opt".into(),
                context: ValueMap::new(),
                approach: Approach {
                    technique: technique.to_string(),
                    code_template: "base /* optional */ extra /* end-optional */ tail".into(),
                    rationale: "avoids re-render".into(),
                },
                conditions: Conditions::default(),
            },
            metrics: Metrics {
                success_rate: 0.9,
                execution_count: 10,
                avg_time_saved_ms: 100.0,
                error_prevention_count: 0,
            },
            evolution: Evolution {
                created: now,
                last_used: now,
                refinements: 0,
                confidence_score: 0.8,
            },
        }
    }

    #[test]
    fn compatibility_score_rewards_shared_capabilities() {
        let learner = CrossAgentLearner::new(CrossAgentConfig::default());
        learner.register_agent(profile("a", &["react", "testing"], &["frontend"], ComplexityLevel::Intermediate));
        learner.register_agent(profile("b", &["react", "css"], &["frontend"], ComplexityLevel::Intermediate));
        let result = learner.check_compatibility(&"a".into(), &"b".into()).expect("ok");
        assert!(result.compatible);
        assert!(result.score > 0.0);
    }

    #[test]
    fn adapt_pattern_penalizes_confidence_for_low_compatibility() {
        let learner = CrossAgentLearner::new(CrossAgentConfig::default());
        learner.register_agent(profile("a", &["react"], &["frontend"], ComplexityLevel::Advanced));
        learner.register_agent(profile("b", &["react"], &["frontend"], ComplexityLevel::Basic));
        let pattern = sample_pattern("a", "react memoization");
        let adapted = learner.adapt_pattern(&pattern, &"a".into(), &"b".into()).expect("adapt");
        assert!(adapted.evolution.confidence_score <= pattern.evolution.confidence_score);
        assert!(!adapted.pattern.approach.code_template.contains("extra"));
    }

    #[test]
    fn adapt_pattern_refuses_unknown_technique_without_architectural_changes() {
        let learner = CrossAgentLearner::new(CrossAgentConfig::default());
        learner.register_agent(profile("a", &["rust"], &["backend"], ComplexityLevel::Advanced));
        learner.register_agent(profile("b", &["python"], &["backend"], ComplexityLevel::Advanced));
        let pattern = sample_pattern("a", "borrow-checker trick");
        let result = learner.adapt_pattern(&pattern, &"a".into(), &"b".into());
        assert!(matches!(result, Err(Error::AdaptationRefused(_))));
    }

    #[test]
    fn resolve_conflict_picks_highest_weight_option() {
        let learner = CrossAgentLearner::new(CrossAgentConfig::default());
        let votes = vec![
            Vote {
                option: "A".into(),
                success_rate: 0.9,
                confidence: 0.9,
                usage_count: 10,
                max_usage_count: 10,
                expertise: 0.9,
            },
            Vote {
                option: "B".into(),
                success_rate: 0.2,
                confidence: 0.2,
                usage_count: 1,
                max_usage_count: 10,
                expertise: 0.1,
            },
        ];
        let resolution = learner.resolve_conflict(&votes, 2, Tiebreaker::HighestConfidence).expect("resolved");
        assert_eq!(resolution.winning_option, "A");
        assert_eq!(resolution.minority_opinion.len(), 1);
    }

    #[test]
    fn resolve_conflict_reports_no_quorum() {
        let learner = CrossAgentLearner::new(CrossAgentConfig::default());
        let votes = vec![Vote {
                option: "A".into(),
                success_rate: 0.9,
                confidence: 0.9,
                usage_count: 1,
                max_usage_count: 1,
                expertise: 0.5,
        }];
        let result = learner.resolve_conflict(&votes, 10, Tiebreaker::HighestConfidence);
        assert!(matches!(result, Err(Error::NoQuorum(_))));
    }
}
