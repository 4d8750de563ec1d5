//! Expected-information-gain prioritizer
//!
//! `EIG(h) = (1 - confidence) × novelty × information_value_estimate`
//!
//! Pure and deterministic: identical inputs give identical orderings.
//! Hypotheses that are not ACTIVE or already sit at or above the CONVICTION
//! threshold are excluded.

use crate::feedback::InformationValueSnapshot;
use augur_domain::{BandThresholds, Evidence, Hypothesis, HypothesisId};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Multipliers sourced from temporal context and the relationship graph
///
/// Not applied. Scores stay comparable with history until these terms are
/// calibrated; callers may pass them so the wiring point is explicit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservedBoosts {
    /// Temporal context adjustment
    pub temporal_boost: f64,
    /// Relationship-graph signal
    pub network_boost: f64,
}

impl Default for ReservedBoosts {
    fn default() -> Self {
        Self {
            temporal_boost: 1.0,
            network_boost: 1.0,
        }
    }
}

/// What the prioritizer knows about one hypothesis's evidence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceSummary {
    /// Source types already observed
    pub observed_source_types: BTreeSet<String>,
    /// `observed_at` of the most recent evidence
    pub last_observed_at: Option<u64>,
}

impl EvidenceSummary {
    /// Summarize an evidence log
    pub fn from_evidence(evidence: &[Evidence]) -> Self {
        Self {
            observed_source_types: evidence.iter().map(|e| e.source_type.clone()).collect(),
            last_observed_at: evidence.iter().map(|e| e.observed_at).max(),
        }
    }
}

/// One prioritizer input
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// The hypothesis
    pub hypothesis: &'a Hypothesis,
    /// Its evidence summary
    pub evidence: &'a EvidenceSummary,
}

/// Score of one eligible hypothesis
#[derive(Debug, Clone, PartialEq)]
pub struct Priority {
    /// Hypothesis scored
    pub hypothesis_id: HypothesisId,
    /// Expected information gain
    pub eig: f64,
    /// Information value estimate used
    pub information_value_estimate: f64,
    /// Tie-breaker: older evidence wins
    pub last_observed_at: Option<u64>,
}

/// EIG scoring and ordering
#[derive(Debug, Clone)]
pub struct EigPrioritizer {
    thresholds: BandThresholds,
    revisit_factor: f64,
}

impl EigPrioritizer {
    /// Create a prioritizer
    pub fn new(thresholds: BandThresholds, revisit_factor: f64) -> Self {
        Self {
            thresholds,
            revisit_factor,
        }
    }

    /// Mean estimate over the source types not yet observed
    ///
    /// Once every known type has been observed, the mean over all known
    /// types discounted by the revisit factor.
    pub fn information_value_estimate(
        &self,
        category: &str,
        observed: &BTreeSet<String>,
        snapshot: &InformationValueSnapshot,
    ) -> f64 {
        let known = snapshot.known_source_types();
        let unobserved: Vec<f64> = known
            .iter()
            .filter(|t| !observed.contains(*t))
            .map(|t| snapshot.estimate(category, t))
            .collect();
        if !unobserved.is_empty() {
            return unobserved.iter().sum::<f64>() / unobserved.len() as f64;
        }
        if known.is_empty() {
            return 0.0;
        }
        let all: f64 = known.iter().map(|t| snapshot.estimate(category, t)).sum();
        all / known.len() as f64 * self.revisit_factor
    }

    /// Score one hypothesis; `None` when it is not eligible
    pub fn score(&self, candidate: Candidate<'_>, snapshot: &InformationValueSnapshot, _boosts: &ReservedBoosts) -> Option<Priority> {
        let h = candidate.hypothesis;
        if !h.is_active() || h.confidence() >= self.thresholds.conviction {
            return None;
        }
        let information_value_estimate =
            self.information_value_estimate(&h.category, &candidate.evidence.observed_source_types, snapshot);
        let eig = (1.0 - h.confidence()) * h.novelty * information_value_estimate;

        Some(Priority {
            hypothesis_id: h.id,
            eig,
            information_value_estimate,
            last_observed_at: candidate.evidence.last_observed_at,
        })
    }

    /// Eligible hypotheses in descending priority
    ///
    /// Ties: older most-recent evidence first (none at all counts as oldest),
    /// then ascending id.
    pub fn prioritize(
        &self,
        candidates: &[Candidate<'_>],
        snapshot: &InformationValueSnapshot,
        boosts: &ReservedBoosts,
    ) -> Vec<Priority> {
        let mut scored: Vec<Priority> = candidates
            .iter()
            .filter_map(|c| self.score(*c, snapshot, boosts))
            .collect();
        scored.sort_by(compare);
        scored
    }
}

fn compare(a: &Priority, b: &Priority) -> Ordering {
    b.eig
        .total_cmp(&a.eig)
        .then(a.last_observed_at.cmp(&b.last_observed_at))
        .then(a.hypothesis_id.cmp(&b.hypothesis_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use augur_domain::{source_types, HypothesisStatus};
    use proptest::prelude::*;

    fn snapshot() -> InformationValueSnapshot {
        InformationValueSnapshot::initial(&EngineConfig::default())
    }

    fn prioritizer() -> EigPrioritizer {
        EigPrioritizer::new(BandThresholds::default(), 0.5)
    }

    fn hypothesis(confidence: f64, novelty: f64) -> Hypothesis {
        let t = BandThresholds::default();
        let mut h = Hypothesis::new("org:acme", "procurement", 0.1, novelty, &t, 0);
        h.apply_confidence(confidence, &t);
        h
    }

    fn observed(types: &[&str], last: Option<u64>) -> EvidenceSummary {
        EvidenceSummary {
            observed_source_types: types.iter().map(|s| s.to_string()).collect(),
            last_observed_at: last,
        }
    }

    #[test]
    fn test_estimate_over_unobserved_types() {
        let p = prioritizer();
        let s = snapshot();
        let none = BTreeSet::new();
        assert!((p.information_value_estimate("procurement", &none, &s) - 0.4).abs() < 1e-12);

        let signal_only = observed(&[source_types::SIGNAL], None).observed_source_types;
        // mean(0.4, 0.5)
        assert!((p.information_value_estimate("procurement", &signal_only, &s) - 0.45).abs() < 1e-12);

        let all = observed(&[source_types::SIGNAL, source_types::KNOWLEDGE_GRAPH, source_types::WEB_SEARCH], None)
            .observed_source_types;
        assert!((p.information_value_estimate("procurement", &all, &s) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_eig_formula() {
        let h = hypothesis(0.2, 0.5);
        let ev = observed(&[source_types::SIGNAL], Some(10));
        let priority = prioritizer()
            .score(Candidate { hypothesis: &h, evidence: &ev }, &snapshot(), &ReservedBoosts::default())
            .unwrap();
        assert!((priority.eig - 0.8 * 0.5 * 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_exclusions() {
        let resolved = hypothesis(0.8, 1.0);
        let mut promoted = hypothesis(0.4, 1.0);
        promoted.transition(HypothesisStatus::Promoted).unwrap();
        let ev = EvidenceSummary::default();

        let p = prioritizer();
        let s = snapshot();
        let boosts = ReservedBoosts::default();
        assert!(p.score(Candidate { hypothesis: &resolved, evidence: &ev }, &s, &boosts).is_none());
        assert!(p.score(Candidate { hypothesis: &promoted, evidence: &ev }, &s, &boosts).is_none());
    }

    #[test]
    fn test_boosts_are_not_applied() {
        let h = hypothesis(0.3, 0.7);
        let ev = EvidenceSummary::default();
        let p = prioritizer();
        let s = snapshot();
        let plain = p.score(Candidate { hypothesis: &h, evidence: &ev }, &s, &ReservedBoosts::default());
        let boosted = p.score(
            Candidate { hypothesis: &h, evidence: &ev },
            &s,
            &ReservedBoosts {
                temporal_boost: 3.0,
                network_boost: 9.0,
            },
        );
        assert_eq!(plain, boosted);
    }

    #[test]
    fn test_ties_prefer_starved_then_id() {
        let a = hypothesis(0.2, 1.0);
        let b = hypothesis(0.2, 1.0);
        let c = hypothesis(0.2, 1.0);
        let recent = observed(&[], Some(500));
        let old = observed(&[], Some(100));
        let none = observed(&[], None);

        let ordered = prioritizer().prioritize(
            &[
                Candidate { hypothesis: &a, evidence: &recent },
                Candidate { hypothesis: &b, evidence: &old },
                Candidate { hypothesis: &c, evidence: &none },
            ],
            &snapshot(),
            &ReservedBoosts::default(),
        );
        let ids: Vec<HypothesisId> = ordered.iter().map(|p| p.hypothesis_id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let twin = observed(&[], Some(100));
        let ordered = prioritizer().prioritize(
            &[
                Candidate { hypothesis: &b, evidence: &twin },
                Candidate { hypothesis: &a, evidence: &twin },
            ],
            &snapshot(),
            &ReservedBoosts::default(),
        );
        // Equal score and age: lower id first
        assert_eq!(ordered[0].hypothesis_id, a.id.min(b.id));
    }

    proptest! {
        #[test]
        fn prop_ordering_is_deterministic(
            specs in prop::collection::vec((0.0f64..1.0, 0.01f64..1.0, prop::option::of(0u64..1000)), 1..20)
        ) {
            let hyps: Vec<Hypothesis> = specs.iter().map(|(c, n, _)| hypothesis(*c, *n)).collect();
            let summaries: Vec<EvidenceSummary> = specs.iter().map(|(_, _, last)| observed(&[], *last)).collect();
            let candidates: Vec<Candidate> = hyps
                .iter()
                .zip(summaries.iter())
                .map(|(h, e)| Candidate { hypothesis: h, evidence: e })
                .collect();

            let p = prioritizer();
            let s = snapshot();
            let first = p.prioritize(&candidates, &s, &ReservedBoosts::default());
            let mut reversed = candidates.clone();
            reversed.reverse();
            let second = p.prioritize(&reversed, &s, &ReservedBoosts::default());
            prop_assert_eq!(&first, &second);

            for pair in first.windows(2) {
                prop_assert!(pair[0].eig >= pair[1].eig);
            }
        }
    }
}
