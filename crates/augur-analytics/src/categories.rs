//! Category performance and ROI tiers

use augur_domain::{Evidence, Hypothesis, HypothesisId, Outcome, OutcomeRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Return-on-investment tier from accept rate and evidence volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoiTier {
    /// Accept rate below 0.2
    Low,
    /// Accept rate at least 0.2
    Medium,
    /// Accept rate at least 0.4 with 10+ evidence
    High,
    /// Accept rate at least 0.6 with 20+ evidence
    VeryHigh,
}

impl RoiTier {
    /// Fixed lookup on accept rate and evidence volume
    pub fn classify(accept_rate: f64, evidence_volume: usize) -> Self {
        if accept_rate >= 0.6 && evidence_volume >= 20 {
            RoiTier::VeryHigh
        } else if accept_rate >= 0.4 && evidence_volume >= 10 {
            RoiTier::High
        } else if accept_rate >= 0.2 {
            RoiTier::Medium
        } else {
            RoiTier::Low
        }
    }

    /// Tier name
    pub fn as_str(&self) -> &'static str {
        match self {
            RoiTier::VeryHigh => "VERY_HIGH",
            RoiTier::High => "HIGH",
            RoiTier::Medium => "MEDIUM",
            RoiTier::Low => "LOW",
        }
    }

    /// What to do with the category
    pub fn recommendation(&self) -> &'static str {
        match self {
            RoiTier::VeryHigh => "Prioritize: expand signal coverage and act on CONVICTION hypotheses quickly",
            RoiTier::High => "Invest: keep current coverage and review promotion candidates each cycle",
            RoiTier::Medium => "Monitor: gather more evidence before committing outreach effort",
            RoiTier::Low => "Deprioritize: review signal sources and rejection reasons before further passes",
        }
    }
}

impl fmt::Display for RoiTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performance of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPerformance {
    /// Category name
    pub category: String,
    /// Hypotheses in the category, any status
    pub hypotheses: usize,
    /// Recorded outcomes
    pub outcomes: usize,
    /// ACCEPT outcomes
    pub accepted: usize,
    /// WEAK_ACCEPT outcomes
    pub weak_accepted: usize,
    /// REJECT outcomes
    pub rejected: usize,
    /// ACCEPT share of outcomes
    pub accept_rate: f64,
    /// WEAK_ACCEPT share of outcomes
    pub weak_accept_rate: f64,
    /// REJECT share of outcomes
    pub reject_rate: f64,
    /// Evidence entries on the category's hypotheses
    pub evidence_volume: usize,
    /// Mean effectiveness score, if any outcome exists
    pub mean_effectiveness: Option<f64>,
    /// ROI tier
    pub roi_tier: RoiTier,
    /// Recommendation for the tier
    pub recommendation: String,
}

/// Performance per category, ordered by category name
pub fn category_performance(
    hypotheses: &[Hypothesis],
    outcomes: &[OutcomeRecord],
    evidence: &[Evidence],
) -> Vec<CategoryPerformance> {
    let owner: HashMap<HypothesisId, &str> = hypotheses.iter().map(|h| (h.id, h.category.as_str())).collect();

    #[derive(Default)]
    struct Tally {
        hypotheses: usize,
        evidence: usize,
        accepted: usize,
        weak: usize,
        rejected: usize,
        effectiveness_sum: f64,
    }

    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
    for h in hypotheses {
        tallies.entry(h.category.as_str()).or_default().hypotheses += 1;
    }
    for e in evidence {
        if let Some(category) = owner.get(&e.hypothesis_id) {
            tallies.entry(*category).or_default().evidence += 1;
        }
    }
    for o in outcomes {
        let t = tallies.entry(o.category.as_str()).or_default();
        match o.outcome {
            Outcome::Accept => t.accepted += 1,
            Outcome::WeakAccept => t.weak += 1,
            Outcome::Reject => t.rejected += 1,
        }
        t.effectiveness_sum += o.effectiveness_score;
    }

    tallies
        .into_iter()
        .map(|(category, t)| {
            let n = t.accepted + t.weak + t.rejected;
            let rate = |count: usize| if n == 0 { 0.0 } else { count as f64 / n as f64 };
            let accept_rate = rate(t.accepted);
            let roi_tier = RoiTier::classify(accept_rate, t.evidence);
            CategoryPerformance {
                category: category.to_string(),
                hypotheses: t.hypotheses,
                outcomes: n,
                accepted: t.accepted,
                weak_accepted: t.weak,
                rejected: t.rejected,
                accept_rate,
                weak_accept_rate: rate(t.weak),
                reject_rate: rate(t.rejected),
                evidence_volume: t.evidence,
                mean_effectiveness: (n > 0).then(|| t.effectiveness_sum / n as f64),
                roi_tier,
                recommendation: roi_tier.recommendation().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roi_lookup() {
        assert_eq!(RoiTier::classify(0.6, 20), RoiTier::VeryHigh);
        assert_eq!(RoiTier::classify(0.6, 19), RoiTier::High);
        assert_eq!(RoiTier::classify(0.4, 10), RoiTier::High);
        assert_eq!(RoiTier::classify(0.9, 9), RoiTier::Medium);
        assert_eq!(RoiTier::classify(0.2, 0), RoiTier::Medium);
        assert_eq!(RoiTier::classify(0.19, 100), RoiTier::Low);
    }

    #[test]
    fn test_tier_texts_are_distinct() {
        let tiers = [RoiTier::VeryHigh, RoiTier::High, RoiTier::Medium, RoiTier::Low];
        for (i, a) in tiers.iter().enumerate() {
            for b in &tiers[i + 1..] {
                assert_ne!(a.recommendation(), b.recommendation());
            }
        }
        assert_eq!(RoiTier::VeryHigh.to_string(), "VERY_HIGH");
    }

    proptest! {
        #[test]
        fn prop_tier_monotonic_in_accept_rate(rate in 0.0f64..1.0, bump in 0.0f64..0.5, volume in 0usize..50) {
            let higher = (rate + bump).min(1.0);
            prop_assert!(RoiTier::classify(higher, volume) >= RoiTier::classify(rate, volume));
        }
    }
}
