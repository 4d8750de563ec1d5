//! Confidence updater
//!
//! Additive, damped update rule:
//!
//! ```text
//! delta(e)       = information_value(e) * polarity(e) * (1 - confidence)
//! new_confidence = clamp(confidence + delta(e), 0, 1)      (per evidence, in order)
//! ```
//!
//! The `(1 - confidence)` term gives diminishing returns as a hypothesis
//! approaches certainty. Evidence in a batch is applied in order, each delta
//! computed against the running confidence, so the result can be replayed
//! from the evidence log alone.

use crate::band::BandThresholds;
use crate::evidence::{Evidence, Observation, Polarity};
use crate::hypothesis::Hypothesis;
use crate::id::EvidenceId;

/// Delta produced by one piece of evidence at the given confidence
pub fn confidence_delta(information_value: f64, polarity: Polarity, confidence: f64) -> f64 {
    unit(information_value) * polarity.sign() * (1.0 - unit(confidence))
}

/// Apply a stored delta to a confidence value
pub fn apply_delta(confidence: f64, delta: f64) -> f64 {
    if !delta.is_finite() {
        return unit(confidence);
    }
    (unit(confidence) + delta).clamp(0.0, 1.0)
}

/// Confidence after applying the observations in order
///
/// Pure form of the updater: `update(confidence, new_evidence[]) -> new_confidence`.
pub fn update(confidence: f64, observations: &[Observation]) -> f64 {
    observations.iter().fold(unit(confidence), |current, obs| {
        apply_delta(current, confidence_delta(obs.information_value, obs.polarity, current))
    })
}

/// Ingest observations into a hypothesis
///
/// Computes each delta against the running confidence, appends the evidence
/// ids to the hypothesis, reclassifies its band and returns the frozen
/// evidence entries in ingestion order.
pub fn ingest(
    hypothesis: &mut Hypothesis,
    observations: Vec<Observation>,
    pass_number: u32,
    thresholds: &BandThresholds,
) -> Vec<Evidence> {
    let mut current = hypothesis.confidence();
    let mut evidence = Vec::with_capacity(observations.len());

    for obs in observations {
        let information_value = unit(obs.information_value);
        let delta = confidence_delta(information_value, obs.polarity, current);
        current = apply_delta(current, delta);

        let entry = Evidence {
            id: EvidenceId::new(),
            hypothesis_id: hypothesis.id,
            source_type: obs.source_type,
            payload_summary: obs.payload_summary,
            source_url: obs.source_url,
            observed_at: obs.observed_at,
            information_value,
            polarity: obs.polarity,
            confidence_delta: delta,
            pass_number,
            rationale: obs.rationale,
        };
        hypothesis.attach_evidence(entry.id);
        evidence.push(entry);
    }

    hypothesis.apply_confidence(current, thresholds);
    evidence
}

/// Replay confidence from the stored deltas of an evidence log
pub fn replay(prior_confidence: f64, evidence: &[Evidence]) -> f64 {
    evidence
        .iter()
        .fold(unit(prior_confidence), |current, e| apply_delta(current, e.confidence_delta))
}

/// Recompute confidence from information values and polarities only
///
/// Ignores the stored deltas; must agree with [`replay`] for an untampered log.
pub fn recompute(prior_confidence: f64, evidence: &[Evidence]) -> f64 {
    evidence.iter().fold(unit(prior_confidence), |current, e| {
        apply_delta(current, confidence_delta(e.information_value, e.polarity, current))
    })
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::Band;
    use crate::evidence::source_types;

    fn supporting(iv: f64) -> Observation {
        Observation::new(source_types::WEB_SEARCH, "supporting document", 100, iv, Polarity::Supports)
    }

    #[test]
    fn test_delta_damping() {
        assert!((confidence_delta(0.5, Polarity::Supports, 0.2) - 0.4).abs() < 1e-12);
        assert!((confidence_delta(0.5, Polarity::Contradicts, 0.2) + 0.4).abs() < 1e-12);
        assert_eq!(confidence_delta(0.5, Polarity::Neutral, 0.2), 0.0);
        assert_eq!(confidence_delta(0.9, Polarity::Supports, 1.0), 0.0);
    }

    #[test]
    fn test_three_step_trajectory() {
        // 0.2 -> 0.6 -> 0.8 -> 0.9
        let thresholds = BandThresholds::new(0.30, 0.55, 0.85).unwrap();
        let mut h = Hypothesis::new("org:acme", "procurement", 0.2, 1.0, &thresholds, 0);
        assert_eq!(h.band(), Band::Exploratory);

        let expected = [(0.6, Band::Confident), (0.8, Band::Confident), (0.9, Band::Conviction)];
        for (target, band) in expected {
            ingest(&mut h, vec![supporting(0.5)], 1, &thresholds);
            assert!((h.confidence() - target).abs() < 1e-9, "expected {}, got {}", target, h.confidence());
            assert_eq!(h.band(), band);
        }
        assert_eq!(h.evidence_ids().len(), 3);
    }

    #[test]
    fn test_batch_equals_sequence() {
        let batch = vec![supporting(0.5), supporting(0.5), supporting(0.5)];
        assert!((update(0.2, &batch) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_ingest_records_deltas() {
        let t = BandThresholds::default();
        let mut h = Hypothesis::new("org:acme", "procurement", 0.2, 1.0, &t, 0);
        let evidence = ingest(&mut h, vec![supporting(0.5), supporting(0.5)], 2, &t);

        assert_eq!(evidence.len(), 2);
        assert!((evidence[0].confidence_delta - 0.4).abs() < 1e-9);
        assert!((evidence[1].confidence_delta - 0.2).abs() < 1e-9);
        assert!(evidence.iter().all(|e| e.pass_number == 2 && e.hypothesis_id == h.id));
        assert_eq!(h.evidence_ids(), &[evidence[0].id, evidence[1].id]);
    }

    #[test]
    fn test_contradiction_clamps_at_zero() {
        let contradicting = Observation::new("web_search", "denial", 0, 1.0, Polarity::Contradicts);
        assert_eq!(update(0.1, &[contradicting]), 0.0);
    }

    #[test]
    fn test_replay_matches_ingest() {
        let t = BandThresholds::default();
        let mut h = Hypothesis::new("org:acme", "procurement", 0.15, 1.0, &t, 0);
        let mut log = ingest(&mut h, vec![supporting(0.4)], 1, &t);
        log.extend(ingest(
            &mut h,
            vec![Observation::new("knowledge_graph", "no link", 0, 0.3, Polarity::Contradicts), supporting(0.7)],
            2,
            &t,
        ));

        assert!((replay(h.prior_confidence(), &log) - h.confidence()).abs() < 1e-12);
        assert!((recompute(h.prior_confidence(), &log) - h.confidence()).abs() < 1e-12);
    }
}
