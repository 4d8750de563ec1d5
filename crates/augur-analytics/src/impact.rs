//! Evidence impact per source type
//!
//! Which evidence types move confidence the most; used to calibrate the
//! configured information values.

use augur_domain::Evidence;
use serde::Serialize;
use std::collections::BTreeMap;

/// Impact of one source type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceImpact {
    /// Source type
    pub source_type: String,
    /// Evidence entries
    pub count: usize,
    /// Mean signed confidence delta
    pub mean_delta: f64,
    /// Mean absolute confidence delta
    pub mean_abs_delta: f64,
    /// Mean information value
    pub mean_information_value: f64,
}

/// Impact per source type, largest mean delta first, ties by name
pub fn evidence_impact(evidence: &[Evidence]) -> Vec<EvidenceImpact> {
    let mut sums: BTreeMap<&str, (usize, f64, f64, f64)> = BTreeMap::new();
    for e in evidence {
        let s = sums.entry(e.source_type.as_str()).or_insert((0, 0.0, 0.0, 0.0));
        s.0 += 1;
        s.1 += e.confidence_delta;
        s.2 += e.confidence_delta.abs();
        s.3 += e.information_value;
    }

    let mut impact: Vec<EvidenceImpact> = sums
        .into_iter()
        .map(|(source_type, (count, delta, abs, iv))| {
            let n = count as f64;
            EvidenceImpact {
                source_type: source_type.to_string(),
                count,
                mean_delta: delta / n,
                mean_abs_delta: abs / n,
                mean_information_value: iv / n,
            }
        })
        .collect();
    impact.sort_by(|a, b| {
        b.mean_delta
            .total_cmp(&a.mean_delta)
            .then_with(|| a.source_type.cmp(&b.source_type))
    });
    impact
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_domain::{EvidenceId, HypothesisId, Polarity};

    fn entry(source_type: &str, delta: f64, iv: f64) -> Evidence {
        Evidence {
            id: EvidenceId::new(),
            hypothesis_id: HypothesisId::new(),
            source_type: source_type.to_string(),
            payload_summary: "x".to_string(),
            source_url: None,
            observed_at: 0,
            information_value: iv,
            polarity: if delta < 0.0 { Polarity::Contradicts } else { Polarity::Supports },
            confidence_delta: delta,
            pass_number: 1,
            rationale: None,
        }
    }

    #[test]
    fn test_ordering_and_means() {
        let evidence = vec![
            entry("web_search", 0.2, 0.5),
            entry("web_search", -0.16, 0.5),
            entry("knowledge_graph", 0.3, 0.4),
            entry("signal", 0.05, 0.3),
            entry("alpha", 0.05, 0.3),
        ];
        let impact = evidence_impact(&evidence);
        let order: Vec<&str> = impact.iter().map(|i| i.source_type.as_str()).collect();
        assert_eq!(order, vec!["knowledge_graph", "alpha", "signal", "web_search"]);

        let web = &impact[3];
        assert_eq!(web.count, 2);
        assert!((web.mean_delta - 0.02).abs() < 1e-12);
        assert!((web.mean_abs_delta - 0.18).abs() < 1e-12);
        assert!((web.mean_information_value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty() {
        assert!(evidence_impact(&[]).is_empty());
    }
}
