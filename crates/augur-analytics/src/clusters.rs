//! Cluster health

use augur_domain::{Cluster, Hypothesis, OutcomeRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Cluster id used for hypotheses without one
pub const UNCLUSTERED: &str = "unclustered";

/// Health of one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterHealth {
    /// Similarity key
    pub cluster_id: String,
    /// Hypotheses in the cluster, any status
    pub hypothesis_count: usize,
    /// Mean confidence of the members
    pub mean_confidence: f64,
    /// Recorded outcomes of the members
    pub outcome_count: usize,
    /// ACCEPT share of recorded outcomes
    pub accept_rate: f64,
}

impl From<Cluster> for ClusterHealth {
    fn from(cluster: Cluster) -> Self {
        Self {
            cluster_id: cluster.cluster_id,
            hypothesis_count: cluster.hypothesis_count,
            mean_confidence: cluster.mean_confidence,
            outcome_count: cluster.outcome_count,
            accept_rate: cluster.accept_rate,
        }
    }
}

/// Health per cluster, ordered by cluster id
///
/// Outcomes are grouped by the cluster recorded on them.
pub fn cluster_health(hypotheses: &[Hypothesis], outcomes: &[OutcomeRecord]) -> Vec<ClusterHealth> {
    let mut members: BTreeMap<&str, Vec<&Hypothesis>> = BTreeMap::new();
    for h in hypotheses {
        members.entry(h.cluster_id.as_deref().unwrap_or(UNCLUSTERED)).or_default().push(h);
    }
    let mut recorded: BTreeMap<&str, Vec<&OutcomeRecord>> = BTreeMap::new();
    for o in outcomes {
        recorded.entry(o.cluster_id.as_deref().unwrap_or(UNCLUSTERED)).or_default().push(o);
    }

    let mut ids: Vec<&str> = members.keys().chain(recorded.keys()).copied().collect();
    ids.sort_unstable();
    ids.dedup();

    ids.into_iter()
        .map(|id| {
            let m = members.get(id).map(Vec::as_slice).unwrap_or(&[]);
            let o = recorded.get(id).map(Vec::as_slice).unwrap_or(&[]);
            Cluster::from_members(id, m, o).into()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_domain::{BandThresholds, Outcome};

    fn member(cluster: Option<&str>, confidence: f64) -> Hypothesis {
        let t = BandThresholds::default();
        let mut h = Hypothesis::new("org:acme", "procurement", 0.1, 1.0, &t, 0);
        if let Some(c) = cluster {
            h = h.with_cluster(c);
        }
        h.apply_confidence(confidence, &t);
        h
    }

    fn outcome(h: &Hypothesis, outcome: Outcome) -> OutcomeRecord {
        OutcomeRecord {
            hypothesis_id: h.id,
            entity_id: h.entity_id.clone(),
            category: h.category.clone(),
            cluster_id: h.cluster_id.clone(),
            outcome,
            effectiveness_score: 0.5,
            source_types: vec![],
            recorded_at: 0,
        }
    }

    #[test]
    fn test_groups_and_unclustered() {
        let a = member(Some("procurement/health"), 0.2);
        let b = member(Some("procurement/health"), 0.6);
        let c = member(None, 0.5);
        let outcomes = vec![outcome(&a, Outcome::Accept), outcome(&b, Outcome::Reject)];

        let health = cluster_health(&[a, b, c], &outcomes);
        assert_eq!(health.len(), 2);

        let health_cluster = &health[0];
        assert_eq!(health_cluster.cluster_id, "procurement/health");
        assert_eq!(health_cluster.hypothesis_count, 2);
        assert!((health_cluster.mean_confidence - 0.4).abs() < 1e-12);
        assert_eq!(health_cluster.outcome_count, 2);
        assert_eq!(health_cluster.accept_rate, 0.5);

        assert_eq!(health[1].cluster_id, UNCLUSTERED);
        assert_eq!(health[1].outcome_count, 0);
        assert_eq!(health[1].accept_rate, 0.0);
    }
}
