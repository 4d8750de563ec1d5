//! Lifecycle funnel

use augur_domain::{Band, Hypothesis, HypothesisStatus};
use serde::Serialize;

/// Hypothesis counts at each lifecycle stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleFunnel {
    /// Every hypothesis ever created
    pub created: usize,
    /// At least one evaluation pass
    pub investigated: usize,
    /// Band CONFIDENT or higher
    pub matured: usize,
    /// Status PROMOTED
    pub promoted: usize,
    /// Status REJECTED
    pub rejected: usize,
    /// Status ESCALATED
    pub escalated: usize,
    /// Status ACTIVE
    pub active: usize,
}

/// Funnel over the whole population
pub fn lifecycle_funnel(hypotheses: &[Hypothesis]) -> LifecycleFunnel {
    hypotheses.iter().fold(LifecycleFunnel::default(), |mut f, h| {
        f.created += 1;
        if h.pass_count() >= 1 {
            f.investigated += 1;
        }
        if h.band() >= Band::Confident {
            f.matured += 1;
        }
        match h.status() {
            HypothesisStatus::Active => f.active += 1,
            HypothesisStatus::Promoted => f.promoted += 1,
            HypothesisStatus::Rejected => f.rejected += 1,
            HypothesisStatus::Escalated => f.escalated += 1,
        }
        f
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_domain::BandThresholds;

    #[test]
    fn test_stages() {
        let t = BandThresholds::default();
        let fresh = Hypothesis::new("a", "c", 0.1, 1.0, &t, 0);

        let mut worked = Hypothesis::new("b", "c", 0.1, 1.0, &t, 0);
        worked.record_pass();
        worked.apply_confidence(0.65, &t);

        let mut promoted = Hypothesis::new("c", "c", 0.1, 1.0, &t, 0);
        promoted.record_pass();
        promoted.apply_confidence(0.9, &t);
        promoted.transition(HypothesisStatus::Promoted).unwrap();

        let mut rejected = Hypothesis::new("d", "c", 0.1, 1.0, &t, 0);
        rejected.transition(HypothesisStatus::Rejected).unwrap();

        let funnel = lifecycle_funnel(&[fresh, worked, promoted, rejected]);
        assert_eq!(
            funnel,
            LifecycleFunnel {
                created: 4,
                investigated: 2,
                matured: 2,
                promoted: 1,
                rejected: 1,
                escalated: 0,
                active: 2,
            }
        );
    }
}
