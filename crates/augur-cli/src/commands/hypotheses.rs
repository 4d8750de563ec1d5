//! Hypotheses command implementation.

use crate::app::{with_store, CliEngine};
use crate::cli::HypothesesArgs;
use crate::error::Result;
use crate::output::Formatter;
use augur_domain::traits::{EngineStore, HypothesisQuery};
use augur_domain::{Hypothesis, HypothesisId};
use augur_engine::Priority;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Execute the hypotheses command.
///
/// Eligible hypotheses come first in selection order with their EIG; the
/// rest follow, most recently updated first.
pub fn execute_hypotheses(args: HypothesesArgs, engine: &CliEngine, formatter: &Formatter) -> Result<()> {
    let query = HypothesisQuery {
        status: args.status.map(Into::into),
        entity_id: args.entity,
        category: args.category,
        ..Default::default()
    };
    let mut hypotheses = with_store(engine, |s| s.query_hypotheses(&query))?;
    let priorities = engine.priorities()?;

    order_by_priority(&mut hypotheses, &priorities);
    if let Some(limit) = args.limit {
        hypotheses.truncate(limit);
    }

    let eig: HashMap<HypothesisId, f64> = priorities.iter().map(|p| (p.hypothesis_id, p.eig)).collect();
    println!("{}", formatter.hypotheses(&hypotheses, &eig)?);
    Ok(())
}

fn order_by_priority(hypotheses: &mut [Hypothesis], priorities: &[Priority]) {
    let rank: HashMap<HypothesisId, usize> =
        priorities.iter().enumerate().map(|(i, p)| (p.hypothesis_id, i)).collect();
    hypotheses.sort_by(|a, b| match (rank.get(&a.id), rank.get(&b.id)) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_domain::BandThresholds;

    fn at(updated_at: u64) -> Hypothesis {
        let mut h = Hypothesis::new("org:acme", "procurement", 0.1, 1.0, &BandThresholds::default(), 0);
        h.updated_at = updated_at;
        h
    }

    fn priority(h: &Hypothesis, eig: f64) -> Priority {
        Priority {
            hypothesis_id: h.id,
            eig,
            information_value_estimate: 0.5,
            last_observed_at: None,
        }
    }

    #[test]
    fn test_ranked_first_then_recent() {
        let old = at(10);
        let recent = at(20);
        let low = at(5);
        let high = at(1);
        let priorities = vec![priority(&high, 0.4), priority(&low, 0.1)];

        let mut hypotheses = vec![old.clone(), low.clone(), recent.clone(), high.clone()];
        order_by_priority(&mut hypotheses, &priorities);

        let ids: Vec<HypothesisId> = hypotheses.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![high.id, low.id, recent.id, old.id]);
    }
}
