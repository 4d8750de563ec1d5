//! Cluster grouping and health

use crate::hypothesis::Hypothesis;
use crate::outcome::{Outcome, OutcomeRecord};

/// Group of hypotheses sharing a similarity key
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Similarity key
    pub cluster_id: String,
    /// Hypotheses in the cluster
    pub hypothesis_count: usize,
    /// Mean confidence of the members
    pub mean_confidence: f64,
    /// Recorded outcomes of the members
    pub outcome_count: usize,
    /// Share of outcomes that were ACCEPT
    pub accept_rate: f64,
}

impl Cluster {
    /// Similarity key for a category and an optional grouping attribute value
    ///
    /// `key("procurement", Some("Health Care"))` is `"procurement/health-care"`.
    pub fn key(category: &str, attribute: Option<&str>) -> String {
        match attribute.map(slug).filter(|s| !s.is_empty()) {
            Some(value) => format!("{}/{}", category, value),
            None => category.to_string(),
        }
    }

    /// Aggregate health over members and their outcomes
    pub fn from_members(cluster_id: impl Into<String>, members: &[&Hypothesis], outcomes: &[&OutcomeRecord]) -> Self {
        let hypothesis_count = members.len();
        let mean_confidence = if members.is_empty() {
            0.0
        } else {
            members.iter().map(|h| h.confidence()).sum::<f64>() / hypothesis_count as f64
        };
        let outcome_count = outcomes.len();
        let accepted = outcomes.iter().filter(|o| o.outcome == Outcome::Accept).count();
        let accept_rate = if outcome_count == 0 {
            0.0
        } else {
            accepted as f64 / outcome_count as f64
        };

        Self {
            cluster_id: cluster_id.into(),
            hypothesis_count,
            mean_confidence,
            outcome_count,
            accept_rate,
        }
    }
}

fn slug(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
