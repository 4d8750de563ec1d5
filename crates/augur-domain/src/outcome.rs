//! Outcomes and audit records

use crate::band::Band;
use crate::hypothesis::HypothesisStatus;
use crate::id::HypothesisId;
use std::fmt;

/// Decision recorded by whoever consumes promotion and rejection flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Hypothesis confirmed
    Accept,
    /// Hypothesis partially confirmed
    WeakAccept,
    /// Hypothesis refuted
    Reject,
}

impl Outcome {
    /// All outcomes
    pub const ALL: [Outcome; 3] = [Outcome::Accept, Outcome::WeakAccept, Outcome::Reject];

    /// Get the outcome name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Accept => "ACCEPT",
            Outcome::WeakAccept => "WEAK_ACCEPT",
            Outcome::Reject => "REJECT",
        }
    }

    /// Parse an outcome (case-insensitive, `-` and `_` interchangeable)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "ACCEPT" | "ACCEPTED" => Some(Outcome::Accept),
            "WEAK_ACCEPT" | "WEAK" => Some(Outcome::WeakAccept),
            "REJECT" | "REJECTED" => Some(Outcome::Reject),
            _ => None,
        }
    }

    /// Weight of the outcome in learning feedback
    pub fn weight(&self) -> f64 {
        match self {
            Outcome::Accept => 1.0,
            Outcome::WeakAccept => 0.5,
            Outcome::Reject => 0.0,
        }
    }

    /// Terminal status an active hypothesis moves to
    pub fn target_status(&self) -> HypothesisStatus {
        match self {
            Outcome::Accept | Outcome::WeakAccept => HypothesisStatus::Promoted,
            Outcome::Reject => HypothesisStatus::Rejected,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid outcome: {}", s))
    }
}

/// Durable outcome of one hypothesis, keyed by category for feedback
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    /// Hypothesis the outcome belongs to
    pub hypothesis_id: HypothesisId,
    /// Subject of the hypothesis
    pub entity_id: String,
    /// Category of the hypothesis
    pub category: String,
    /// Cluster of the hypothesis at the time of the outcome
    pub cluster_id: Option<String>,
    /// Recorded decision
    pub outcome: Outcome,
    /// How effective acting on the hypothesis was [0, 1]
    pub effectiveness_score: f64,
    /// Distinct evidence source types that contributed
    pub source_types: Vec<String>,
    /// When the outcome was recorded (seconds)
    pub recorded_at: u64,
}

/// Audit entry for a pass that skipped bands
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    /// Escalated hypothesis
    pub hypothesis_id: HypothesisId,
    /// Pass in which the jump happened
    pub pass_number: u32,
    /// Confidence before the pass
    pub confidence_before: f64,
    /// Confidence after the pass
    pub confidence_after: f64,
    /// Band before the pass
    pub band_before: Band,
    /// Band after the pass
    pub band_after: Band,
    /// When the anomaly was recorded (seconds)
    pub recorded_at: u64,
    /// Human-readable note
    pub note: String,
}

impl AnomalyRecord {
    /// Absolute confidence movement of the pass
    pub fn jump(&self) -> f64 {
        (self.confidence_after - self.confidence_before).abs()
    }
}
