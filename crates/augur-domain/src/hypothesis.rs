//! Hypothesis module - the central entity of the engine

use crate::band::{AdvisoryFlag, Band, BandThresholds};
use crate::id::{EvidenceId, HypothesisId};
use std::fmt;

/// Lifecycle status of a hypothesis
///
/// `Active` is the only non-terminal status. Transitions go
/// `Active -> {Promoted, Rejected, Escalated}` and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HypothesisStatus {
    /// Still under investigation
    Active,
    /// Accepted by an outcome
    Promoted,
    /// Rejected by an outcome or by exhausting its passes
    Rejected,
    /// Moved too far in a single pass; handed to a reviewer
    Escalated,
}

impl HypothesisStatus {
    /// All statuses, active first
    pub const ALL: [HypothesisStatus; 4] = [
        HypothesisStatus::Active,
        HypothesisStatus::Promoted,
        HypothesisStatus::Rejected,
        HypothesisStatus::Escalated,
    ];

    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            HypothesisStatus::Active => "ACTIVE",
            HypothesisStatus::Promoted => "PROMOTED",
            HypothesisStatus::Rejected => "REJECTED",
            HypothesisStatus::Escalated => "ESCALATED",
        }
    }

    /// Parse a status from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(HypothesisStatus::Active),
            "PROMOTED" => Some(HypothesisStatus::Promoted),
            "REJECTED" => Some(HypothesisStatus::Rejected),
            "ESCALATED" => Some(HypothesisStatus::Escalated),
            _ => None,
        }
    }

    /// Whether the status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HypothesisStatus::Active)
    }
}

impl fmt::Display for HypothesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HypothesisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid status: {}", s))
    }
}

/// Rejected status transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    /// Status before the attempted transition
    pub from: HypothesisStatus,
    /// Requested status
    pub to: HypothesisStatus,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid status transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// Everything needed to rebuild a hypothesis from storage
///
/// The band is deliberately absent: it is recomputed from `confidence`.
#[derive(Debug, Clone, PartialEq)]
pub struct HypothesisParts {
    /// Identifier
    pub id: HypothesisId,
    /// Subject organization or actor
    pub entity_id: String,
    /// Free-text classification
    pub category: String,
    /// Similarity group
    pub cluster_id: Option<String>,
    /// Confidence at creation, before any evidence
    pub prior_confidence: f64,
    /// Current confidence
    pub confidence: f64,
    /// Current novelty
    pub novelty: f64,
    /// Passes consumed
    pub pass_count: u32,
    /// Contributing evidence, in append order
    pub evidence_ids: Vec<EvidenceId>,
    /// Lifecycle status
    pub status: HypothesisStatus,
    /// Advisory flag, if raised
    pub flag: Option<AdvisoryFlag>,
    /// Compare-and-set version
    pub version: u64,
    /// Creation timestamp (seconds)
    pub created_at: u64,
    /// Last mutation timestamp (seconds)
    pub updated_at: u64,
}

/// A tracked claim about an entity
///
/// Confidence, band, status, pass count and the evidence list are private:
/// they only move through the methods below so the band always equals the
/// classification of the confidence and the evidence list only grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Unique identifier
    pub id: HypothesisId,

    /// Subject organization or actor
    pub entity_id: String,

    /// Free-text classification, e.g. "digital-transformation"
    pub category: String,

    /// Similarity group used for cluster health rollups
    pub cluster_id: Option<String>,

    /// Decays as the same signal pattern repeats across the population
    pub novelty: f64,

    /// Advisory flag raised by the band classifier
    pub flag: Option<AdvisoryFlag>,

    /// Compare-and-set version, bumped by the store on every update
    pub version: u64,

    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,

    /// Last mutation timestamp (seconds since Unix epoch)
    pub updated_at: u64,

    prior_confidence: f64,
    confidence: f64,
    band: Band,
    pass_count: u32,
    evidence_ids: Vec<EvidenceId>,
    status: HypothesisStatus,
}

impl Hypothesis {
    /// Create a new active hypothesis with no evidence
    pub fn new(
        entity_id: impl Into<String>,
        category: impl Into<String>,
        prior_confidence: f64,
        novelty: f64,
        thresholds: &BandThresholds,
        created_at: u64,
    ) -> Self {
        let prior = clamp_unit(prior_confidence);
        Self {
            id: HypothesisId::new(),
            entity_id: entity_id.into(),
            category: category.into(),
            cluster_id: None,
            novelty: clamp_unit(novelty),
            flag: None,
            version: 0,
            created_at,
            updated_at: created_at,
            prior_confidence: prior,
            confidence: prior,
            band: thresholds.classify(prior),
            pass_count: 0,
            evidence_ids: Vec::new(),
            status: HypothesisStatus::Active,
        }
    }

    /// Rebuild a hypothesis from stored parts, classifying its band
    pub fn restore(parts: HypothesisParts, thresholds: &BandThresholds) -> Self {
        let confidence = clamp_unit(parts.confidence);
        Self {
            id: parts.id,
            entity_id: parts.entity_id,
            category: parts.category,
            cluster_id: parts.cluster_id,
            novelty: clamp_unit(parts.novelty),
            flag: parts.flag,
            version: parts.version,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            prior_confidence: clamp_unit(parts.prior_confidence),
            confidence,
            band: thresholds.classify(confidence),
            pass_count: parts.pass_count,
            evidence_ids: parts.evidence_ids,
            status: parts.status,
        }
    }

    /// Attach a cluster id (builder style)
    pub fn with_cluster(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Current confidence in [0, 1]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Confidence before any evidence was applied
    pub fn prior_confidence(&self) -> f64 {
        self.prior_confidence
    }

    /// Current band
    pub fn band(&self) -> Band {
        self.band
    }

    /// Evaluation passes consumed
    pub fn pass_count(&self) -> u32 {
        self.pass_count
    }

    /// Contributing evidence, oldest first
    pub fn evidence_ids(&self) -> &[EvidenceId] {
        &self.evidence_ids
    }

    /// Lifecycle status
    pub fn status(&self) -> HypothesisStatus {
        self.status
    }

    /// Whether the hypothesis is still under investigation
    pub fn is_active(&self) -> bool {
        self.status == HypothesisStatus::Active
    }

    /// Set a new confidence and reclassify the band
    ///
    /// Values are clamped to [0, 1]; non-finite values leave the hypothesis
    /// untouched. Returns the band after the update.
    pub fn apply_confidence(&mut self, confidence: f64, thresholds: &BandThresholds) -> Band {
        if confidence.is_finite() {
            self.confidence = confidence.clamp(0.0, 1.0);
            self.band = thresholds.classify(self.confidence);
        }
        self.band
    }

    /// Move to a terminal status
    pub fn transition(&mut self, to: HypothesisStatus) -> Result<(), TransitionError> {
        if self.status.is_terminal() || !to.is_terminal() {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Append an evidence id
    pub fn attach_evidence(&mut self, id: EvidenceId) {
        self.evidence_ids.push(id);
    }

    /// Count one consumed evaluation pass
    pub fn record_pass(&mut self) {
        self.pass_count = self.pass_count.saturating_add(1);
    }

    /// Decompose into stored parts
    pub fn to_parts(&self) -> HypothesisParts {
        HypothesisParts {
            id: self.id,
            entity_id: self.entity_id.clone(),
            category: self.category.clone(),
            cluster_id: self.cluster_id.clone(),
            prior_confidence: self.prior_confidence,
            confidence: self.confidence,
            novelty: self.novelty,
            pass_count: self.pass_count,
            evidence_ids: self.evidence_ids.clone(),
            status: self.status,
            flag: self.flag,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Hypothesis {
        Hypothesis::new("org:acme", "digital-transformation", 0.2, 1.0, &BandThresholds::default(), 1000)
    }

    #[test]
    fn test_new_hypothesis_is_active_exploratory() {
        let h = sample();
        assert!(h.is_active());
        assert_eq!(h.band(), Band::Exploratory);
        assert_eq!(h.pass_count(), 0);
        assert!(h.evidence_ids().is_empty());
        assert_eq!(h.prior_confidence(), 0.2);
    }

    #[test]
    fn test_apply_confidence_reclassifies() {
        let mut h = sample();
        let t = BandThresholds::default();
        assert_eq!(h.apply_confidence(0.65, &t), Band::Confident);
        assert_eq!(h.band(), t.classify(h.confidence()));
        assert_eq!(h.apply_confidence(1.7, &t), Band::Conviction);
        assert_eq!(h.confidence(), 1.0);
        h.apply_confidence(f64::NAN, &t);
        assert_eq!(h.confidence(), 1.0);
    }

    #[test]
    fn test_terminal_status_never_reverses() {
        let mut h = sample();
        assert!(h.transition(HypothesisStatus::Active).is_err());
        assert!(h.transition(HypothesisStatus::Escalated).is_ok());
        let err = h.transition(HypothesisStatus::Promoted).unwrap_err();
        assert_eq!(err.from, HypothesisStatus::Escalated);
        assert!(h.transition(HypothesisStatus::Active).is_err());
        assert_eq!(h.status(), HypothesisStatus::Escalated);
    }

    #[test]
    fn test_restore_ignores_stale_band() {
        let mut h = sample();
        h.apply_confidence(0.7, &BandThresholds::default());
        let strict = BandThresholds::new(0.5, 0.75, 0.9).unwrap();
        let restored = Hypothesis::restore(h.to_parts(), &strict);
        assert_eq!(restored.band(), Band::Informed);
        assert_eq!(restored.confidence(), h.confidence());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(HypothesisStatus::parse("escalated"), Some(HypothesisStatus::Escalated));
        assert!(HypothesisStatus::parse("deleted").is_none());
        assert!(HypothesisStatus::Rejected.is_terminal());
        assert!(!HypothesisStatus::Active.is_terminal());
    }
}
