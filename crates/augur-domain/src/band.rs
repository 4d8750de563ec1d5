//! Band module - discrete confidence tiers and the band classifier
//!
//! A band is never stored independently of confidence: every band in the
//! system comes from [`BandThresholds::classify`].

use crate::hypothesis::{Hypothesis, HypothesisStatus};
use std::fmt;

/// Confidence band of a hypothesis
///
/// Bands are ordered from least to most mature:
/// - Exploratory: barely supported, worth probing
/// - Informed: some corroboration
/// - Confident: strong corroboration
/// - Conviction: mature enough to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    /// Below the informed threshold
    Exploratory,

    /// Between the informed and confident thresholds
    Informed,

    /// Between the confident and conviction thresholds
    Confident,

    /// At or above the conviction threshold
    Conviction,
}

impl Band {
    /// All bands in ascending order
    pub const ALL: [Band; 4] = [Band::Exploratory, Band::Informed, Band::Confident, Band::Conviction];

    /// Get the band name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Exploratory => "EXPLORATORY",
            Band::Informed => "INFORMED",
            Band::Confident => "CONFIDENT",
            Band::Conviction => "CONVICTION",
        }
    }

    /// Parse a band from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "EXPLORATORY" => Some(Band::Exploratory),
            "INFORMED" => Some(Band::Informed),
            "CONFIDENT" => Some(Band::Confident),
            "CONVICTION" => Some(Band::Conviction),
            _ => None,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid band: {}", s))
    }
}

/// Error returned when band thresholds are not strictly increasing inside (0, 1)
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdError(pub String);

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid band thresholds: {}", self.0)
    }
}

impl std::error::Error for ThresholdError {}

/// Lower bounds of the three upper bands
///
/// `EXPLORATORY < informed <= INFORMED < confident <= CONFIDENT < conviction <= CONVICTION`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    /// Lower bound of the Informed band
    pub informed: f64,
    /// Lower bound of the Confident band
    pub confident: f64,
    /// Lower bound of the Conviction band
    pub conviction: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            informed: 0.30,
            confident: 0.60,
            conviction: 0.80,
        }
    }
}

impl BandThresholds {
    /// Create validated thresholds
    pub fn new(informed: f64, confident: f64, conviction: f64) -> Result<Self, ThresholdError> {
        let thresholds = Self {
            informed,
            confident,
            conviction,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Check that thresholds are finite, inside (0, 1) and strictly increasing
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [
            ("informed", self.informed),
            ("confident", self.confident),
            ("conviction", self.conviction),
        ] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(ThresholdError(format!("{} must lie in (0, 1), got {}", name, value)));
            }
        }
        if !(self.informed < self.confident && self.confident < self.conviction) {
            return Err(ThresholdError(format!(
                "thresholds must be strictly increasing, got {} / {} / {}",
                self.informed, self.confident, self.conviction
            )));
        }
        Ok(())
    }

    /// Classify a confidence value into its band
    pub fn classify(&self, confidence: f64) -> Band {
        if confidence >= self.conviction {
            Band::Conviction
        } else if confidence >= self.confident {
            Band::Confident
        } else if confidence >= self.informed {
            Band::Informed
        } else {
            Band::Exploratory
        }
    }
}

/// Advisory flag raised by the band classifier
///
/// Flags never change status on their own; they are consumed by whoever
/// records outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisoryFlag {
    /// Reached Conviction with enough evidentiary passes
    PromotionCandidate,

    /// Fell to the rejection floor with enough evidentiary passes
    RejectionCandidate,

    /// Consumed all passes without resolving
    PassBudgetExhausted,
}

impl AdvisoryFlag {
    /// Get the flag name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisoryFlag::PromotionCandidate => "promotion_candidate",
            AdvisoryFlag::RejectionCandidate => "rejection_candidate",
            AdvisoryFlag::PassBudgetExhausted => "pass_budget_exhausted",
        }
    }

    /// Parse a flag from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "promotion_candidate" => Some(AdvisoryFlag::PromotionCandidate),
            "rejection_candidate" => Some(AdvisoryFlag::RejectionCandidate),
            "pass_budget_exhausted" => Some(AdvisoryFlag::PassBudgetExhausted),
            _ => None,
        }
    }
}

/// Retirement rules applied after every confidence update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetirementPolicy {
    /// Maximum evaluation passes per hypothesis
    pub max_passes: u32,
    /// Passes required before a Conviction hypothesis is flagged for promotion
    pub promotion_min_passes: u32,
    /// Confidence at or below which a hypothesis is flagged for rejection
    pub rejection_floor: f64,
    /// Passes required before the rejection flag can be raised
    pub rejection_min_passes: u32,
}

impl Default for RetirementPolicy {
    fn default() -> Self {
        Self {
            max_passes: 4,
            promotion_min_passes: 2,
            rejection_floor: 0.05,
            rejection_min_passes: 2,
        }
    }
}

impl RetirementPolicy {
    /// Advisory flag for an active hypothesis, if any applies
    ///
    /// Promotion wins over rejection, rejection over exhaustion.
    pub fn advise(&self, hypothesis: &Hypothesis) -> Option<AdvisoryFlag> {
        if hypothesis.status() != HypothesisStatus::Active {
            return None;
        }
        let passes = hypothesis.pass_count();
        if hypothesis.band() == Band::Conviction && passes >= self.promotion_min_passes {
            Some(AdvisoryFlag::PromotionCandidate)
        } else if hypothesis.confidence() <= self.rejection_floor && passes >= self.rejection_min_passes {
            Some(AdvisoryFlag::RejectionCandidate)
        } else if passes >= self.max_passes {
            Some(AdvisoryFlag::PassBudgetExhausted)
        } else {
            None
        }
    }

    /// Whether the pass budget is spent with the hypothesis still Exploratory
    pub fn rejects_on_exhaustion(&self, hypothesis: &Hypothesis) -> bool {
        hypothesis.status() == HypothesisStatus::Active
            && hypothesis.pass_count() >= self.max_passes
            && hypothesis.band() == Band::Exploratory
    }

    /// Whether the hypothesis may be selected for another pass
    pub fn has_passes_left(&self, hypothesis: &Hypothesis) -> bool {
        hypothesis.pass_count() < self.max_passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_ordered_low_to_high() {
        assert!(Band::ALL.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Band::ALL.first(), Some(&Band::Exploratory));
        assert_eq!(Band::ALL.last(), Some(&Band::Conviction));
    }

    #[test]
    fn test_band_parse() {
        assert_eq!(Band::parse("informed"), Some(Band::Informed));
        assert_eq!("CONVICTION".parse::<Band>().unwrap(), Band::Conviction);
        assert!(Band::parse("certain").is_none());
    }

    #[test]
    fn test_classify_default_thresholds() {
        let t = BandThresholds::default();
        assert_eq!(t.classify(0.0), Band::Exploratory);
        assert_eq!(t.classify(0.29), Band::Exploratory);
        assert_eq!(t.classify(0.30), Band::Informed);
        assert_eq!(t.classify(0.59), Band::Informed);
        assert_eq!(t.classify(0.60), Band::Confident);
        assert_eq!(t.classify(0.80), Band::Conviction);
        assert_eq!(t.classify(1.0), Band::Conviction);
        assert_eq!(t.classify(f64::NAN), Band::Exploratory);
    }

    #[test]
    fn test_thresholds_must_increase() {
        assert!(BandThresholds::new(0.3, 0.6, 0.8).is_ok());
        assert!(BandThresholds::new(0.6, 0.3, 0.8).is_err());
        assert!(BandThresholds::new(0.3, 0.3, 0.8).is_err());
        assert!(BandThresholds::new(0.0, 0.5, 0.8).is_err());
        assert!(BandThresholds::new(0.3, 0.5, 1.0).is_err());
        assert!(BandThresholds::new(f64::NAN, 0.5, 0.8).is_err());
    }

    #[test]
    fn test_flag_parse_roundtrip() {
        for flag in [
            AdvisoryFlag::PromotionCandidate,
            AdvisoryFlag::RejectionCandidate,
            AdvisoryFlag::PassBudgetExhausted,
        ] {
            assert_eq!(AdvisoryFlag::parse(flag.as_str()), Some(flag));
        }
    }
}
