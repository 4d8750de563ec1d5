//! Configuration for the evaluation engine
//!
//! Every threshold, budget and weight the engine uses lives here with
//! validated bounds. Partial TOML files are accepted; missing keys take
//! their defaults.

use crate::error::EngineError;
use augur_domain::{source_types, BandThresholds, RetirementPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const SECS_PER_DAY: u64 = 86_400;

/// Configuration for the evaluation engine
///
/// # Examples
///
/// ```
/// use augur_engine::EngineConfig;
///
/// // Default configuration (balanced)
/// let config = EngineConfig::default();
/// assert_eq!(config.max_passes, 4);
/// assert_eq!(config.top_k, 10);
///
/// // Partial TOML keeps defaults for everything omitted
/// let config = EngineConfig::from_toml("max_passes = 6\nconviction = 0.9").unwrap();
/// assert_eq!(config.max_passes, 6);
/// assert_eq!(config.informed, 0.30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower bound of the INFORMED band
    /// Default: 0.30
    pub informed: f64,

    /// Lower bound of the CONFIDENT band
    /// Default: 0.60
    pub confident: f64,

    /// Lower bound of the CONVICTION band; hypotheses at or above it are not investigated
    /// Default: 0.80
    pub conviction: f64,

    /// Maximum evaluation passes per hypothesis
    /// Default: 4
    pub max_passes: u32,

    /// Hypotheses selected per pass
    /// Default: 10
    pub top_k: usize,

    /// Hypotheses enriched concurrently within a pass
    /// Default: 4
    pub enrichment_concurrency: usize,

    /// Hard timeout for a single collaborator call (milliseconds)
    /// Default: 5000
    pub call_timeout_ms: u64,

    /// Retries after a transient collaborator failure
    /// Default: 2
    pub transient_retries: u32,

    /// Initial backoff between retries, doubled per attempt (milliseconds)
    /// Default: 200
    pub retry_backoff_ms: u64,

    /// Wall-clock budget for one cycle (seconds)
    /// Default: 300
    pub cycle_budget_secs: u64,

    /// Extra lease lifetime beyond the cycle budget (seconds)
    /// Default: 30
    pub lease_grace_secs: u64,

    /// Confidence rise within one pass that escalates a hypothesis
    /// Default: 0.5
    pub escalation_delta: f64,

    /// Starting confidence of new hypotheses
    /// Default: 0.10
    pub prior_confidence: f64,

    /// Novelty multiplier applied per repetition of a signal pattern
    /// Default: 0.8
    pub novelty_decay: f64,

    /// Novelty never decays below this value
    /// Default: 0.05
    pub min_novelty: f64,

    /// Passes before a CONVICTION hypothesis is flagged for promotion
    /// Default: 2
    pub promotion_min_passes: u32,

    /// Confidence at or below which a hypothesis is flagged for rejection
    /// Default: 0.05
    pub rejection_floor: f64,

    /// Passes before the rejection flag can be raised
    /// Default: 2
    pub rejection_min_passes: u32,

    /// Documents requested from web search per hypothesis
    /// Default: 5
    pub max_search_results: usize,

    /// Related entities requested from the knowledge graph
    /// Default: 25
    pub graph_result_limit: usize,

    /// Size cap of a reasoning prompt (characters)
    /// Default: 4000
    pub prompt_budget_chars: usize,

    /// Size cap of a signal payload or evidence snippet (characters)
    /// Default: 600
    pub max_snippet_chars: usize,

    /// Most recent outcomes feeding the information value estimates
    /// Default: 500
    pub feedback_window: usize,

    /// Pseudo-count pulling estimates toward their base value
    /// Default: 5.0
    pub feedback_smoothing: f64,

    /// Discount on the estimate once every source type has been observed
    /// Default: 0.5
    pub revisit_factor: f64,

    /// Information value per source type before any history exists
    pub source_information_values: BTreeMap<String, f64>,

    /// How far back episodes count toward temporal context (days)
    /// Default: 180
    pub horizon_days: u64,

    /// Age at which an episode's weight halves (days)
    /// Default: 30
    pub half_life_days: u64,

    /// Episodes listed in a narrative
    /// Default: 10
    pub max_narrative_episodes: usize,

    /// Size cap of a narrative (characters)
    /// Default: 1500
    pub max_narrative_chars: usize,

    /// Adjustment contributed by one fresh episode
    /// Default: 0.05
    pub boost_per_episode: f64,

    /// Cap on the temporal adjustment
    /// Default: 0.25
    pub max_temporal_adjustment: f64,

    /// Knowledge graph attribute used to seed cluster ids
    /// Default: "sector"
    pub cluster_attribute: String,
}

fn default_information_values() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (source_types::SIGNAL.to_string(), 0.3),
        (source_types::KNOWLEDGE_GRAPH.to_string(), 0.4),
        (source_types::WEB_SEARCH.to_string(), 0.5),
    ])
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            informed: 0.30,
            confident: 0.60,
            conviction: 0.80,
            max_passes: 4,
            top_k: 10,
            enrichment_concurrency: 4,
            call_timeout_ms: 5_000,
            transient_retries: 2,
            retry_backoff_ms: 200,
            cycle_budget_secs: 300,
            lease_grace_secs: 30,
            escalation_delta: 0.5,
            prior_confidence: 0.10,
            novelty_decay: 0.8,
            min_novelty: 0.05,
            promotion_min_passes: 2,
            rejection_floor: 0.05,
            rejection_min_passes: 2,
            max_search_results: 5,
            graph_result_limit: 25,
            prompt_budget_chars: 4_000,
            max_snippet_chars: 600,
            feedback_window: 500,
            feedback_smoothing: 5.0,
            revisit_factor: 0.5,
            source_information_values: default_information_values(),
            horizon_days: 180,
            half_life_days: 30,
            max_narrative_episodes: 10,
            max_narrative_chars: 1_500,
            boost_per_episode: 0.05,
            max_temporal_adjustment: 0.25,
            cluster_attribute: "sector".to_string(),
        }
    }
}

impl EngineConfig {
    /// Wide, fast configuration: more hypotheses per pass, shorter budgets
    ///
    /// - Top-K: 25, concurrency 8
    /// - Call timeout: 2 seconds, one retry
    /// - Cycle budget: 2 minutes
    pub fn aggressive() -> Self {
        Self {
            top_k: 25,
            enrichment_concurrency: 8,
            call_timeout_ms: 2_000,
            transient_retries: 1,
            retry_backoff_ms: 100,
            cycle_budget_secs: 120,
            max_search_results: 3,
            feedback_smoothing: 2.0,
            ..Self::default()
        }
    }

    /// Patient configuration for slow collaborators
    ///
    /// - Max passes: 6, top-K 5
    /// - Call timeout: 15 seconds, three retries
    /// - Cycle budget: 15 minutes
    pub fn lenient() -> Self {
        Self {
            max_passes: 6,
            top_k: 5,
            enrichment_concurrency: 2,
            call_timeout_ms: 15_000,
            transient_retries: 3,
            retry_backoff_ms: 500,
            cycle_budget_secs: 900,
            lease_grace_secs: 60,
            max_search_results: 8,
            feedback_smoothing: 10.0,
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) TOML document and validate it
    pub fn from_toml(text: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(text).map_err(|e| EngineError::Config(format!("Invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Check every bound
    pub fn validate(&self) -> Result<(), EngineError> {
        let thresholds = self.thresholds()?;

        positive("max_passes", self.max_passes as u64)?;
        positive("top_k", self.top_k as u64)?;
        positive("enrichment_concurrency", self.enrichment_concurrency as u64)?;
        positive("call_timeout_ms", self.call_timeout_ms)?;
        positive("cycle_budget_secs", self.cycle_budget_secs)?;
        positive("half_life_days", self.half_life_days)?;
        positive("prompt_budget_chars", self.prompt_budget_chars as u64)?;
        positive("max_snippet_chars", self.max_snippet_chars as u64)?;

        if !(self.escalation_delta > 0.0 && self.escalation_delta <= 1.0) {
            return Err(invalid("escalation_delta", "must be in (0, 1]"));
        }
        if !(self.prior_confidence >= 0.0 && self.prior_confidence < thresholds.informed) {
            return Err(invalid("prior_confidence", "must be in [0, informed)"));
        }
        if !(self.rejection_floor >= 0.0 && self.rejection_floor < thresholds.informed) {
            return Err(invalid("rejection_floor", "must be in [0, informed)"));
        }
        if !(self.novelty_decay > 0.0 && self.novelty_decay <= 1.0) {
            return Err(invalid("novelty_decay", "must be in (0, 1]"));
        }
        if !(self.min_novelty > 0.0 && self.min_novelty <= 1.0) {
            return Err(invalid("min_novelty", "must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.revisit_factor) {
            return Err(invalid("revisit_factor", "must be in [0, 1]"));
        }
        if !(self.feedback_smoothing.is_finite() && self.feedback_smoothing >= 0.0) {
            return Err(invalid("feedback_smoothing", "must be a non-negative number"));
        }
        if !(self.boost_per_episode.is_finite() && self.boost_per_episode >= 0.0) {
            return Err(invalid("boost_per_episode", "must be a non-negative number"));
        }
        if !(0.0..=1.0).contains(&self.max_temporal_adjustment) {
            return Err(invalid("max_temporal_adjustment", "must be in [0, 1]"));
        }
        if self.source_information_values.is_empty() {
            return Err(invalid("source_information_values", "must name at least one source type"));
        }
        for (source_type, value) in &self.source_information_values {
            if !(0.0..=1.0).contains(value) {
                return Err(invalid(
                    &format!("source_information_values.{}", source_type),
                    "must be in [0, 1]",
                ));
            }
        }
        if self.cluster_attribute.trim().is_empty() {
            return Err(invalid("cluster_attribute", "must not be empty"));
        }
        Ok(())
    }

    /// Band thresholds
    pub fn thresholds(&self) -> Result<BandThresholds, EngineError> {
        BandThresholds::new(self.informed, self.confident, self.conviction)
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Retirement rules
    pub fn retirement_policy(&self) -> RetirementPolicy {
        RetirementPolicy {
            max_passes: self.max_passes,
            promotion_min_passes: self.promotion_min_passes,
            rejection_floor: self.rejection_floor,
            rejection_min_passes: self.rejection_min_passes,
        }
    }

    /// Get per-call timeout as Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Get initial retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Get cycle budget as Duration
    pub fn cycle_budget(&self) -> Duration {
        Duration::from_secs(self.cycle_budget_secs)
    }

    /// Lease lifetime in seconds
    pub fn lease_secs(&self) -> u64 {
        self.cycle_budget_secs.saturating_add(self.lease_grace_secs)
    }

    /// Temporal horizon in seconds
    pub fn horizon_secs(&self) -> u64 {
        self.horizon_days.saturating_mul(SECS_PER_DAY)
    }

    /// Episode half-life in seconds
    pub fn half_life_secs(&self) -> u64 {
        self.half_life_days.saturating_mul(SECS_PER_DAY)
    }
}

fn positive(field: &str, value: u64) -> Result<(), EngineError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> EngineError {
    EngineError::Config(format!("{} {}", field, reason))
}
