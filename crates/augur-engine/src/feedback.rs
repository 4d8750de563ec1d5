//! Learning feedback: information value estimates from outcomes
//!
//! A snapshot is immutable. The engine swaps in a rebuilt one at the start of
//! each cycle and after each recorded outcome, so the prioritizer never reads
//! a half-updated statistic.

use crate::config::EngineConfig;
use augur_domain::OutcomeRecord;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// Value used when no default is configured for any source type
const FALLBACK_INFORMATION_VALUE: f64 = 0.5;

/// Historical evidence volume for one (category, source type)
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceStat {
    /// Hypothesis category
    pub category: String,
    /// Evidence source type
    pub source_type: String,
    /// Evidence entries
    pub count: usize,
    /// Sum of their stored information values
    pub information_value_sum: f64,
}

impl EvidenceStat {
    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.information_value_sum / self.count as f64)
    }
}

/// Versioned per-(category, source type) information value estimates
#[derive(Debug, Clone, PartialEq)]
pub struct InformationValueSnapshot {
    version: u64,
    fingerprint: u64,
    defaults: BTreeMap<String, f64>,
    estimates: BTreeMap<(String, String), f64>,
    known: BTreeSet<String>,
}

impl InformationValueSnapshot {
    /// Snapshot with configured defaults only (version 0)
    pub fn initial(config: &EngineConfig) -> Self {
        Self {
            version: 0,
            fingerprint: fingerprint(config, &[], &[]),
            defaults: config.source_information_values.clone(),
            estimates: BTreeMap::new(),
            known: config.source_information_values.keys().cloned().collect(),
        }
    }

    /// Rebuild from the most recent outcomes and evidence statistics
    ///
    /// Only the first `feedback_window` outcomes are used; callers pass them
    /// newest first. Returns an identical copy (same version) when the
    /// inputs did not change.
    ///
    /// estimate = (Σ outcome weight + k × base) / (n + k)
    pub fn rebuild(&self, config: &EngineConfig, outcomes: &[OutcomeRecord], stats: &[EvidenceStat]) -> Self {
        let window = &outcomes[..outcomes.len().min(config.feedback_window)];
        let fp = fingerprint(config, window, stats);
        if fp == self.fingerprint {
            return self.clone();
        }

        let defaults = config.source_information_values.clone();
        let fallback = mean(defaults.values().copied()).unwrap_or(FALLBACK_INFORMATION_VALUE);
        let k = config.feedback_smoothing;

        let mut base: BTreeMap<(String, String), f64> = BTreeMap::new();
        for stat in stats {
            if let Some(m) = stat.mean() {
                base.insert((stat.category.clone(), stat.source_type.clone()), m);
            }
        }

        // (Σ weight, n) per pair
        let mut tallies: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
        for record in window {
            let distinct: BTreeSet<&String> = record.source_types.iter().collect();
            for source_type in distinct {
                let tally = tallies
                    .entry((record.category.clone(), source_type.clone()))
                    .or_insert((0.0, 0));
                tally.0 += record.outcome.weight();
                tally.1 += 1;
            }
        }

        let pairs: BTreeSet<(String, String)> = base.keys().chain(tallies.keys()).cloned().collect();
        let mut estimates = BTreeMap::new();
        for pair in pairs {
            let b = base
                .get(&pair)
                .copied()
                .or_else(|| defaults.get(&pair.1).copied())
                .unwrap_or(fallback);
            let (weight_sum, n) = tallies.get(&pair).copied().unwrap_or((0.0, 0));
            let denominator = n as f64 + k;
            let estimate = if denominator > 0.0 {
                (weight_sum + k * b) / denominator
            } else {
                b
            };
            estimates.insert(pair, estimate.clamp(0.0, 1.0));
        }

        let mut known: BTreeSet<String> = defaults.keys().cloned().collect();
        known.extend(estimates.keys().map(|(_, t)| t.clone()));

        Self {
            version: self.version + 1,
            fingerprint: fp,
            defaults,
            estimates,
            known,
        }
    }

    /// Monotonic version; bumps only when the inputs change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Estimate for a category and source type
    ///
    /// Falls back to the configured default of the source type, then to the
    /// mean of all defaults.
    pub fn estimate(&self, category: &str, source_type: &str) -> f64 {
        self.estimates
            .get(&(category.to_string(), source_type.to_string()))
            .copied()
            .or_else(|| self.defaults.get(source_type).copied())
            .unwrap_or_else(|| mean(self.defaults.values().copied()).unwrap_or(FALLBACK_INFORMATION_VALUE))
    }

    /// Every source type known to the configuration or history
    pub fn known_source_types(&self) -> &BTreeSet<String> {
        &self.known
    }

    /// Learned estimates, keyed by (category, source type)
    pub fn estimates(&self) -> &BTreeMap<(String, String), f64> {
        &self.estimates
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn fingerprint(config: &EngineConfig, outcomes: &[OutcomeRecord], stats: &[EvidenceStat]) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.feedback_smoothing.to_bits().hash(&mut hasher);
    for (source_type, value) in &config.source_information_values {
        source_type.hash(&mut hasher);
        value.to_bits().hash(&mut hasher);
    }
    outcomes.len().hash(&mut hasher);
    for record in outcomes {
        record.hypothesis_id.value().hash(&mut hasher);
        record.category.hash(&mut hasher);
        record.outcome.as_str().hash(&mut hasher);
        record.source_types.hash(&mut hasher);
    }
    stats.len().hash(&mut hasher);
    for stat in stats {
        stat.category.hash(&mut hasher);
        stat.source_type.hash(&mut hasher);
        stat.count.hash(&mut hasher);
        stat.information_value_sum.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
