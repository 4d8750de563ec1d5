//! Metrics collection for engine operations

use augur_domain::Band;
use std::collections::BTreeMap;

/// Counters collected across cycles
///
/// Tracks passes run, evidence written, degraded collaborator calls and
/// band movement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMetrics {
    /// Cycles that ran to DONE
    pub cycles: usize,

    /// Cycle starts rejected because the lease was held
    pub cycles_rejected: usize,

    /// Cycles stopped by the wall-clock budget
    pub budget_exhausted: usize,

    /// Passes completed
    pub passes: usize,

    /// Hypothesis updates committed by passes
    pub hypotheses_updated: usize,

    /// Evidence entries committed
    pub evidence_appended: usize,

    /// Signals ingested
    pub signals_ingested: usize,

    /// Hypotheses created by intake
    pub hypotheses_created: usize,

    /// Candidates discarded as malformed
    pub malformed_discarded: usize,

    /// Collaborator calls that hit the per-call timeout
    pub collaborator_timeouts: usize,

    /// Collaborator calls that failed after retries
    pub collaborator_failures: usize,

    /// Retries of transient collaborator failures
    pub collaborator_retries: usize,

    /// Judgments that fell back to neutral
    pub judge_fallbacks: usize,

    /// Compare-and-set conflicts retried with a fresh read
    pub conflicts_retried: usize,

    /// Updates deferred after a second conflict
    pub conflicts_deferred: usize,

    /// Hypotheses escalated
    pub escalations: usize,

    /// Hypotheses rejected for exhausting their pass budget
    pub exhaustion_rejections: usize,

    /// Outcomes recorded
    pub outcomes_recorded: usize,

    /// Band changes (from, to)
    pub band_transitions: BTreeMap<(Band, Band), usize>,

    /// Total cycle runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl EngineMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a band change; unchanged bands are ignored
    pub fn record_band_transition(&mut self, from: Band, to: Band) {
        if from != to {
            *self.band_transitions.entry((from, to)).or_insert(0) += 1;
        }
    }

    /// Record a completed cycle
    pub fn record_cycle(&mut self, runtime_ms: u64) {
        self.cycles += 1;
        self.total_runtime_ms += runtime_ms;
    }

    /// Total band changes
    pub fn total_band_transitions(&self) -> usize {
        self.band_transitions.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Engine Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Cycles: {} ({} rejected, {} over budget)", self.cycles, self.cycles_rejected, self.budget_exhausted),
            format!("Passes: {}", self.passes),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            format!("Hypotheses updated: {}", self.hypotheses_updated),
            format!("Evidence appended: {}", self.evidence_appended),
            format!("Signals ingested: {} ({} new hypotheses)", self.signals_ingested, self.hypotheses_created),
            format!("Outcomes recorded: {}", self.outcomes_recorded),
            String::new(),
            "Degradation:".to_string(),
            format!("  Malformed discarded: {}", self.malformed_discarded),
            format!("  Collaborator timeouts: {}", self.collaborator_timeouts),
            format!("  Collaborator failures: {}", self.collaborator_failures),
            format!("  Collaborator retries: {}", self.collaborator_retries),
            format!("  Neutral fallbacks: {}", self.judge_fallbacks),
            format!("  Conflicts retried: {}", self.conflicts_retried),
            format!("  Conflicts deferred: {}", self.conflicts_deferred),
            String::new(),
            format!("Escalations: {}", self.escalations),
            format!("Exhaustion rejections: {}", self.exhaustion_rejections),
        ];

        if !self.band_transitions.is_empty() {
            lines.push(String::new());
            lines.push("Band transitions:".to_string());
            for ((from, to), count) in &self.band_transitions {
                lines.push(format!("  {} -> {}: {}", from.as_str(), to.as_str(), count));
            }
            lines.push(format!("  Total: {}", self.total_band_transitions()));
        }

        lines.join("\n")
    }
}
