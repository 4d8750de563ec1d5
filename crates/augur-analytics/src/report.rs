//! Population report over an `EngineStore`

use crate::bands::{band_distribution, BandDistribution};
use crate::categories::{category_performance, CategoryPerformance};
use crate::clusters::{cluster_health, ClusterHealth};
use crate::error::AnalyticsError;
use crate::funnel::{lifecycle_funnel, LifecycleFunnel};
use crate::impact::{evidence_impact, EvidenceImpact};
use augur_domain::traits::{EngineStore, PopulationSnapshot};
use serde::Serialize;
use std::fmt::Display;
use tracing::debug;

/// Every population view in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationReport {
    /// Band distribution of ACTIVE hypotheses
    pub bands: BandDistribution,
    /// Health per cluster
    pub clusters: Vec<ClusterHealth>,
    /// Performance per category
    pub categories: Vec<CategoryPerformance>,
    /// Lifecycle funnel
    pub funnel: LifecycleFunnel,
    /// Impact per evidence source type
    pub evidence_impact: Vec<EvidenceImpact>,
    /// Escalation anomalies in the audit log
    pub anomalies: usize,
}

impl PopulationReport {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Active hypotheses: {}", self.bands.total)];
        for band in &self.bands.bands {
            lines.push(format!("  {}: {} ({:.1}%)", band.band, band.count, band.percentage));
        }

        let f = &self.funnel;
        lines.push(format!(
            "Funnel: {} created, {} investigated, {} matured, {} promoted, {} rejected, {} escalated",
            f.created, f.investigated, f.matured, f.promoted, f.rejected, f.escalated
        ));

        if !self.categories.is_empty() {
            lines.push("Categories:".to_string());
            for c in &self.categories {
                lines.push(format!(
                    "  {}: {} outcomes, accept {:.0}%, {} evidence, {}",
                    c.category,
                    c.outcomes,
                    c.accept_rate * 100.0,
                    c.evidence_volume,
                    c.roi_tier
                ));
            }
        }

        if !self.evidence_impact.is_empty() {
            lines.push("Evidence impact:".to_string());
            for i in &self.evidence_impact {
                lines.push(format!("  {}: {} entries, mean delta {:+.3}", i.source_type, i.count, i.mean_delta));
            }
        }

        lines.push(format!("Anomalies: {}", self.anomalies));
        lines.join("\n")
    }
}

/// Read-only aggregation over committed store state
#[derive(Debug, Clone, Copy, Default)]
pub struct PopulationAnalytics;

impl PopulationAnalytics {
    /// Create the aggregator
    pub fn new() -> Self {
        Self
    }

    /// Build a report from the store
    ///
    /// All views come from one [`EngineStore::snapshot`], so a commit that
    /// lands while the report is being built is either wholly in it or
    /// wholly absent.
    pub fn report<S>(&self, store: &S) -> Result<PopulationReport, AnalyticsError>
    where
        S: EngineStore,
        S::Error: Display,
    {
        let PopulationSnapshot {
            hypotheses,
            outcomes,
            evidence,
            anomalies,
        } = store.snapshot().map_err(AnalyticsError::store)?;

        debug!(
            "Aggregating {} hypotheses, {} outcomes, {} evidence",
            hypotheses.len(),
            outcomes.len(),
            evidence.len()
        );

        Ok(PopulationReport {
            bands: band_distribution(&hypotheses),
            clusters: cluster_health(&hypotheses, &outcomes),
            categories: category_performance(&hypotheses, &outcomes, &evidence),
            funnel: lifecycle_funnel(&hypotheses),
            evidence_impact: evidence_impact(&evidence),
            anomalies: anomalies.len(),
        })
    }
}
