//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use augur_analytics::PopulationReport;
use augur_domain::{EpisodeId, Hypothesis, HypothesisId, OutcomeRecord};
use augur_engine::{CycleReport, EngineMetrics, SignalReceipt, StopReason};
use colored::*;
use std::collections::HashMap;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a signal intake receipt.
    pub fn receipt(&self, receipt: &SignalReceipt) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "hypothesis_id": receipt.hypothesis_id.to_string(),
                "evidence_id": receipt.evidence_id.to_string(),
                "created": receipt.created,
                "confidence": receipt.confidence,
                "band": receipt.band.as_str(),
            }))?),
            OutputFormat::Table => {
                let verb = if receipt.created { "Created" } else { "Updated" };
                Ok(self.success(&format!(
                    "{} hypothesis {} (confidence {:.3}, {})",
                    verb, receipt.hypothesis_id, receipt.confidence, receipt.band
                )))
            }
        }
    }

    /// Format a cycle report.
    pub fn cycle(&self, report: &CycleReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "owner": report.owner,
                "passes": report.passes,
                "hypotheses_updated": report.hypotheses_updated,
                "evidence_appended": report.evidence_appended,
                "degraded": report.degraded,
                "escalated": report.escalated,
                "rejected": report.rejected,
                "deferred": report.deferred,
                "feedback_version": report.feedback_version,
                "stop_reason": stop_reason(report.stop_reason),
                "elapsed_ms": report.elapsed.as_millis() as u64,
            }))?),
            OutputFormat::Table => {
                let table = table(
                    &["Passes", "Updated", "Evidence", "Degraded", "Escalated", "Rejected", "Deferred", "Stop"],
                    vec![vec![
                        report.passes.to_string(),
                        report.hypotheses_updated.to_string(),
                        report.evidence_appended.to_string(),
                        report.degraded.to_string(),
                        report.escalated.to_string(),
                        report.rejected.to_string(),
                        report.deferred.to_string(),
                        stop_reason(report.stop_reason).to_string(),
                    ]],
                );
                let done = self.success(&format!("Cycle finished in {} ms", report.elapsed.as_millis()));
                Ok(format!("{}\n{}", table, done))
            }
        }
    }

    /// Format a recorded outcome.
    pub fn outcome(&self, record: &OutcomeRecord) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "hypothesis_id": record.hypothesis_id.to_string(),
                "entity_id": record.entity_id,
                "category": record.category,
                "cluster_id": record.cluster_id,
                "outcome": record.outcome.as_str(),
                "effectiveness_score": record.effectiveness_score,
                "source_types": record.source_types,
                "recorded_at": record.recorded_at,
            }))?),
            OutputFormat::Table => Ok(self.success(&format!(
                "Outcome {} recorded for {} ({} / {})",
                record.outcome, record.hypothesis_id, record.entity_id, record.category
            ))),
        }
    }

    /// Format a recorded episode id.
    pub fn episode(&self, id: EpisodeId) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "episode_id": id.to_string(),
            }))?),
            OutputFormat::Table => Ok(self.success(&format!("Episode recorded: {}", id))),
        }
    }

    /// Format hypotheses with their EIG where eligible.
    pub fn hypotheses(&self, hypotheses: &[Hypothesis], eig: &HashMap<HypothesisId, f64>) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = hypotheses
                    .iter()
                    .map(|h| {
                        serde_json::json!({
                            "id": h.id.to_string(),
                            "entity_id": h.entity_id,
                            "category": h.category,
                            "cluster_id": h.cluster_id,
                            "status": h.status().as_str(),
                            "band": h.band().as_str(),
                            "confidence": h.confidence(),
                            "prior_confidence": h.prior_confidence(),
                            "novelty": h.novelty,
                            "pass_count": h.pass_count(),
                            "evidence_count": h.evidence_ids().len(),
                            "flag": h.flag.map(|f| f.as_str()),
                            "eig": eig.get(&h.id),
                            "created_at": h.created_at,
                            "updated_at": h.updated_at,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&rows)?)
            }
            OutputFormat::Table => {
                if hypotheses.is_empty() {
                    return Ok(self.colorize("No hypotheses found.", "yellow"));
                }
                let rows = hypotheses
                    .iter()
                    .map(|h| {
                        vec![
                            h.id.to_string(),
                            h.entity_id.clone(),
                            h.category.clone(),
                            h.status().as_str().to_string(),
                            h.band().as_str().to_string(),
                            format!("{:.3}", h.confidence()),
                            h.pass_count().to_string(),
                            h.evidence_ids().len().to_string(),
                            eig.get(&h.id).map(|e| format!("{:.4}", e)).unwrap_or_else(|| "-".to_string()),
                            h.flag.map(|f| f.as_str()).unwrap_or("").to_string(),
                        ]
                    })
                    .collect();
                Ok(table(
                    &["ID", "Entity", "Category", "Status", "Band", "Confidence", "Passes", "Evidence", "EIG", "Flag"],
                    rows,
                ))
            }
        }
    }

    /// Format a population report.
    pub fn report(&self, report: &PopulationReport) -> Result<String> {
        if let OutputFormat::Json = self.format {
            return Ok(serde_json::to_string_pretty(report)?);
        }

        let mut sections = Vec::new();

        sections.push(self.heading(&format!("Bands ({} active)", report.bands.total)));
        sections.push(table(
            &["Band", "Count", "Share"],
            report
                .bands
                .bands
                .iter()
                .map(|b| vec![b.band.clone(), b.count.to_string(), format!("{:.1}%", b.percentage)])
                .collect(),
        ));

        let f = &report.funnel;
        sections.push(self.heading("Lifecycle"));
        sections.push(table(
            &["Created", "Investigated", "Matured", "Promoted", "Rejected", "Escalated", "Active"],
            vec![vec![
                f.created.to_string(),
                f.investigated.to_string(),
                f.matured.to_string(),
                f.promoted.to_string(),
                f.rejected.to_string(),
                f.escalated.to_string(),
                f.active.to_string(),
            ]],
        ));

        if !report.categories.is_empty() {
            sections.push(self.heading("Categories"));
            sections.push(table(
                &["Category", "Hypotheses", "Outcomes", "Accept", "Weak", "Reject", "Evidence", "ROI", "Recommendation"],
                report
                    .categories
                    .iter()
                    .map(|c| {
                        vec![
                            c.category.clone(),
                            c.hypotheses.to_string(),
                            c.outcomes.to_string(),
                            format!("{:.0}%", c.accept_rate * 100.0),
                            format!("{:.0}%", c.weak_accept_rate * 100.0),
                            format!("{:.0}%", c.reject_rate * 100.0),
                            c.evidence_volume.to_string(),
                            c.roi_tier.as_str().to_string(),
                            c.recommendation.clone(),
                        ]
                    })
                    .collect(),
            ));
        }

        if !report.clusters.is_empty() {
            sections.push(self.heading("Clusters"));
            sections.push(table(
                &["Cluster", "Hypotheses", "Mean Confidence", "Outcomes", "Accept Rate"],
                report
                    .clusters
                    .iter()
                    .map(|c| {
                        vec![
                            c.cluster_id.clone(),
                            c.hypothesis_count.to_string(),
                            format!("{:.3}", c.mean_confidence),
                            c.outcome_count.to_string(),
                            format!("{:.0}%", c.accept_rate * 100.0),
                        ]
                    })
                    .collect(),
            ));
        }

        if !report.evidence_impact.is_empty() {
            sections.push(self.heading("Evidence impact"));
            sections.push(table(
                &["Source Type", "Count", "Mean Delta", "Mean |Delta|", "Mean IV"],
                report
                    .evidence_impact
                    .iter()
                    .map(|i| {
                        vec![
                            i.source_type.clone(),
                            i.count.to_string(),
                            format!("{:+.4}", i.mean_delta),
                            format!("{:.4}", i.mean_abs_delta),
                            format!("{:.3}", i.mean_information_value),
                        ]
                    })
                    .collect(),
            ));
        }

        let anomalies = format!("Anomalies: {}", report.anomalies);
        sections.push(if report.anomalies > 0 {
            self.warning(&anomalies)
        } else {
            anomalies
        });

        Ok(sections.join("\n"))
    }

    /// Format engine metrics.
    pub fn metrics(&self, metrics: &EngineMetrics) -> String {
        format!("{}\n{}", self.heading("Metrics"), metrics.summary())
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn heading(&self, text: &str) -> String {
        if self.color_enabled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn stop_reason(reason: StopReason) -> &'static str {
    match reason {
        StopReason::NoEligibleHypotheses => "no_eligible_hypotheses",
        StopReason::BudgetExhausted => "budget_exhausted",
    }
}

fn table(header: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut builder = Builder::default();
    builder.push_record(header.iter().copied());
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}
