//! Outcome recorder
//!
//! Writes exactly one outcome per hypothesis and feeds it back into the
//! information value estimates.

use crate::engine::Engine;
use crate::error::EngineError;
use augur_domain::traits::{CollaboratorError, CommitOutcome, EngineStore, KnowledgeGraph, LlmProvider, WebSearch};
use augur_domain::{HypothesisId, Outcome, OutcomeRecord};
use std::collections::BTreeSet;
use std::fmt::Display;
use tracing::{debug, info, warn};

impl<S, L, G, W> Engine<S, L, G, W>
where
    S: EngineStore,
    S::Error: Display,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Into<CollaboratorError> + Send + 'static,
    G: KnowledgeGraph + Send + Sync + 'static,
    G::Error: Into<CollaboratorError> + Send + 'static,
    W: WebSearch + Send + Sync + 'static,
    W::Error: Into<CollaboratorError> + Send + 'static,
{
    /// Record the outcome of a hypothesis
    ///
    /// An ACTIVE hypothesis moves to the outcome's terminal status; a
    /// terminal one keeps its status and only the record is written.
    pub fn record_outcome(
        &self,
        hypothesis_id: HypothesisId,
        outcome: Outcome,
        effectiveness_score: f64,
    ) -> Result<OutcomeRecord, EngineError> {
        if !(0.0..=1.0).contains(&effectiveness_score) {
            return Err(EngineError::InvalidScore(effectiveness_score));
        }

        for attempt in 0..2 {
            let Some(mut h) = self.with_store(|s| s.get_hypothesis(hypothesis_id))? else {
                return Err(EngineError::HypothesisNotFound(hypothesis_id.to_string()));
            };
            if self.with_store(|s| s.outcome_for(hypothesis_id))?.is_some() {
                return Err(EngineError::OutcomeAlreadyRecorded(hypothesis_id.to_string()));
            }

            let source_types: BTreeSet<String> = self
                .with_store(|s| s.evidence_for(hypothesis_id))?
                .into_iter()
                .map(|e| e.source_type)
                .collect();
            let now = self.now();
            let record = OutcomeRecord {
                hypothesis_id,
                entity_id: h.entity_id.clone(),
                category: h.category.clone(),
                cluster_id: h.cluster_id.clone(),
                outcome,
                effectiveness_score,
                source_types: source_types.into_iter().collect(),
                recorded_at: now,
            };

            let committed = if h.is_active() {
                h.transition(outcome.target_status())?;
                h.flag = None;
                h.updated_at = now;
                self.with_store(|s| s.record_outcome(&record, Some(&h)))?
            } else {
                debug!("Hypothesis {} already {}, recording outcome only", h.id, h.status());
                self.with_store(|s| s.record_outcome(&record, None))?
            };

            match committed {
                CommitOutcome::Committed(_) => {
                    self.record_metrics(|m| m.outcomes_recorded += 1);
                    info!(
                        "Outcome {} recorded for {} ({}, score {:.2})",
                        outcome.as_str(),
                        hypothesis_id,
                        h.status(),
                        effectiveness_score
                    );
                    if let Err(e) = self.refresh_feedback() {
                        warn!("Feedback refresh after outcome failed: {}", e);
                    }
                    return Ok(record);
                }
                CommitOutcome::Conflict if attempt == 0 => {
                    self.record_metrics(|m| m.conflicts_retried += 1);
                    debug!("Conflict recording outcome for {}, retrying", hypothesis_id);
                }
                CommitOutcome::Conflict => break,
            }
        }

        self.record_metrics(|m| m.conflicts_deferred += 1);
        Err(EngineError::ConcurrencyConflict(format!(
            "hypothesis {} changed twice while recording its outcome",
            hypothesis_id
        )))
    }
}
