//! Signal and episode intake
//!
//! A signal either attaches to the ACTIVE hypothesis for its entity and
//! category or seeds a new one. Signals never consume a pass.

use crate::engine::Engine;
use crate::enrichment::CallStats;
use crate::error::EngineError;
use crate::text::bounded;
use augur_domain::confidence;
use augur_domain::traits::{CollaboratorError, CommitOutcome, EngineStore, HypothesisQuery, HypothesisUpdate, KnowledgeGraph, LlmProvider, WebSearch};
use augur_domain::{
    Band, Cluster, Episode, EpisodeId, EvidenceId, Hypothesis, HypothesisId, HypothesisStatus, Observation, Polarity,
    Signal,
};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Result of ingesting one signal
#[derive(Debug, Clone, PartialEq)]
pub struct SignalReceipt {
    /// Hypothesis the signal landed on
    pub hypothesis_id: HypothesisId,
    /// Evidence written for the signal
    pub evidence_id: EvidenceId,
    /// Whether the hypothesis was created by this signal
    pub created: bool,
    /// Confidence after the signal
    pub confidence: f64,
    /// Band after the signal
    pub band: Band,
}

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
    /// Ingest a signal as evidence
    pub async fn ingest_signal(&self, signal: Signal) -> Result<SignalReceipt, EngineError> {
        let signal = self.validate_signal(signal)?;

        if self.with_store(|s| s.find_active(&signal.entity_id, &signal.category))?.is_some() {
            return self.attach_signal(&signal);
        }

        match self.create_from_signal(&signal).await {
            Ok(receipt) => Ok(receipt),
            Err(EngineError::Store(msg)) => {
                // Lost the race to create; the winner's hypothesis takes the signal
                if self.with_store(|s| s.find_active(&signal.entity_id, &signal.category))?.is_some() {
                    debug!("Hypothesis for {}/{} created concurrently, attaching", signal.entity_id, signal.category);
                    self.attach_signal(&signal)
                } else {
                    Err(EngineError::Store(msg))
                }
            }
            Err(e) => Err(e),
        }
    }

    fn validate_signal(&self, mut signal: Signal) -> Result<Signal, EngineError> {
        signal.entity_id = signal.entity_id.trim().to_string();
        signal.category = signal.category.trim().to_string();
        signal.source_type = signal.source_type.trim().to_string();

        if signal.entity_id.is_empty() {
            return Err(EngineError::InvalidSignal("entity_id is empty".to_string()));
        }
        if signal.category.is_empty() {
            return Err(EngineError::InvalidSignal("category is empty".to_string()));
        }
        if signal.source_type.is_empty() {
            return Err(EngineError::InvalidSignal("source_type is empty".to_string()));
        }
        let payload = bounded(&signal.payload, self.config.max_snippet_chars);
        if payload.is_empty() {
            return Err(EngineError::InvalidSignal("payload is empty".to_string()));
        }
        if payload.len() < signal.payload.trim().len() {
            debug!("Signal payload for {} truncated to {} chars", signal.entity_id, self.config.max_snippet_chars);
        }
        signal.payload = payload;
        signal.source_url = signal.source_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        Ok(signal)
    }

    fn observation(&self, signal: &Signal) -> Observation {
        let information_value = self.feedback_snapshot().estimate(&signal.category, &signal.source_type);
        let obs = Observation::new(
            signal.source_type.clone(),
            signal.payload.clone(),
            signal.observed_at,
            information_value,
            Polarity::Supports,
        );
        match &signal.source_url {
            Some(url) => obs.with_url(url.clone()),
            None => obs,
        }
    }

    fn attach_signal(&self, signal: &Signal) -> Result<SignalReceipt, EngineError> {
        for attempt in 0..2 {
            let Some(mut h) = self.with_store(|s| s.find_active(&signal.entity_id, &signal.category))? else {
                return Err(EngineError::HypothesisNotFound(format!("{}/{}", signal.entity_id, signal.category)));
            };

            let seen = self
                .with_store(|s| s.evidence_for(h.id))?
                .iter()
                .any(|e| e.source_type == signal.source_type);
            if seen {
                h.novelty *= self.config.novelty_decay;
            }

            let before = h.band();
            let evidence = confidence::ingest(&mut h, vec![self.observation(signal)], 0, &self.thresholds);
            h.updated_at = self.now();
            h.flag = self.retirement.advise(&h);
            let Some(evidence_id) = evidence.first().map(|e| e.id) else {
                return Err(EngineError::InvalidSignal("signal produced no evidence".to_string()));
            };

            match self.with_store(|s| s.commit_update(HypothesisUpdate::new(&h).with_evidence(&evidence)))? {
                CommitOutcome::Committed(_) => {
                    self.record_metrics(|m| {
                        m.signals_ingested += 1;
                        m.evidence_appended += 1;
                        m.record_band_transition(before, h.band());
                    });
                    info!(
                        "Signal {} attached to {} ({:.3}, {})",
                        signal.source_type,
                        h.id,
                        h.confidence(),
                        h.band().as_str()
                    );
                    return Ok(SignalReceipt {
                        hypothesis_id: h.id,
                        evidence_id,
                        created: false,
                        confidence: h.confidence(),
                        band: h.band(),
                    });
                }
                CommitOutcome::Conflict if attempt == 0 => {
                    self.record_metrics(|m| m.conflicts_retried += 1);
                    debug!("Conflict attaching signal to {}, retrying", h.id);
                }
                CommitOutcome::Conflict => {
                    self.record_metrics(|m| m.conflicts_deferred += 1);
                    return Err(EngineError::ConcurrencyConflict(format!(
                        "hypothesis {} changed twice while attaching a signal",
                        h.id
                    )));
                }
            }
        }
        Err(EngineError::ConcurrencyConflict(format!(
            "could not attach signal for {}/{}",
            signal.entity_id, signal.category
        )))
    }

    async fn create_from_signal(&self, signal: &Signal) -> Result<SignalReceipt, EngineError> {
        let in_category = self
            .with_store(|s| {
                s.query_hypotheses(&HypothesisQuery {
                    status: Some(HypothesisStatus::Active),
                    category: Some(signal.category.clone()),
                    ..Default::default()
                })
            })?
            .len();
        let exponent = i32::try_from(in_category).unwrap_or(i32::MAX);
        let novelty = self.config.novelty_decay.powi(exponent).max(self.config.min_novelty);

        let cluster_id = self.seed_cluster(&signal.entity_id, &signal.category).await;
        let now = self.now();
        let mut h = Hypothesis::new(
            signal.entity_id.clone(),
            signal.category.clone(),
            self.config.prior_confidence,
            novelty,
            &self.thresholds,
            now,
        )
        .with_cluster(cluster_id);

        let evidence = confidence::ingest(&mut h, vec![self.observation(signal)], 0, &self.thresholds);
        h.flag = self.retirement.advise(&h);
        let Some(evidence_id) = evidence.first().map(|e| e.id) else {
            return Err(EngineError::InvalidSignal("signal produced no evidence".to_string()));
        };

        self.with_store(|s| s.insert_hypothesis(&h, &evidence))?;
        self.record_metrics(|m| {
            m.signals_ingested += 1;
            m.hypotheses_created += 1;
            m.evidence_appended += 1;
            m.record_band_transition(Band::Exploratory, h.band());
        });
        info!(
            "Created hypothesis {} for {}/{} in cluster {} (novelty {:.3})",
            h.id,
            h.entity_id,
            h.category,
            h.cluster_id.as_deref().unwrap_or("-"),
            h.novelty
        );

        Ok(SignalReceipt {
            hypothesis_id: h.id,
            evidence_id,
            created: true,
            confidence: h.confidence(),
            band: h.band(),
        })
    }

    /// Cluster key from the knowledge graph, `category` when unavailable
    async fn seed_cluster(&self, entity_id: &str, category: &str) -> String {
        let mut stats = CallStats::default();
        let attribute = match self.enricher.lookup(entity_id, &mut stats).await {
            Ok(Some(profile)) => profile.attributes.get(&self.config.cluster_attribute).cloned(),
            Ok(None) => None,
            Err(e) => {
                warn!("Graph lookup for {} failed, clustering by category: {}", entity_id, e);
                None
            }
        };
        self.record_metrics(|m| stats.apply(m));
        Cluster::key(category, attribute.as_deref())
    }

    /// Append an episode to the temporal store
    ///
    /// A correction must name an existing episode of the same entity.
    pub fn record_episode(&self, episode: Episode) -> Result<EpisodeId, EngineError> {
        if episode.entity_id.trim().is_empty() {
            return Err(EngineError::InvalidEpisode("entity_id is empty".to_string()));
        }
        if episode.episode_type.trim().is_empty() {
            return Err(EngineError::InvalidEpisode("episode type is empty".to_string()));
        }
        if episode.payload.trim().is_empty() {
            return Err(EngineError::InvalidEpisode("payload is empty".to_string()));
        }
        if let Some(before) = episode.valid_before {
            if before <= episode.valid_at {
                return Err(EngineError::InvalidEpisode(format!(
                    "valid_before {} is not after valid_at {}",
                    before, episode.valid_at
                )));
            }
        }
        if let Some(corrected) = episode.invalidates {
            match self.with_store(|s| s.get_episode(corrected))? {
                Some(target) if target.entity_id == episode.entity_id => {}
                Some(target) => {
                    return Err(EngineError::InvalidEpisode(format!(
                        "episode {} belongs to {}, not {}",
                        corrected, target.entity_id, episode.entity_id
                    )));
                }
                None => {
                    return Err(EngineError::InvalidEpisode(format!("episode {} does not exist", corrected)));
                }
            }
        }

        self.with_store(|s| s.append_episode(&episode))?;
        debug!("Recorded {} episode {} for {}", episode.episode_type, episode.id, episode.entity_id);
        Ok(episode.id)
    }
}
