//! Pass orchestrator
//!
//! `IDLE → SELECTING → ENRICHING → UPDATING → (SELECTING | DONE)`
//!
//! A cycle holds the persisted `pass-orchestrator` lease for its whole run.
//! Enrichment of the selected hypotheses runs concurrently; each
//! hypothesis's update is one compare-and-set transaction.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::enrichment::{Enricher, Enrichment, EnrichmentRequest};
use crate::error::EngineError;
use crate::feedback::{EvidenceStat, InformationValueSnapshot};
use crate::metrics::EngineMetrics;
use crate::prioritizer::{Candidate, EigPrioritizer, EvidenceSummary, Priority, ReservedBoosts};
use crate::temporal::{TemporalContext, TemporalContextProvider};
use augur_domain::confidence;
use augur_domain::traits::{
    CollaboratorError, CommitOutcome, EngineStore, EvidenceQuery, HypothesisQuery, HypothesisUpdate, KnowledgeGraph,
    LlmProvider, WebSearch,
};
use augur_domain::{
    AnomalyRecord, BandThresholds, CycleLease, Hypothesis, HypothesisId, HypothesisStatus, LeaseOutcome,
    RetirementPolicy,
};
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Name of the lease guarding cycles
pub const ORCHESTRATOR_LEASE: &str = "pass-orchestrator";

/// Where the orchestrator is in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// No cycle has started, or one is about to
    Idle,
    /// Ranking eligible hypotheses
    Selecting,
    /// Waiting on collaborators
    Enriching,
    /// Committing evidence and confidence
    Updating,
    /// Last cycle finished
    Done,
}

/// Why a cycle stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Selection came back empty
    NoEligibleHypotheses,
    /// Wall-clock budget ran out
    BudgetExhausted,
}

/// Summary of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Lease owner token of the cycle
    pub owner: String,
    /// Passes completed
    pub passes: u32,
    /// Hypothesis updates committed
    pub hypotheses_updated: usize,
    /// Evidence entries committed
    pub evidence_appended: usize,
    /// Hypotheses whose enrichment degraded to no evidence
    pub degraded: usize,
    /// Hypotheses escalated
    pub escalated: usize,
    /// Hypotheses rejected for exhausting their passes
    pub rejected: usize,
    /// Updates deferred after repeated conflicts
    pub deferred: usize,
    /// Information value snapshot version used
    pub feedback_version: u64,
    /// Why the cycle stopped
    pub stop_reason: StopReason,
    /// Wall-clock time taken
    pub elapsed: Duration,
}

enum PassCommit {
    Committed { evidence: usize, status: HypothesisStatus },
    Skipped,
    Deferred,
}

/// Releases the lease when the cycle ends, whatever the path
struct LeaseGuard<S: EngineStore>
where
    S::Error: Display,
{
    store: Arc<Mutex<S>>,
    owner: String,
}

impl<S: EngineStore> Drop for LeaseGuard<S>
where
    S::Error: Display,
{
    fn drop(&mut self) {
        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        };
        match store.release_lease(ORCHESTRATOR_LEASE, &self.owner) {
            Ok(true) => debug!("Released {} lease {}", ORCHESTRATOR_LEASE, self.owner),
            Ok(false) => warn!("Lease {} was taken over before release", self.owner),
            Err(e) => error!("Failed to release lease {}: {}", self.owner, e),
        }
    }
}

/// The hypothesis evaluation engine
///
/// Generic over the store and the three collaborators. Share it behind an
/// `Arc`; every operation takes `&self`.
pub struct Engine<S, L, G, W> {
    pub(crate) store: Arc<Mutex<S>>,
    pub(crate) enricher: Arc<Enricher<L, G, W>>,
    pub(crate) config: EngineConfig,
    pub(crate) thresholds: BandThresholds,
    pub(crate) retirement: RetirementPolicy,
    prioritizer: EigPrioritizer,
    temporal: TemporalContextProvider,
    feedback: RwLock<Arc<InformationValueSnapshot>>,
    pub(crate) metrics: Mutex<EngineMetrics>,
    state: Mutex<PassState>,
    pub(crate) clock: Clock,
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
    /// Create an engine over a shared store and collaborators
    pub fn new(
        store: Arc<Mutex<S>>,
        llm: Arc<L>,
        graph: Arc<G>,
        search: Arc<W>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let thresholds = config.thresholds()?;
        Ok(Self {
            enricher: Arc::new(Enricher::new(llm, graph, search, &config)),
            prioritizer: EigPrioritizer::new(thresholds, config.revisit_factor),
            temporal: TemporalContextProvider::new(&config),
            feedback: RwLock::new(Arc::new(InformationValueSnapshot::initial(&config))),
            retirement: config.retirement_policy(),
            thresholds,
            config,
            store,
            metrics: Mutex::new(EngineMetrics::new()),
            state: Mutex::new(PassState::Idle),
            clock: Clock::System,
        })
    }

    /// Replace the time source (builder style)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Band thresholds in force
    pub fn thresholds(&self) -> &BandThresholds {
        &self.thresholds
    }

    /// Shared handle to the store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Current orchestrator state
    pub fn state(&self) -> PassState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Get current metrics
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Reset metrics
    pub fn reset_metrics(&self) {
        self.metrics.lock().unwrap_or_else(|p| p.into_inner()).reset();
    }

    /// Information value snapshot currently in force
    pub fn feedback_snapshot(&self) -> Arc<InformationValueSnapshot> {
        Arc::clone(&self.feedback.read().unwrap_or_else(|p| p.into_inner()))
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.now()
    }

    pub(crate) fn with_store<T>(&self, f: impl FnOnce(&mut S) -> Result<T, S::Error>) -> Result<T, EngineError> {
        let mut store = self.store.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut store).map_err(EngineError::store)
    }

    pub(crate) fn record_metrics(&self, f: impl FnOnce(&mut EngineMetrics)) {
        f(&mut self.metrics.lock().unwrap_or_else(|p| p.into_inner()));
    }

    fn set_state(&self, next: PassState) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state != next {
            debug!("Orchestrator {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Rebuild the information value snapshot from outcomes and evidence
    ///
    /// The stored snapshot is replaced only when its version changes.
    pub fn refresh_feedback(&self) -> Result<Arc<InformationValueSnapshot>, EngineError> {
        let window = self.config.feedback_window;
        let (outcomes, hypotheses, evidence) = self.with_store(|s| {
            Ok((
                s.recent_outcomes(Some(window))?,
                s.query_hypotheses(&HypothesisQuery::default())?,
                s.query_evidence(&EvidenceQuery::default())?,
            ))
        })?;

        let categories: HashMap<HypothesisId, &str> =
            hypotheses.iter().map(|h| (h.id, h.category.as_str())).collect();
        let mut grouped: BTreeMap<(String, String), (usize, f64)> = BTreeMap::new();
        for e in &evidence {
            if let Some(category) = categories.get(&e.hypothesis_id) {
                let entry = grouped
                    .entry((category.to_string(), e.source_type.clone()))
                    .or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += e.information_value;
            }
        }
        let stats: Vec<EvidenceStat> = grouped
            .into_iter()
            .map(|((category, source_type), (count, sum))| EvidenceStat {
                category,
                source_type,
                count,
                information_value_sum: sum,
            })
            .collect();

        let current = self.feedback_snapshot();
        let next = current.rebuild(&self.config, &outcomes, &stats);
        if next.version() == current.version() {
            return Ok(current);
        }
        info!(
            "Information value snapshot v{} ({} outcomes, {} estimates)",
            next.version(),
            outcomes.len(),
            next.estimates().len()
        );
        let next = Arc::new(next);
        *self.feedback.write().unwrap_or_else(|p| p.into_inner()) = Arc::clone(&next);
        Ok(next)
    }

    /// Temporal context of an entity as of now
    pub fn temporal_context(&self, entity_id: &str) -> Result<TemporalContext, EngineError> {
        let episodes = self.with_store(|s| s.episodes_for(entity_id))?;
        Ok(self.temporal.summarize(&episodes, self.now()))
    }

    /// EIG priorities of the ACTIVE hypotheses, highest first
    ///
    /// Hypotheses without passes left are included; selection filters them.
    pub fn priorities(&self) -> Result<Vec<Priority>, EngineError> {
        let snapshot = self.feedback_snapshot();
        let active = self.with_store(|s| s.query_hypotheses(&HypothesisQuery::active()))?;
        let summaries = self.evidence_summaries(&active)?;
        Ok(self.rank(&active, &summaries, &snapshot))
    }

    fn evidence_summaries(&self, hypotheses: &[Hypothesis]) -> Result<Vec<(EvidenceSummary, HashSet<String>)>, EngineError> {
        self.with_store(|s| {
            hypotheses
                .iter()
                .map(|h| {
                    let evidence = s.evidence_for(h.id)?;
                    let urls = evidence.iter().filter_map(|e| e.source_url.clone()).collect();
                    Ok((EvidenceSummary::from_evidence(&evidence), urls))
                })
                .collect()
        })
    }

    fn rank(
        &self,
        hypotheses: &[Hypothesis],
        summaries: &[(EvidenceSummary, HashSet<String>)],
        snapshot: &InformationValueSnapshot,
    ) -> Vec<Priority> {
        let candidates: Vec<Candidate<'_>> = hypotheses
            .iter()
            .zip(summaries)
            .map(|(hypothesis, (evidence, _))| Candidate { hypothesis, evidence })
            .collect();
        self.prioritizer.prioritize(&candidates, snapshot, &ReservedBoosts::default())
    }

    fn acquire_lease(&self) -> Result<LeaseGuard<S>, EngineError> {
        let now = self.now();
        let owner = uuid::Uuid::now_v7().to_string();
        let request = CycleLease::new(ORCHESTRATOR_LEASE, owner.clone(), now, now.saturating_add(self.config.lease_secs()));

        match self.with_store(|s| s.try_acquire_lease(&request, now))? {
            LeaseOutcome::Acquired(lease) => {
                debug!("Acquired {} lease {} until {}", ORCHESTRATOR_LEASE, lease.owner, lease.expires_at);
                Ok(LeaseGuard {
                    store: Arc::clone(&self.store),
                    owner,
                })
            }
            LeaseOutcome::Held(holder) => {
                self.record_metrics(|m| m.cycles_rejected += 1);
                warn!("Cycle rejected: lease held by {} until {}", holder.owner, holder.expires_at);
                Err(EngineError::CapacityExceeded {
                    holder: holder.owner,
                    expires_at: holder.expires_at,
                })
            }
        }
    }

    /// Run one cycle of passes until nothing is eligible or the budget runs out
    ///
    /// Returns [`EngineError::CapacityExceeded`] immediately when another
    /// cycle holds the lease. Per-hypothesis failures never abort the cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, EngineError> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.cycle_budget();
        let lease = self.acquire_lease()?;
        self.set_state(PassState::Idle);

        let result = self.drive(&lease.owner, deadline).await;
        self.set_state(PassState::Done);
        drop(lease);

        let mut report = result?;
        report.elapsed = started.elapsed();
        let runtime_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX);
        self.record_metrics(|m| {
            m.record_cycle(runtime_ms);
            if report.stop_reason == StopReason::BudgetExhausted {
                m.budget_exhausted += 1;
            }
        });
        info!(
            "Cycle {} done: {} passes, {} updates, {} evidence, {} escalated, {} rejected ({:?})",
            report.owner,
            report.passes,
            report.hypotheses_updated,
            report.evidence_appended,
            report.escalated,
            report.rejected,
            report.stop_reason
        );
        Ok(report)
    }

    async fn drive(&self, owner: &str, deadline: tokio::time::Instant) -> Result<CycleReport, EngineError> {
        let snapshot = self.refresh_feedback()?;
        let mut report = CycleReport {
            owner: owner.to_string(),
            passes: 0,
            hypotheses_updated: 0,
            evidence_appended: 0,
            degraded: 0,
            escalated: 0,
            rejected: 0,
            deferred: 0,
            feedback_version: snapshot.version(),
            stop_reason: StopReason::NoEligibleHypotheses,
            elapsed: Duration::ZERO,
        };

        report.stop_reason = loop {
            if tokio::time::Instant::now() >= deadline {
                break StopReason::BudgetExhausted;
            }

            self.set_state(PassState::Selecting);
            let requests = self.select(&snapshot)?;
            if requests.is_empty() {
                break StopReason::NoEligibleHypotheses;
            }
            debug!("Pass {}: {} hypotheses selected", report.passes + 1, requests.len());

            self.set_state(PassState::Enriching);
            let Some(enrichments) = self.enrich_all(requests, deadline).await else {
                warn!("Cycle budget exhausted during enrichment; abandoning in-flight calls");
                break StopReason::BudgetExhausted;
            };

            self.set_state(PassState::Updating);
            for enrichment in &enrichments {
                self.record_metrics(|m| enrichment.stats.apply(m));
                if enrichment.degraded {
                    report.degraded += 1;
                }
                match self.commit_pass(enrichment) {
                    Ok(PassCommit::Committed { evidence, status }) => {
                        report.hypotheses_updated += 1;
                        report.evidence_appended += evidence;
                        match status {
                            HypothesisStatus::Escalated => report.escalated += 1,
                            HypothesisStatus::Rejected => report.rejected += 1,
                            _ => {}
                        }
                    }
                    Ok(PassCommit::Skipped) => {}
                    Ok(PassCommit::Deferred) => report.deferred += 1,
                    Err(e) => error!("Update of hypothesis {} failed: {}", enrichment.hypothesis_id, e),
                }
            }
            report.passes += 1;
            self.record_metrics(|m| m.passes += 1);
        };

        Ok(report)
    }

    /// Top-K eligible hypotheses with everything enrichment needs
    fn select(&self, snapshot: &Arc<InformationValueSnapshot>) -> Result<Vec<EnrichmentRequest>, EngineError> {
        let active = self.with_store(|s| s.query_hypotheses(&HypothesisQuery::active()))?;
        let eligible: Vec<Hypothesis> = active
            .into_iter()
            .filter(|h| self.retirement.has_passes_left(h))
            .collect();
        let summaries = self.evidence_summaries(&eligible)?;
        let ranked = self.rank(&eligible, &summaries, snapshot);

        let mut by_id: HashMap<HypothesisId, (Hypothesis, HashSet<String>)> = eligible
            .into_iter()
            .zip(summaries)
            .map(|(h, (_, urls))| (h.id, (h, urls)))
            .collect();

        let now = self.now();
        let mut requests = Vec::new();
        for priority in ranked.into_iter().take(self.config.top_k) {
            let Some((hypothesis, known_urls)) = by_id.remove(&priority.hypothesis_id) else {
                continue;
            };
            let context = self.temporal_context(&hypothesis.entity_id)?;
            requests.push(EnrichmentRequest {
                hypothesis,
                known_urls,
                narrative: context.narrative,
                temporal_adjustment: context.adjustment,
                snapshot: Arc::clone(snapshot),
                now,
            });
        }
        Ok(requests)
    }

    /// Enrich concurrently; `None` when the deadline passes first
    async fn enrich_all(&self, requests: Vec<EnrichmentRequest>, deadline: tokio::time::Instant) -> Option<Vec<Enrichment>> {
        let order: HashMap<HypothesisId, usize> = requests
            .iter()
            .enumerate()
            .map(|(i, r)| (r.hypothesis.id, i))
            .collect();
        let enricher = Arc::clone(&self.enricher);
        let mut stream = futures::stream::iter(requests)
            .map(move |request| {
                let enricher = Arc::clone(&enricher);
                async move { enricher.enrich(request).await }
            })
            .buffer_unordered(self.config.enrichment_concurrency);

        let mut done = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(Some(enrichment)) => done.push(enrichment),
                Ok(None) => break,
                Err(_) => return None,
            }
        }
        done.sort_by_key(|e: &Enrichment| order.get(&e.hypothesis_id).copied().unwrap_or(usize::MAX));
        Some(done)
    }

    /// Commit one hypothesis's pass; one retry on conflict, then defer
    fn commit_pass(&self, enrichment: &Enrichment) -> Result<PassCommit, EngineError> {
        for attempt in 0..2 {
            let Some(mut h) = self.with_store(|s| s.get_hypothesis(enrichment.hypothesis_id))? else {
                warn!("Hypothesis {} vanished before update", enrichment.hypothesis_id);
                return Ok(PassCommit::Skipped);
            };
            if !h.is_active() || !self.retirement.has_passes_left(&h) {
                debug!("Hypothesis {} no longer eligible, skipping update", h.id);
                return Ok(PassCommit::Skipped);
            }

            let before_confidence = h.confidence();
            let before_band = h.band();
            let pass_number = h.pass_count() + 1;
            let evidence = confidence::ingest(&mut h, enrichment.observations.clone(), pass_number, &self.thresholds);
            h.record_pass();
            h.updated_at = self.now();

            let jump = h.confidence() - before_confidence;
            let anomaly = if jump > self.config.escalation_delta {
                h.transition(HypothesisStatus::Escalated)?;
                Some(AnomalyRecord {
                    hypothesis_id: h.id,
                    pass_number,
                    confidence_before: before_confidence,
                    confidence_after: h.confidence(),
                    band_before: before_band,
                    band_after: h.band(),
                    recorded_at: h.updated_at,
                    note: format!(
                        "confidence rose {:+.3} in one pass ({} evidence), over escalation delta {:.2}",
                        jump,
                        evidence.len(),
                        self.config.escalation_delta
                    ),
                })
            } else {
                if self.retirement.rejects_on_exhaustion(&h) {
                    h.transition(HypothesisStatus::Rejected)?;
                }
                None
            };
            h.flag = self.retirement.advise(&h);

            let mut update = HypothesisUpdate::new(&h).with_evidence(&evidence);
            if let Some(record) = &anomaly {
                update = update.with_anomaly(record);
            }

            match self.with_store(|s| s.commit_update(update))? {
                CommitOutcome::Committed(_) => {
                    if let Some(record) = &anomaly {
                        warn!(
                            target: "augur::anomaly",
                            "Hypothesis {} escalated: {} -> {} ({:.3} -> {:.3}) in pass {}",
                            h.id,
                            record.band_before.as_str(),
                            record.band_after.as_str(),
                            record.confidence_before,
                            record.confidence_after,
                            pass_number
                        );
                    }
                    if h.status() == HypothesisStatus::Rejected {
                        info!("Hypothesis {} rejected after {} passes in {}", h.id, h.pass_count(), h.band().as_str());
                    }
                    self.record_metrics(|m| {
                        m.hypotheses_updated += 1;
                        m.evidence_appended += evidence.len();
                        m.record_band_transition(before_band, h.band());
                        match h.status() {
                            HypothesisStatus::Escalated => m.escalations += 1,
                            HypothesisStatus::Rejected => m.exhaustion_rejections += 1,
                            _ => {}
                        }
                    });
                    debug!(
                        "Hypothesis {} pass {}: {:.3} -> {:.3} ({} evidence)",
                        h.id,
                        pass_number,
                        before_confidence,
                        h.confidence(),
                        evidence.len()
                    );
                    return Ok(PassCommit::Committed {
                        evidence: evidence.len(),
                        status: h.status(),
                    });
                }
                CommitOutcome::Conflict if attempt == 0 => {
                    self.record_metrics(|m| m.conflicts_retried += 1);
                    debug!("Conflict updating {}, retrying with fresh state", h.id);
                }
                CommitOutcome::Conflict => break,
            }
        }

        self.record_metrics(|m| m.conflicts_deferred += 1);
        warn!("Deferring update of {} to the next pass after repeated conflicts", enrichment.hypothesis_id);
        Ok(PassCommit::Deferred)
    }
}
