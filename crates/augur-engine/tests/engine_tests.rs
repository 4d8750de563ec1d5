//! Integration tests for augur-engine
//!
//! These drive full cycles against an in-memory SQLite store and the
//! deterministic collaborator doubles.

use augur_domain::confidence;
use augur_domain::traits::{
    CollaboratorError, CommitOutcome, EngineStore, EvidenceQuery, HypothesisQuery, HypothesisUpdate,
    PopulationSnapshot, SearchDocument,
};
use augur_domain::{
    AnomalyRecord, Band, BandThresholds, CycleLease, Episode, EpisodeId, Evidence, Hypothesis, HypothesisId,
    HypothesisStatus, LeaseOutcome, Outcome, OutcomeRecord, Signal,
};
use augur_engine::{Clock, Engine, EngineConfig, EngineError, PassState, StopReason, ORCHESTRATOR_LEASE};
use augur_providers::{MockGraph, MockProvider, MockSearch};
use augur_store::{SqliteStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const NOW: u64 = 1_709_251_200;
const SUPPORTS: &str = r#"{"polarity": "supports", "rationale": "points to an upcoming tender"}"#;
const CONTRADICTS: &str = r#"{"polarity": "contradicts", "rationale": "the tender was withdrawn"}"#;

type TestEngine = Engine<SqliteStore, MockProvider, MockGraph, MockSearch>;

struct Harness {
    engine: TestEngine,
    store: Arc<Mutex<SqliteStore>>,
    graph: MockGraph,
    search: MockSearch,
    clock: Clock,
}

fn harness(config: EngineConfig, llm: MockProvider) -> Harness {
    let store = Arc::new(Mutex::new(SqliteStore::new(":memory:", BandThresholds::default()).unwrap()));
    let graph = MockGraph::new();
    let search = MockSearch::new();
    let clock = Clock::manual(NOW);
    let engine = Engine::new(
        Arc::clone(&store),
        Arc::new(llm),
        Arc::new(graph.clone()),
        Arc::new(search.clone()),
        config,
    )
    .unwrap()
    .with_clock(clock.clone());

    Harness {
        engine,
        store,
        graph,
        search,
        clock,
    }
}

fn seed(h: &Harness, entity: &str, prior: f64) -> HypothesisId {
    let hypothesis = Hypothesis::new(entity, "procurement", prior, 1.0, &BandThresholds::default(), NOW);
    let id = hypothesis.id;
    h.store.lock().unwrap().insert_hypothesis(&hypothesis, &[]).unwrap();
    id
}

fn load(h: &Harness, id: HypothesisId) -> Hypothesis {
    h.store.lock().unwrap().get_hypothesis(id).unwrap().unwrap()
}

fn evidence_count(h: &Harness, id: HypothesisId) -> usize {
    h.store.lock().unwrap().evidence_for(id).unwrap().len()
}

fn document(n: usize) -> SearchDocument {
    SearchDocument {
        title: format!("Tender notice {}", n),
        snippet: "The council invites bids for a records platform".to_string(),
        url: format!("https://tenders.example/{}", n),
        published_at: Some(NOW - 3_600),
    }
}

#[tokio::test]
async fn test_concurrent_cycle_is_rejected() {
    let h = harness(EngineConfig::default(), MockProvider::new(SUPPORTS));
    seed(&h, "org:acme", 0.2);
    h.search.delay_for("org:acme", Duration::from_millis(100));

    let (first, second) = tokio::join!(h.engine.run_cycle(), h.engine.run_cycle());

    let first = first.expect("first cycle should run");
    assert!(first.passes >= 1);
    match second {
        Err(EngineError::CapacityExceeded { holder, expires_at }) => {
            assert_eq!(holder, first.owner);
            assert!(expires_at > NOW);
        }
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }
    assert_eq!(h.engine.metrics().cycles_rejected, 1);

    // Lease is released once the first cycle ends
    assert!(h.store.lock().unwrap().current_lease(ORCHESTRATOR_LEASE).unwrap().is_none());
    assert!(h.engine.run_cycle().await.is_ok());
}

#[tokio::test]
async fn test_held_lease_rejects_until_expired() {
    let h = harness(EngineConfig::default(), MockProvider::new(SUPPORTS));
    seed(&h, "org:acme", 0.2);
    h.store
        .lock()
        .unwrap()
        .try_acquire_lease(&CycleLease::new(ORCHESTRATOR_LEASE, "other-instance", NOW, NOW + 60), NOW)
        .unwrap();

    let err = h.engine.run_cycle().await.unwrap_err();
    assert_eq!(
        err,
        EngineError::CapacityExceeded {
            holder: "other-instance".to_string(),
            expires_at: NOW + 60,
        }
    );
    assert!(err.to_string().contains("already running"));

    h.clock.advance(61);
    let report = h.engine.run_cycle().await.unwrap();
    assert!(report.passes >= 1);
}

#[tokio::test]
async fn test_slow_collaborator_degrades_one_hypothesis() {
    let config = EngineConfig {
        max_passes: 1,
        top_k: 10,
        enrichment_concurrency: 10,
        call_timeout_ms: 100,
        transient_retries: 0,
        ..EngineConfig::default()
    };
    let h = harness(config, MockProvider::new(SUPPORTS));

    let mut ids = Vec::new();
    for i in 0..9 {
        ids.push(seed(&h, &format!("org:fast-{}", i), 0.2));
    }
    let slow = seed(&h, "org:slow", 0.2);
    h.search.add_results("org:", vec![document(1)]);
    h.search.delay_for("org:slow", Duration::from_millis(300));

    let report = h.engine.run_cycle().await.unwrap();

    assert_eq!(report.passes, 1);
    assert_eq!(report.hypotheses_updated, 10);
    assert_eq!(report.degraded, 1);
    assert_eq!(report.stop_reason, StopReason::NoEligibleHypotheses);

    for id in ids {
        let updated = load(&h, id);
        assert!((updated.confidence() - 0.6).abs() < 1e-9, "0.2 + 0.5 * 0.8");
        assert_eq!(updated.band(), Band::Confident);
        assert_eq!(updated.pass_count(), 1);
        assert_eq!(evidence_count(&h, id), 1);
    }

    let degraded = load(&h, slow);
    assert_eq!(degraded.pass_count(), 1);
    assert_eq!(evidence_count(&h, slow), 0);
    assert!((degraded.confidence() - 0.2).abs() < 1e-9);
    assert!(h.engine.metrics().collaborator_timeouts >= 1);
}

#[tokio::test]
async fn test_exhausted_exploratory_hypothesis_is_rejected() {
    let config = EngineConfig {
        max_passes: 2,
        ..EngineConfig::default()
    };
    let h = harness(config, MockProvider::default());
    let id = seed(&h, "org:quiet", 0.1);

    let report = h.engine.run_cycle().await.unwrap();

    assert_eq!(report.passes, 2);
    assert_eq!(report.rejected, 1);
    let rejected = load(&h, id);
    assert_eq!(rejected.status(), HypothesisStatus::Rejected);
    assert_eq!(rejected.pass_count(), 2);
    assert_eq!(rejected.band(), Band::Exploratory);
    assert_eq!(h.engine.metrics().exhaustion_rejections, 1);
    assert_eq!(h.engine.state(), PassState::Done);

    // A rejected hypothesis is never selected again
    let again = h.engine.run_cycle().await.unwrap();
    assert_eq!(again.passes, 0);
}

#[tokio::test]
async fn test_large_jump_escalates_with_anomaly() {
    let h = harness(EngineConfig::default(), MockProvider::new(SUPPORTS));
    let id = seed(&h, "org:acme", 0.1);
    h.graph.add_entity("org:acme", ("sector", "health care"), 12);
    h.search.add_results("org:acme", vec![document(1), document(2)]);

    let report = h.engine.run_cycle().await.unwrap();

    assert_eq!(report.escalated, 1);
    let escalated = load(&h, id);
    assert_eq!(escalated.status(), HypothesisStatus::Escalated);
    assert_eq!(escalated.pass_count(), 1);
    // 0.1 -> 0.46 (graph, 0.4) -> 0.73 (search, 0.5) -> 0.865 (search, 0.5)
    assert!((escalated.confidence() - 0.865).abs() < 1e-9);
    assert_eq!(escalated.band(), Band::Conviction);

    let anomalies = h.store.lock().unwrap().anomalies(None).unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].hypothesis_id, id);
    assert_eq!(anomalies[0].band_before, Band::Exploratory);
    assert_eq!(anomalies[0].band_after, Band::Conviction);
    assert_eq!(anomalies[0].pass_number, 1);
    assert_eq!(h.engine.metrics().escalations, 1);
}

#[tokio::test]
async fn test_evidence_is_append_only_and_replayable() {
    let config = EngineConfig {
        max_passes: 3,
        ..EngineConfig::default()
    };
    let h = harness(config, MockProvider::new(SUPPORTS));
    let id = seed(&h, "org:acme", 0.05);
    h.search.add_results("org:acme", vec![document(1)]);

    let before = evidence_count(&h, id);
    let report = h.engine.run_cycle().await.unwrap();
    assert_eq!(report.passes, 3);

    // The same URL is not turned into evidence twice across passes
    let after_cycle = evidence_count(&h, id);
    assert!(after_cycle >= before);
    assert_eq!(after_cycle, 1);
    assert_eq!(load(&h, id).pass_count(), 3);

    // Signals still attach once the pass budget is spent
    h.engine
        .ingest_signal(Signal::new("org:acme", "procurement", "Board minutes mention a new platform", NOW))
        .await
        .unwrap();
    assert_eq!(evidence_count(&h, id), after_cycle + 1);

    let hypothesis = load(&h, id);
    let evidence = h.store.lock().unwrap().evidence_for(id).unwrap();
    let replayed = confidence::replay(hypothesis.prior_confidence(), &evidence);
    assert!((replayed - hypothesis.confidence()).abs() < 1e-9);
    assert_eq!(hypothesis.evidence_ids().len(), evidence.len());
}

#[tokio::test]
async fn test_budget_expiry_writes_nothing_in_flight() {
    let config = EngineConfig {
        cycle_budget_secs: 1,
        call_timeout_ms: 5_000,
        ..EngineConfig::default()
    };
    let h = harness(config, MockProvider::new(SUPPORTS));
    let id = seed(&h, "org:acme", 0.2);
    h.search.add_results("org:acme", vec![document(1)]);
    h.search.delay_for("org:acme", Duration::from_millis(1_500));

    let report = h.engine.run_cycle().await.unwrap();

    assert_eq!(report.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(report.passes, 0);
    assert_eq!(evidence_count(&h, id), 0);
    assert_eq!(load(&h, id).pass_count(), 0);
    assert_eq!(h.engine.metrics().budget_exhausted, 1);
    assert!(h.store.lock().unwrap().current_lease(ORCHESTRATOR_LEASE).unwrap().is_none());
}

#[tokio::test]
async fn test_signal_creates_then_attaches() {
    let h = harness(EngineConfig::default(), MockProvider::default());
    h.graph.add_entity("org:acme", ("sector", "Health Care"), 3);

    let first = h
        .engine
        .ingest_signal(Signal::new("org:acme", "procurement", "Budget approved for EHR", NOW))
        .await
        .unwrap();
    assert!(first.created);
    // 0.1 + 0.3 * 0.9
    assert!((first.confidence - 0.37).abs() < 1e-9);
    assert_eq!(first.band, Band::Informed);

    let created = load(&h, first.hypothesis_id);
    assert_eq!(created.cluster_id.as_deref(), Some("procurement/health-care"));
    assert_eq!(created.pass_count(), 0);
    assert!((created.novelty - 1.0).abs() < 1e-9);

    let second = h
        .engine
        .ingest_signal(Signal::new("org:acme", "procurement", "Vendor shortlist leaked", NOW + 60))
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.hypothesis_id, first.hypothesis_id);

    let attached = load(&h, first.hypothesis_id);
    assert_eq!(evidence_count(&h, attached.id), 2);
    assert_eq!(attached.pass_count(), 0);
    assert!((attached.novelty - 0.8).abs() < 1e-9);

    // A later hypothesis in the same category starts less novel
    h.graph.fail_for("org:beta", CollaboratorError::Unavailable("graph down".to_string()));
    let other = h
        .engine
        .ingest_signal(Signal::new("org:beta", "procurement", "Hiring a CIO", NOW))
        .await
        .unwrap();
    let beta = load(&h, other.hypothesis_id);
    assert!((beta.novelty - 0.8).abs() < 1e-9);
    assert_eq!(beta.cluster_id.as_deref(), Some("procurement"));

    let metrics = h.engine.metrics();
    assert_eq!(metrics.signals_ingested, 3);
    assert_eq!(metrics.hypotheses_created, 2);
}

#[tokio::test]
async fn test_invalid_signals_rejected() {
    let h = harness(EngineConfig::default(), MockProvider::default());
    for signal in [
        Signal::new("", "procurement", "payload", NOW),
        Signal::new("org:acme", "  ", "payload", NOW),
        Signal::new("org:acme", "procurement", "   ", NOW),
        Signal::new("org:acme", "procurement", "payload", NOW).with_source_type(""),
    ] {
        assert!(matches!(
            h.engine.ingest_signal(signal).await,
            Err(EngineError::InvalidSignal(_))
        ));
    }
}

#[tokio::test]
async fn test_long_signal_payload_is_truncated() {
    let config = EngineConfig {
        max_snippet_chars: 20,
        ..EngineConfig::default()
    };
    let h = harness(config, MockProvider::default());
    let receipt = h
        .engine
        .ingest_signal(Signal::new("org:acme", "procurement", "é".repeat(100), NOW))
        .await
        .unwrap();

    let evidence = h.store.lock().unwrap().evidence_for(receipt.hypothesis_id).unwrap();
    assert_eq!(evidence[0].payload_summary.chars().count(), 20);
}

#[tokio::test]
async fn test_outcome_recorded_exactly_once() {
    let h = harness(EngineConfig::default(), MockProvider::default());
    let receipt = h
        .engine
        .ingest_signal(Signal::new("org:acme", "procurement", "RFP expected in Q3", NOW))
        .await
        .unwrap();
    let before = h.engine.refresh_feedback().unwrap().version();

    let record = h.engine.record_outcome(receipt.hypothesis_id, Outcome::Accept, 0.9).unwrap();
    assert_eq!(record.source_types, vec!["signal".to_string()]);
    assert_eq!(load(&h, receipt.hypothesis_id).status(), HypothesisStatus::Promoted);

    let again = h.engine.record_outcome(receipt.hypothesis_id, Outcome::Reject, 0.1);
    assert!(matches!(again, Err(EngineError::OutcomeAlreadyRecorded(_))));
    assert_eq!(load(&h, receipt.hypothesis_id).status(), HypothesisStatus::Promoted);

    let snapshot = h.engine.feedback_snapshot();
    assert!(snapshot.version() > before);
    assert!(snapshot.estimate("procurement", "signal") > 0.3);
    assert_eq!(h.engine.metrics().outcomes_recorded, 1);
}

#[tokio::test]
async fn test_outcome_validation_and_terminal_hypotheses() {
    let config = EngineConfig {
        max_passes: 1,
        ..EngineConfig::default()
    };
    let h = harness(config, MockProvider::default());
    let id = seed(&h, "org:quiet", 0.1);

    assert_eq!(
        h.engine.record_outcome(id, Outcome::Accept, 1.5),
        Err(EngineError::InvalidScore(1.5))
    );
    assert!(matches!(
        h.engine.record_outcome(HypothesisId::new(), Outcome::Accept, 0.5),
        Err(EngineError::HypothesisNotFound(_))
    ));

    // Rejected by exhaustion; a later outcome keeps the status
    h.engine.run_cycle().await.unwrap();
    assert_eq!(load(&h, id).status(), HypothesisStatus::Rejected);
    let record = h.engine.record_outcome(id, Outcome::WeakAccept, 0.4).unwrap();
    assert_eq!(record.outcome, Outcome::WeakAccept);
    assert_eq!(load(&h, id).status(), HypothesisStatus::Rejected);
}

#[tokio::test]
async fn test_episodes_feed_temporal_context() {
    let h = harness(EngineConfig::default(), MockProvider::default());
    let day = 86_400;

    let funding = h
        .engine
        .record_episode(Episode::new("org:acme", "funding", "Series B closed", NOW - 10 * day, NOW - 10 * day))
        .unwrap();
    let invalid = h.engine.record_episode(
        Episode::new("org:acme", "funding", "Bad window", NOW, NOW).with_valid_before(NOW - day),
    );
    assert!(matches!(invalid, Err(EngineError::InvalidEpisode(_))));

    let wrong_entity = h
        .engine
        .record_episode(Episode::new("org:beta", "funding", "Correction", NOW, NOW).invalidating(funding));
    assert!(matches!(wrong_entity, Err(EngineError::InvalidEpisode(_))));

    let context = h.engine.temporal_context("org:acme").unwrap();
    assert_eq!(context.episode_count, 1);
    assert!(context.narrative.contains("funding: Series B closed"));
    assert!(context.adjustment > 0.0);
}

#[tokio::test]
async fn test_priorities_follow_eig() {
    let h = harness(EngineConfig::default(), MockProvider::default());
    let low = seed(&h, "org:low", 0.25);
    let high = seed(&h, "org:high", 0.05);

    let priorities = h.engine.priorities().unwrap();
    assert_eq!(priorities.len(), 2);
    assert_eq!(priorities[0].hypothesis_id, high);
    assert_eq!(priorities[1].hypothesis_id, low);
    assert!(priorities[0].eig > priorities[1].eig);
}

#[tokio::test]
async fn test_large_drop_is_not_escalated() {
    let config = EngineConfig {
        max_passes: 1,
        ..EngineConfig::default()
    };
    let h = harness(config, MockProvider::new(CONTRADICTS));
    let id = seed(&h, "org:acme", 0.55);
    h.graph.add_entity("org:acme", ("sector", "health care"), 12);
    h.search.add_results("org:acme", vec![document(1), document(2)]);

    let report = h.engine.run_cycle().await.unwrap();

    assert_eq!(report.escalated, 0);
    assert_eq!(report.rejected, 1);
    let dropped = load(&h, id);
    // 0.55 -> 0.37 -> 0.055 -> 0.0, then rejected on exhaustion
    assert!(dropped.confidence().abs() < 1e-9);
    assert_eq!(dropped.band(), Band::Exploratory);
    assert_eq!(dropped.status(), HypothesisStatus::Rejected);
    assert!(h.store.lock().unwrap().anomalies(None).unwrap().is_empty());
    assert_eq!(h.engine.metrics().escalations, 0);
}

/// SQLite store where a competing writer bumps a hypothesis's version
/// right before each of its next `n` writes
struct ContendedStore {
    inner: SqliteStore,
    contention: HashMap<HypothesisId, usize>,
}

impl ContendedStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::new(":memory:", BandThresholds::default()).unwrap(),
            contention: HashMap::new(),
        }
    }

    fn contend(&mut self, id: HypothesisId, writes: usize) {
        self.contention.insert(id, writes);
    }

    fn interfere(&mut self, id: HypothesisId) -> Result<(), StoreError> {
        match self.contention.get_mut(&id) {
            Some(left) if *left > 0 => *left -= 1,
            _ => return Ok(()),
        }
        if let Some(current) = self.inner.get_hypothesis(id)? {
            self.inner.commit_update(HypothesisUpdate::new(&current))?;
        }
        Ok(())
    }
}

impl EngineStore for ContendedStore {
    type Error = StoreError;

    fn insert_hypothesis(&mut self, hypothesis: &Hypothesis, evidence: &[Evidence]) -> Result<(), StoreError> {
        self.inner.insert_hypothesis(hypothesis, evidence)
    }

    fn get_hypothesis(&self, id: HypothesisId) -> Result<Option<Hypothesis>, StoreError> {
        self.inner.get_hypothesis(id)
    }

    fn find_active(&self, entity_id: &str, category: &str) -> Result<Option<Hypothesis>, StoreError> {
        self.inner.find_active(entity_id, category)
    }

    fn query_hypotheses(&self, query: &HypothesisQuery) -> Result<Vec<Hypothesis>, StoreError> {
        self.inner.query_hypotheses(query)
    }

    fn commit_update(&mut self, update: HypothesisUpdate<'_>) -> Result<CommitOutcome, StoreError> {
        self.interfere(update.hypothesis.id)?;
        self.inner.commit_update(update)
    }

    fn evidence_for(&self, id: HypothesisId) -> Result<Vec<Evidence>, StoreError> {
        self.inner.evidence_for(id)
    }

    fn query_evidence(&self, query: &EvidenceQuery) -> Result<Vec<Evidence>, StoreError> {
        self.inner.query_evidence(query)
    }

    fn append_episode(&mut self, episode: &Episode) -> Result<(), StoreError> {
        self.inner.append_episode(episode)
    }

    fn get_episode(&self, id: EpisodeId) -> Result<Option<Episode>, StoreError> {
        self.inner.get_episode(id)
    }

    fn episodes_for(&self, entity_id: &str) -> Result<Vec<Episode>, StoreError> {
        self.inner.episodes_for(entity_id)
    }

    fn record_outcome(
        &mut self,
        record: &OutcomeRecord,
        hypothesis: Option<&Hypothesis>,
    ) -> Result<CommitOutcome, StoreError> {
        if let Some(h) = hypothesis {
            self.interfere(h.id)?;
        }
        self.inner.record_outcome(record, hypothesis)
    }

    fn outcome_for(&self, id: HypothesisId) -> Result<Option<OutcomeRecord>, StoreError> {
        self.inner.outcome_for(id)
    }

    fn recent_outcomes(&self, limit: Option<usize>) -> Result<Vec<OutcomeRecord>, StoreError> {
        self.inner.recent_outcomes(limit)
    }

    fn anomalies(&self, limit: Option<usize>) -> Result<Vec<AnomalyRecord>, StoreError> {
        self.inner.anomalies(limit)
    }

    fn try_acquire_lease(&mut self, request: &CycleLease, now: u64) -> Result<LeaseOutcome, StoreError> {
        self.inner.try_acquire_lease(request, now)
    }

    fn release_lease(&mut self, name: &str, owner: &str) -> Result<bool, StoreError> {
        self.inner.release_lease(name, owner)
    }

    fn current_lease(&self, name: &str) -> Result<Option<CycleLease>, StoreError> {
        self.inner.current_lease(name)
    }

    fn snapshot(&self) -> Result<PopulationSnapshot, StoreError> {
        self.inner.snapshot()
    }
}

type ContendedEngine = Engine<ContendedStore, MockProvider, MockGraph, MockSearch>;

fn contended(config: EngineConfig) -> (ContendedEngine, Arc<Mutex<ContendedStore>>, MockSearch) {
    let store = Arc::new(Mutex::new(ContendedStore::new()));
    let search = MockSearch::new();
    let engine = Engine::new(
        Arc::clone(&store),
        Arc::new(MockProvider::new(SUPPORTS)),
        Arc::new(MockGraph::new()),
        Arc::new(search.clone()),
        config,
    )
    .unwrap()
    .with_clock(Clock::manual(NOW));
    (engine, store, search)
}

fn seed_contended(store: &Arc<Mutex<ContendedStore>>, entity: &str) -> HypothesisId {
    let hypothesis = Hypothesis::new(entity, "procurement", 0.2, 1.0, &BandThresholds::default(), NOW);
    store.lock().unwrap().insert_hypothesis(&hypothesis, &[]).unwrap();
    hypothesis.id
}

#[tokio::test]
async fn test_pass_conflict_retried_once_then_deferred() {
    let config = EngineConfig {
        max_passes: 1,
        ..EngineConfig::default()
    };
    let (engine, store, search) = contended(config);
    let retried = seed_contended(&store, "org:acme");
    let deferred = seed_contended(&store, "org:beta");
    search.add_results("org:", vec![document(1)]);
    store.lock().unwrap().contend(retried, 1);
    store.lock().unwrap().contend(deferred, 2);

    let report = engine.run_cycle().await.unwrap();

    // pass 1 commits the retried hypothesis and defers the other; pass 2 picks it up
    assert_eq!(report.deferred, 1);
    assert_eq!(report.passes, 2);
    assert_eq!(report.hypotheses_updated, 2);
    let metrics = engine.metrics();
    assert_eq!(metrics.conflicts_retried, 2);
    assert_eq!(metrics.conflicts_deferred, 1);

    let guard = store.lock().unwrap();
    let first = guard.get_hypothesis(retried).unwrap().unwrap();
    assert_eq!(first.pass_count(), 1);
    assert_eq!(first.version, 2);
    assert_eq!(guard.evidence_for(retried).unwrap().len(), 1);

    // the deferred attempt neither counted a pass nor left evidence behind
    let second = guard.get_hypothesis(deferred).unwrap().unwrap();
    assert_eq!(second.pass_count(), 1);
    assert_eq!(second.version, 3);
    assert_eq!(guard.evidence_for(deferred).unwrap().len(), 1);
    assert!((second.confidence() - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn test_signal_attach_conflict_retried_once() {
    let (engine, store, _search) = contended(EngineConfig::default());
    let id = seed_contended(&store, "org:acme");

    store.lock().unwrap().contend(id, 1);
    let receipt = engine
        .ingest_signal(Signal::new("org:acme", "procurement", "Issued an RFP for fleet telematics", NOW))
        .await
        .unwrap();
    assert_eq!(receipt.hypothesis_id, id);
    assert!(!receipt.created);
    assert_eq!(engine.metrics().conflicts_retried, 1);

    store.lock().unwrap().contend(id, 2);
    let result = engine
        .ingest_signal(Signal::new("org:acme", "procurement", "Shortlisted three vendors", NOW))
        .await;
    assert!(matches!(result, Err(EngineError::ConcurrencyConflict(_))));
    assert_eq!(engine.metrics().conflicts_deferred, 1);
    assert_eq!(store.lock().unwrap().evidence_for(id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_outcome_conflict_retried_once() {
    let (engine, store, _search) = contended(EngineConfig::default());
    let accepted = seed_contended(&store, "org:acme");
    let contested = seed_contended(&store, "org:beta");

    store.lock().unwrap().contend(accepted, 1);
    engine.record_outcome(accepted, Outcome::Accept, 0.9).unwrap();

    store.lock().unwrap().contend(contested, 2);
    let result = engine.record_outcome(contested, Outcome::Reject, 0.1);
    assert!(matches!(result, Err(EngineError::ConcurrencyConflict(_))));

    let metrics = engine.metrics();
    assert_eq!(metrics.conflicts_retried, 2);
    assert_eq!(metrics.conflicts_deferred, 1);

    let guard = store.lock().unwrap();
    assert_eq!(guard.get_hypothesis(accepted).unwrap().unwrap().status(), HypothesisStatus::Promoted);
    assert!(guard.outcome_for(accepted).unwrap().is_some());
    assert_eq!(guard.get_hypothesis(contested).unwrap().unwrap().status(), HypothesisStatus::Active);
    assert!(guard.outcome_for(contested).unwrap().is_none());
}
