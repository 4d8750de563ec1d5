//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the engine and infrastructure.
//! All of them are synchronous; the engine drives collaborators on the
//! blocking pool under a timeout.

use crate::{
    AnomalyRecord, CycleLease, Episode, EpisodeId, Evidence, Hypothesis, HypothesisId, HypothesisStatus,
    LeaseOutcome, OutcomeRecord,
};
use std::collections::BTreeMap;
use std::fmt;

/// Result of a compare-and-set write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Write applied; carries the new version
    Committed(u64),
    /// Stored version no longer matches the expected one
    Conflict,
}

/// One atomic hypothesis update
///
/// `hypothesis.version` is the version the caller read; the store applies
/// the write only if it still matches.
#[derive(Debug, Clone, Copy)]
pub struct HypothesisUpdate<'a> {
    /// New hypothesis state
    pub hypothesis: &'a Hypothesis,
    /// Evidence to append in the same transaction
    pub evidence: &'a [Evidence],
    /// Audit entry to append in the same transaction
    pub anomaly: Option<&'a AnomalyRecord>,
}

impl<'a> HypothesisUpdate<'a> {
    /// Update carrying only the hypothesis row
    pub fn new(hypothesis: &'a Hypothesis) -> Self {
        Self {
            hypothesis,
            evidence: &[],
            anomaly: None,
        }
    }

    /// Append evidence with the update
    pub fn with_evidence(mut self, evidence: &'a [Evidence]) -> Self {
        self.evidence = evidence;
        self
    }

    /// Append an anomaly record with the update
    pub fn with_anomaly(mut self, anomaly: &'a AnomalyRecord) -> Self {
        self.anomaly = Some(anomaly);
        self
    }
}

/// Durable storage for hypotheses, evidence, episodes, outcomes and leases
///
/// Implemented by the infrastructure layer (augur-store)
pub trait EngineStore {
    /// Error type for store operations
    type Error;

    /// Insert a new hypothesis together with its initial evidence
    fn insert_hypothesis(&mut self, hypothesis: &Hypothesis, evidence: &[Evidence]) -> Result<(), Self::Error>;

    /// Get a hypothesis by ID
    fn get_hypothesis(&self, id: HypothesisId) -> Result<Option<Hypothesis>, Self::Error>;

    /// Find the ACTIVE hypothesis for an entity and category
    fn find_active(&self, entity_id: &str, category: &str) -> Result<Option<Hypothesis>, Self::Error>;

    /// Query hypotheses matching criteria
    fn query_hypotheses(&self, query: &HypothesisQuery) -> Result<Vec<Hypothesis>, Self::Error>;

    /// Apply an update under compare-and-set on `version`
    fn commit_update(&mut self, update: HypothesisUpdate<'_>) -> Result<CommitOutcome, Self::Error>;

    /// Evidence of one hypothesis in append order
    fn evidence_for(&self, id: HypothesisId) -> Result<Vec<Evidence>, Self::Error>;

    /// Query evidence matching criteria, in append order
    fn query_evidence(&self, query: &EvidenceQuery) -> Result<Vec<Evidence>, Self::Error>;

    /// Append an episode
    fn append_episode(&mut self, episode: &Episode) -> Result<(), Self::Error>;

    /// Get an episode by ID
    fn get_episode(&self, id: EpisodeId) -> Result<Option<Episode>, Self::Error>;

    /// Episodes of an entity ordered by `valid_at`
    fn episodes_for(&self, entity_id: &str) -> Result<Vec<Episode>, Self::Error>;

    /// Record an outcome, optionally with the terminal hypothesis state
    ///
    /// The hypothesis write, when present, is compare-and-set like
    /// [`EngineStore::commit_update`]; on conflict nothing is written.
    fn record_outcome(
        &mut self,
        record: &OutcomeRecord,
        hypothesis: Option<&Hypothesis>,
    ) -> Result<CommitOutcome, Self::Error>;

    /// Outcome of a hypothesis, if recorded
    fn outcome_for(&self, id: HypothesisId) -> Result<Option<OutcomeRecord>, Self::Error>;

    /// Most recent outcomes first; all of them when `limit` is `None`
    fn recent_outcomes(&self, limit: Option<usize>) -> Result<Vec<OutcomeRecord>, Self::Error>;

    /// Most recent anomalies first; all of them when `limit` is `None`
    fn anomalies(&self, limit: Option<usize>) -> Result<Vec<AnomalyRecord>, Self::Error>;

    /// Take the named lease unless someone else holds it unexpired at `now`
    fn try_acquire_lease(&mut self, request: &CycleLease, now: u64) -> Result<LeaseOutcome, Self::Error>;

    /// Release the named lease if `owner` holds it; returns whether it did
    fn release_lease(&mut self, name: &str, owner: &str) -> Result<bool, Self::Error>;

    /// Current holder of the named lease, expired or not
    fn current_lease(&self, name: &str) -> Result<Option<CycleLease>, Self::Error>;

    /// Every hypothesis, outcome, evidence entry and anomaly as of one
    /// committed state
    fn snapshot(&self) -> Result<PopulationSnapshot, Self::Error>;
}

/// Whole-population read taken at a single point in the commit history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationSnapshot {
    /// All hypotheses, oldest first
    pub hypotheses: Vec<Hypothesis>,
    /// All outcomes, newest first
    pub outcomes: Vec<OutcomeRecord>,
    /// All evidence in append order
    pub evidence: Vec<Evidence>,
    /// All anomalies, newest first
    pub anomalies: Vec<AnomalyRecord>,
}

/// Query criteria for retrieving hypotheses
#[derive(Debug, Clone, Default)]
pub struct HypothesisQuery {
    /// Filter by status
    pub status: Option<HypothesisStatus>,

    /// Filter by entity
    pub entity_id: Option<String>,

    /// Filter by category
    pub category: Option<String>,

    /// Filter by cluster
    pub cluster_id: Option<String>,

    /// Only hypotheses created at or after this time
    pub created_after: Option<u64>,

    /// Only hypotheses created before this time
    pub created_before: Option<u64>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

impl HypothesisQuery {
    /// All ACTIVE hypotheses
    pub fn active() -> Self {
        Self {
            status: Some(HypothesisStatus::Active),
            ..Default::default()
        }
    }
}

/// Query criteria for retrieving evidence
#[derive(Debug, Clone, Default)]
pub struct EvidenceQuery {
    /// Filter by hypothesis
    pub hypothesis_id: Option<HypothesisId>,

    /// Filter by the entity of the owning hypothesis
    pub entity_id: Option<String>,

    /// Filter by the category of the owning hypothesis
    pub category: Option<String>,

    /// Filter by source type
    pub source_type: Option<String>,

    /// Only evidence observed at or after this time
    pub observed_after: Option<u64>,

    /// Only evidence observed before this time
    pub observed_before: Option<u64>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

/// Error reported by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Timeout, rate limit or dropped connection; worth retrying
    Transient(String),
    /// Response could not be understood
    Malformed(String),
    /// Collaborator is down or misconfigured; retrying will not help
    Unavailable(String),
}

impl CollaboratorError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CollaboratorError::Transient(_))
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorError::Transient(msg) => write!(f, "Transient collaborator error: {}", msg),
            CollaboratorError::Malformed(msg) => write!(f, "Malformed collaborator response: {}", msg),
            CollaboratorError::Unavailable(msg) => write!(f, "Collaborator unavailable: {}", msg),
        }
    }
}

impl std::error::Error for CollaboratorError {}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (augur-providers)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured output (if supported)
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;
}

/// What the knowledge graph knows about an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityProfile {
    /// Entity the profile describes
    pub entity_id: String,
    /// Entity attributes, e.g. `sector -> "health care"`
    pub attributes: BTreeMap<String, String>,
    /// Total number of relationships in the graph
    pub relationship_count: usize,
    /// Related entity ids, bounded by the lookup limit
    pub related: Vec<String>,
}

/// Read-only knowledge graph
///
/// Implemented by the infrastructure layer (augur-providers)
pub trait KnowledgeGraph {
    /// Error type for graph operations
    type Error;

    /// Look up an entity, returning at most `limit` related entities
    fn lookup(&self, entity_id: &str, limit: usize) -> Result<Option<EntityProfile>, Self::Error>;
}

/// Query sent to the web intelligence provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text query
    pub text: String,
    /// Maximum documents to return
    pub max_results: usize,
}

/// Candidate document returned by a search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchDocument {
    /// Document title
    pub title: String,
    /// Text snippet
    pub snippet: String,
    /// Source URL
    pub url: String,
    /// Publication time (seconds), if known
    pub published_at: Option<u64>,
}

/// Web intelligence / search provider
///
/// Implemented by the infrastructure layer (augur-providers)
pub trait WebSearch {
    /// Error type for search operations
    type Error;

    /// Run a search, returning at most `query.max_results` documents
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchDocument>, Self::Error>;
}
