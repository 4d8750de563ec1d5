//! Enrichment: collaborator calls that turn into candidate evidence
//!
//! Collaborators are synchronous. Every call runs on the blocking pool
//! under a hard timeout and is retried with exponential backoff on
//! transient errors. Nothing here writes to the store.

use crate::config::EngineConfig;
use crate::feedback::InformationValueSnapshot;
use crate::judge::{parse_judgment, Judgment, PromptBuilder, JUDGMENT_SCHEMA};
use crate::metrics::EngineMetrics;
use crate::text::bounded;
use augur_domain::traits::{CollaboratorError, EntityProfile, KnowledgeGraph, LlmProvider, SearchDocument, SearchQuery, WebSearch};
use augur_domain::{source_types, Hypothesis, HypothesisId, Observation, Polarity};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout and retry rules for one collaborator call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    /// Hard timeout per attempt
    pub timeout: Duration,
    /// Retries after a transient failure
    pub retries: u32,
    /// First backoff, doubled per retry
    pub backoff: Duration,
}

impl CallPolicy {
    /// Policy from the engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            timeout: config.call_timeout(),
            retries: config.transient_retries,
            backoff: config.retry_backoff(),
        }
    }
}

/// Degradation counters for one hypothesis's enrichment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStats {
    /// Attempts that hit the timeout
    pub timeouts: usize,
    /// Calls that failed after retries
    pub failures: usize,
    /// Retries issued
    pub retries: usize,
    /// Candidates or responses discarded as malformed
    pub malformed: usize,
    /// Judgments that fell back to neutral
    pub judge_fallbacks: usize,
}

impl CallStats {
    pub(crate) fn apply(&self, metrics: &mut EngineMetrics) {
        metrics.collaborator_timeouts += self.timeouts;
        metrics.collaborator_failures += self.failures;
        metrics.collaborator_retries += self.retries;
        metrics.malformed_discarded += self.malformed;
        metrics.judge_fallbacks += self.judge_fallbacks;
    }
}

/// Run a blocking collaborator call under `policy`
pub async fn call_collaborator<T, E, F>(
    name: &str,
    policy: CallPolicy,
    stats: &mut CallStats,
    f: F,
) -> Result<T, CollaboratorError>
where
    F: FnOnce() -> Result<T, E> + Clone + Send + 'static,
    T: Send + 'static,
    E: Into<CollaboratorError> + Send + 'static,
{
    let mut attempt: u32 = 0;
    loop {
        let task = tokio::task::spawn_blocking(f.clone());
        let result = match tokio::time::timeout(policy.timeout, task).await {
            Ok(Ok(result)) => result.map_err(Into::into),
            Ok(Err(e)) => Err(CollaboratorError::Unavailable(format!("{} task failed: {}", name, e))),
            Err(_) => {
                stats.timeouts += 1;
                Err(CollaboratorError::Transient(format!("{} timed out after {:?}", name, policy.timeout)))
            }
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.retries => {
                let delay = policy.backoff.saturating_mul(2u32.saturating_pow(attempt));
                attempt += 1;
                stats.retries += 1;
                debug!("{} failed ({}), retrying in {:?} ({}/{})", name, e, delay, attempt, policy.retries);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                match e {
                    CollaboratorError::Malformed(_) => stats.malformed += 1,
                    _ => stats.failures += 1,
                }
                return Err(e);
            }
        }
    }
}

/// Everything enrichment needs about one selected hypothesis
#[derive(Debug, Clone)]
pub struct EnrichmentRequest {
    /// Snapshot of the hypothesis at selection time
    pub hypothesis: Hypothesis,
    /// Source URLs already present in its evidence
    pub known_urls: HashSet<String>,
    /// Temporal narrative for the judge
    pub narrative: String,
    /// Temporal adjustment (reserved boost, reported only)
    pub temporal_adjustment: f64,
    /// Information value estimates in force for this cycle
    pub snapshot: Arc<InformationValueSnapshot>,
    /// Time stamped on candidates without their own
    pub now: u64,
}

/// Judged candidates for one hypothesis
#[derive(Debug, Clone)]
pub struct Enrichment {
    /// Hypothesis enriched
    pub hypothesis_id: HypothesisId,
    /// Candidates in gathering order, polarity set by the judge
    pub observations: Vec<Observation>,
    /// A fetch failed; the hypothesis gets no evidence this pass
    pub degraded: bool,
    /// Reserved temporal boost computed for this hypothesis
    pub temporal_adjustment: f64,
    /// Degradation counters
    pub stats: CallStats,
}

/// Collaborators plus the enrichment limits
pub struct Enricher<L, G, W> {
    llm: Arc<L>,
    graph: Arc<G>,
    search: Arc<W>,
    policy: CallPolicy,
    max_search_results: usize,
    graph_result_limit: usize,
    prompt_budget_chars: usize,
    max_snippet_chars: usize,
}

impl<L, G, W> Enricher<L, G, W>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Into<CollaboratorError> + Send + 'static,
    G: KnowledgeGraph + Send + Sync + 'static,
    G::Error: Into<CollaboratorError> + Send + 'static,
    W: WebSearch + Send + Sync + 'static,
    W::Error: Into<CollaboratorError> + Send + 'static,
{
    /// Create an enricher
    pub fn new(llm: Arc<L>, graph: Arc<G>, search: Arc<W>, config: &EngineConfig) -> Self {
        Self {
            llm,
            graph,
            search,
            policy: CallPolicy::from_config(config),
            max_search_results: config.max_search_results,
            graph_result_limit: config.graph_result_limit,
            prompt_budget_chars: config.prompt_budget_chars,
            max_snippet_chars: config.max_snippet_chars,
        }
    }

    /// Knowledge graph lookup under the call policy
    pub async fn lookup(&self, entity_id: &str, stats: &mut CallStats) -> Result<Option<EntityProfile>, CollaboratorError> {
        let graph = Arc::clone(&self.graph);
        let entity = entity_id.to_string();
        let limit = self.graph_result_limit;
        call_collaborator("knowledge graph", self.policy, stats, move || graph.lookup(&entity, limit)).await
    }

    /// Gather and judge candidates for one hypothesis
    pub async fn enrich(&self, request: EnrichmentRequest) -> Enrichment {
        let h = &request.hypothesis;
        let mut stats = CallStats::default();
        let mut candidates = Vec::new();
        let mut degraded = false;

        match self.lookup(&h.entity_id, &mut stats).await {
            Ok(Some(profile)) => match profile_observation(&profile, request.now) {
                Some(obs) => candidates.push(obs),
                None => {
                    stats.malformed += 1;
                    warn!("Discarding empty graph profile for {}", h.entity_id);
                }
            },
            Ok(None) => debug!("No graph profile for {}", h.entity_id),
            Err(CollaboratorError::Malformed(msg)) => warn!("Discarding graph response for {}: {}", h.entity_id, msg),
            Err(e) => {
                warn!("Graph lookup degraded for hypothesis {}: {}", h.id, e);
                degraded = true;
            }
        }

        if !degraded {
            let query = SearchQuery {
                text: search_text(h),
                max_results: self.max_search_results,
            };
            let search = Arc::clone(&self.search);
            match call_collaborator("web search", self.policy, &mut stats, move || search.search(&query)).await {
                Ok(documents) => {
                    let mut seen = request.known_urls.clone();
                    for doc in documents {
                        match self.document_observation(doc, request.now) {
                            Some(obs) => {
                                let url = obs.source_url.clone().unwrap_or_default();
                                if seen.insert(url) {
                                    candidates.push(obs);
                                } else {
                                    debug!("Skipping already-seen source for {}", h.id);
                                }
                            }
                            None => stats.malformed += 1,
                        }
                    }
                }
                Err(CollaboratorError::Malformed(msg)) => warn!("Discarding search response for {}: {}", h.entity_id, msg),
                Err(e) => {
                    warn!("Web search degraded for hypothesis {}: {}", h.id, e);
                    degraded = true;
                }
            }
        }

        if degraded {
            candidates.clear();
        }

        let mut observations = Vec::with_capacity(candidates.len());
        for mut obs in candidates {
            obs.information_value = request.snapshot.estimate(&h.category, &obs.source_type);
            let judgment = self.judge(h, &obs, &request.narrative, &mut stats).await;
            obs.polarity = judgment.polarity;
            obs.rationale = judgment.rationale;
            observations.push(obs);
        }

        debug!(
            "Enriched {} with {} candidates (temporal_boost {:.3}, reserved)",
            h.id,
            observations.len(),
            request.temporal_adjustment
        );

        Enrichment {
            hypothesis_id: h.id,
            observations,
            degraded,
            temporal_adjustment: request.temporal_adjustment,
            stats,
        }
    }

    async fn judge(&self, h: &Hypothesis, candidate: &Observation, narrative: &str, stats: &mut CallStats) -> Judgment {
        let prompt = PromptBuilder::new(h, candidate)
            .with_narrative(narrative)
            .build(self.prompt_budget_chars);
        let llm = Arc::clone(&self.llm);

        let response = call_collaborator("reasoning judge", self.policy, stats, move || {
            llm.generate_structured(&prompt, JUDGMENT_SCHEMA)
        })
        .await;

        match response.and_then(|text| parse_judgment(&text)) {
            Ok(judgment) => judgment,
            Err(e) => {
                stats.judge_fallbacks += 1;
                warn!("Judge fell back to neutral for {}: {}", h.id, e);
                Judgment::neutral()
            }
        }
    }

    fn document_observation(&self, doc: SearchDocument, now: u64) -> Option<Observation> {
        let url = doc.url.trim();
        let snippet = bounded(&doc.snippet, self.max_snippet_chars);
        if url.is_empty() || snippet.is_empty() {
            return None;
        }
        let title = doc.title.trim();
        let summary = if title.is_empty() {
            snippet
        } else {
            bounded(&format!("{}: {}", title, snippet), self.max_snippet_chars)
        };
        Some(
            Observation::new(source_types::WEB_SEARCH, summary, doc.published_at.unwrap_or(now), 0.0, Polarity::Neutral)
                .with_url(url),
        )
    }
}

/// `"<entity> <category words>"`
fn search_text(h: &Hypothesis) -> String {
    let words: Vec<&str> = h
        .category
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    format!("{} {}", h.entity_id, words.join(" "))
}

/// One candidate summarizing a graph profile; `None` when it says nothing
fn profile_observation(profile: &EntityProfile, now: u64) -> Option<Observation> {
    if profile.attributes.is_empty() && profile.relationship_count == 0 {
        return None;
    }
    let attributes: Vec<String> = profile.attributes.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let mut summary = format!("{} relationships", profile.relationship_count);
    if !attributes.is_empty() {
        summary = format!("{}; {}", attributes.join(", "), summary);
    }
    if !profile.related.is_empty() {
        let related: Vec<&str> = profile.related.iter().take(5).map(String::as_str).collect();
        summary.push_str(&format!(" (e.g. {})", related.join(", ")));
    }
    Some(Observation::new(source_types::KNOWLEDGE_GRAPH, summary, now, 0.0, Polarity::Neutral))
}
