//! Deterministic collaborator doubles
//!
//! These return pre-configured responses without making any network calls.
//! Clones share state, so a test can keep a handle for assertions after
//! moving a copy into the engine.

use crate::LlmError;
use augur_domain::traits::{
    CollaboratorError, EntityProfile, KnowledgeGraph, LlmProvider as LlmProviderTrait, SearchDocument, SearchQuery,
    WebSearch,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock LLM provider for deterministic testing
///
/// # Examples
///
/// ```
/// use augur_providers::MockProvider;
/// use augur_domain::traits::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Multiple responses
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.add_response_containing("acme", "response2");
/// assert_eq!(provider.generate("prompt1").unwrap(), "response1");
/// assert_eq!(provider.generate("about acme corp").unwrap(), "response2");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    containing: Arc<Mutex<Vec<(String, String)>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            containing: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.responses.lock().unwrap().insert(prompt.into(), response.into());
    }

    /// Respond to any prompt containing `fragment`; earlier fragments win
    pub fn add_response_containing(&mut self, fragment: impl Into<String>, response: impl Into<String>) {
        self.containing.lock().unwrap().push((fragment.into(), response.into()));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        self.responses.lock().unwrap().insert(prompt.into(), "ERROR".to_string());
    }

    /// Sleep before every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *self.call_count.lock().unwrap() = 0;
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        *self.call_count.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let response = self.responses.lock().unwrap().get(prompt).cloned().or_else(|| {
            self.containing
                .lock()
                .unwrap()
                .iter()
                .find(|(fragment, _)| prompt.contains(fragment.as_str()))
                .map(|(_, response)| response.clone())
        });

        match response {
            Some(r) if r == "ERROR" => Err(LlmError::Other("Mock error".to_string())),
            Some(r) => Ok(r),
            None => Ok(self.default_response.clone()),
        }
    }

    fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        self.generate(prompt)
    }
}

/// Scripted behaviour shared by the search and graph doubles
#[derive(Debug, Default)]
struct Script {
    failures: BTreeMap<String, CollaboratorError>,
    delays: BTreeMap<String, Duration>,
    calls: usize,
}

impl Script {
    /// Sleep and fail as scripted for the first key matching `subject`
    fn play(script: &Mutex<Script>, subject: &str) -> Result<(), CollaboratorError> {
        let (delay, failure) = {
            let mut s = script.lock().unwrap();
            s.calls += 1;
            let delay = s.delays.iter().find(|(k, _)| subject.contains(k.as_str())).map(|(_, d)| *d);
            let failure = s
                .failures
                .iter()
                .find(|(k, _)| subject.contains(k.as_str()))
                .map(|(_, e)| e.clone());
            (delay, failure)
        };

        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Mock web search keyed by query fragment (typically the entity id)
#[derive(Debug, Clone, Default)]
pub struct MockSearch {
    results: Arc<Mutex<BTreeMap<String, Vec<SearchDocument>>>>,
    script: Arc<Mutex<Script>>,
    queries: Arc<Mutex<Vec<SearchQuery>>>,
}

impl MockSearch {
    /// Create an empty mock that returns no documents
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `documents` for queries containing `fragment`
    pub fn add_results(&self, fragment: impl Into<String>, documents: Vec<SearchDocument>) {
        self.results.lock().unwrap().insert(fragment.into(), documents);
    }

    /// Fail queries containing `fragment`
    pub fn fail_for(&self, fragment: impl Into<String>, error: CollaboratorError) {
        self.script.lock().unwrap().failures.insert(fragment.into(), error);
    }

    /// Delay queries containing `fragment`
    pub fn delay_for(&self, fragment: impl Into<String>, delay: Duration) {
        self.script.lock().unwrap().delays.insert(fragment.into(), delay);
    }

    /// Number of searches served
    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().calls
    }

    /// Queries received, in order
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl WebSearch for MockSearch {
    type Error = CollaboratorError;

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchDocument>, Self::Error> {
        self.queries.lock().unwrap().push(query.clone());
        Script::play(&self.script, &query.text)?;

        let results = self.results.lock().unwrap();
        let documents = results
            .iter()
            .find(|(fragment, _)| query.text.contains(fragment.as_str()))
            .map(|(_, docs)| docs.iter().take(query.max_results).cloned().collect())
            .unwrap_or_default();
        Ok(documents)
    }
}

/// Mock knowledge graph keyed by exact entity id
#[derive(Debug, Clone, Default)]
pub struct MockGraph {
    profiles: Arc<Mutex<HashMap<String, EntityProfile>>>,
    script: Arc<Mutex<Script>>,
}

impl MockGraph {
    /// Create an empty graph that knows no entities
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile
    pub fn add_profile(&self, profile: EntityProfile) {
        self.profiles.lock().unwrap().insert(profile.entity_id.clone(), profile);
    }

    /// Register an entity with one attribute and a relationship count
    pub fn add_entity(&self, entity_id: &str, attribute: (&str, &str), relationship_count: usize) {
        let mut attributes = BTreeMap::new();
        attributes.insert(attribute.0.to_string(), attribute.1.to_string());
        self.add_profile(EntityProfile {
            entity_id: entity_id.to_string(),
            attributes,
            relationship_count,
            related: Vec::new(),
        });
    }

    /// Fail lookups of entities whose id contains `fragment`
    pub fn fail_for(&self, fragment: impl Into<String>, error: CollaboratorError) {
        self.script.lock().unwrap().failures.insert(fragment.into(), error);
    }

    /// Delay lookups of entities whose id contains `fragment`
    pub fn delay_for(&self, fragment: impl Into<String>, delay: Duration) {
        self.script.lock().unwrap().delays.insert(fragment.into(), delay);
    }

    /// Number of lookups served
    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().calls
    }
}

impl KnowledgeGraph for MockGraph {
    type Error = CollaboratorError;

    fn lookup(&self, entity_id: &str, limit: usize) -> Result<Option<EntityProfile>, Self::Error> {
        Script::play(&self.script, entity_id)?;
        Ok(self.profiles.lock().unwrap().get(entity_id).cloned().map(|mut p| {
            p.related.truncate(limit);
            p
        }))
    }
}
