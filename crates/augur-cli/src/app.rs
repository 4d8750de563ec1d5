//! Engine wiring from configuration.

use crate::config::Config;
use crate::error::{CliError, Result};
use augur_engine::Engine;
use augur_providers::{HttpGraphProvider, HttpSearchProvider, OllamaProvider};
use augur_store::SqliteStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Engine over SQLite and the HTTP collaborators.
pub type CliEngine = Engine<SqliteStore, OllamaProvider, HttpGraphProvider, HttpSearchProvider>;

/// Open the configured database.
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    if config.database_path != ":memory:" {
        if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    let thresholds = config.engine.thresholds()?;
    Ok(SqliteStore::new(&config.database_path, thresholds)?)
}

/// Build the engine and its collaborators on the blocking pool.
///
/// The blocking HTTP clients must not be constructed on an async worker
/// thread. No request is made until the engine calls a collaborator.
pub async fn build_engine(config: &Config) -> Result<Arc<CliEngine>> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || wire(&config))
        .await
        .map_err(|e| CliError::Provider(format!("engine construction failed: {}", e)))?
}

fn wire(config: &Config) -> Result<Arc<CliEngine>> {
    let store = open_store(config)?;

    let llm_cfg = &config.providers.llm;
    let llm = OllamaProvider::with_timeout(
        llm_cfg.endpoint.as_str(),
        llm_cfg.model.as_str(),
        Duration::from_secs(llm_cfg.timeout_secs),
    )
    .map_err(|e| CliError::Provider(e.to_string()))?
    .with_max_retries(llm_cfg.max_retries);

    let search_cfg = &config.providers.search;
    let mut search =
        HttpSearchProvider::with_timeout(search_cfg.endpoint.as_str(), Duration::from_secs(search_cfg.timeout_secs))
            .map_err(|e| CliError::Provider(e.to_string()))?;
    if let Some(key) = &search_cfg.api_key {
        search = search.with_api_key(key.as_str());
    }

    let graph_cfg = &config.providers.graph;
    let graph =
        HttpGraphProvider::with_timeout(graph_cfg.endpoint.as_str(), Duration::from_secs(graph_cfg.timeout_secs))
            .map_err(|e| CliError::Provider(e.to_string()))?;

    debug!(
        "Engine wired: db={}, llm={} ({}), search={}, graph={}",
        config.database_path, llm_cfg.endpoint, llm_cfg.model, search_cfg.endpoint, graph_cfg.endpoint
    );

    let engine = Engine::new(
        Arc::new(Mutex::new(store)),
        Arc::new(llm),
        Arc::new(graph),
        Arc::new(search),
        config.engine.clone(),
    )?;
    Ok(Arc::new(engine))
}

/// Run `f` against the engine's store.
pub fn with_store<T, E>(engine: &CliEngine, f: impl FnOnce(&SqliteStore) -> std::result::Result<T, E>) -> Result<T>
where
    E: Into<CliError>,
{
    let store = engine.store();
    let guard = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&guard).map_err(Into::into)
}
