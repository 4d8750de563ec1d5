//! Configuration management for the CLI.
//!
//! ```toml
//! database_path = "/home/me/.augur/augur.db"
//!
//! [engine]
//! max_passes = 4
//!
//! [providers.llm]
//! endpoint = "http://localhost:11434"
//! model = "llama3"
//!
//! [providers.search]
//! endpoint = "http://localhost:8089"
//!
//! [providers.graph]
//! endpoint = "http://localhost:8090"
//!
//! [worker]
//! interval_secs = 60
//! ```

use crate::error::{CliError, Result};
use augur_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Collaborator endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Background worker settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Output settings
    #[serde(default)]
    pub settings: Settings,
}

/// Collaborator endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Reasoning provider
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web intelligence provider
    #[serde(default)]
    pub search: SearchConfig,

    /// Knowledge graph provider
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Ollama settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama API endpoint
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// HTTP timeout (seconds)
    pub timeout_secs: u64,
    /// Attempts per request inside the provider
    pub max_retries: u32,
}

/// Search endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the search endpoint
    pub endpoint: String,
    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// HTTP timeout (seconds)
    pub timeout_secs: u64,
}

/// Knowledge graph endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL of the graph endpoint
    pub endpoint: String,
    /// HTTP timeout (seconds)
    pub timeout_secs: u64,
}

/// Worker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Seconds between cycles in watch mode
    pub interval_secs: u64,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Default configuration file path (`~/.augur/augur.toml`).
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".augur").join("augur.toml"))
    }

    /// Resolve an explicit path or fall back to the default one.
    pub fn resolve_path(explicit: Option<&str>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(PathBuf::from(path)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from file, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Self::from_toml(&contents)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.trim().is_empty() {
            return Err(CliError::Config("database_path must not be empty".into()));
        }
        if self.worker.interval_secs == 0 {
            return Err(CliError::Config("worker.interval_secs must be > 0".into()));
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Worker interval.
    pub fn worker_interval(&self) -> Duration {
        Duration::from_secs(self.worker.interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            engine: EngineConfig::default(),
            providers: ProvidersConfig::default(),
            worker: WorkerConfig::default(),
            settings: Settings::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8089".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8090".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_database_path() -> String {
    dirs::home_dir()
        .map(|home| home.join(".augur").join("augur.db").to_string_lossy().into_owned())
        .unwrap_or_else(|| "augur.db".to_string())
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database_path.ends_with("augur.db"));
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.providers.llm.model, "llama3");
        assert_eq!(config.worker.interval_secs, 60);
        assert!(config.settings.color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            database_path = "/tmp/augur-test.db"

            [engine]
            max_passes = 6

            [providers.llm]
            model = "mistral"

            [providers.search]
            api_key = "secret"

            [worker]
            interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, "/tmp/augur-test.db");
        assert_eq!(config.engine.max_passes, 6);
        assert_eq!(config.engine.top_k, EngineConfig::default().top_k);
        assert_eq!(config.providers.llm.model, "mistral");
        assert_eq!(config.providers.llm.endpoint, "http://localhost:11434");
        assert_eq!(config.providers.search.api_key.as_deref(), Some("secret"));
        assert_eq!(config.worker_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_engine_section() {
        let result = Config::from_toml("[engine]\ninformed = 0.7\nconfident = 0.6");
        assert!(matches!(result, Err(CliError::Engine(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = Config::from_toml("[worker]\ninterval_secs = 0");
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("augur.toml");

        let mut config = Config::default();
        config.database_path = dir.path().join("augur.db").to_string_lossy().into_owned();
        config.engine = EngineConfig::aggressive();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }
}
