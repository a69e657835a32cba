//! Application configuration for companyscout.
//!
//! User config lives at `~/.companyscout/companyscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "companyscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".companyscout";

// ---------------------------------------------------------------------------
// Config structs (matching companyscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Search service settings.
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum search queries generated per category.
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,

    /// Concurrent briefing synthesis tasks.
    #[serde(default = "default_briefing_concurrency")]
    pub briefing_concurrency: usize,

    /// Minimum relevance score a non-first-party document must meet.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    /// Curated documents kept per category.
    #[serde(default = "default_max_docs_per_category")]
    pub max_docs_per_category: usize,

    /// References listed in the final report.
    #[serde(default = "default_max_references")]
    pub max_references: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_queries: default_max_queries(),
            briefing_concurrency: default_briefing_concurrency(),
            relevance_threshold: default_relevance_threshold(),
            max_docs_per_category: default_max_docs_per_category(),
            max_references: default_max_references(),
        }
    }
}

fn default_max_queries() -> usize {
    4
}
fn default_briefing_concurrency() -> usize {
    2
}
fn default_relevance_threshold() -> f64 {
    0.4
}
fn default_max_docs_per_category() -> usize {
    30
}
fn default_max_references() -> usize {
    10
}

/// `[completion]` section — OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_completion_key_env")]
    pub api_key_env: String,

    /// Base URL of the completion service.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_completion_model")]
    pub model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_completion_key_env(),
            base_url: default_completion_base_url(),
            model: default_completion_model(),
        }
    }
}

fn default_completion_key_env() -> String {
    "COMPLETION_API_KEY".into()
}
fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_completion_model() -> String {
    "gpt-4o-mini".into()
}

/// `[search]` section — Tavily-style web search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Base URL of the search service.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            base_url: default_search_base_url(),
        }
    }
}

fn default_search_key_env() -> String {
    "SEARCH_API_KEY".into()
}
fn default_search_base_url() -> String {
    "https://api.tavily.com".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.companyscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.companyscout/companyscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the env var named in config. Absence is fatal.
pub fn resolve_api_key(var_name: &str, service: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ScoutError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that both service API keys are present before any pipeline stage runs.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    resolve_api_key(&config.completion.api_key_env, "completion service")?;
    resolve_api_key(&config.search.api_key_env, "search service")?;
    Ok(())
}
