//! Configuration loading, validation, and management for litscout.
//!
//! Loads configuration from `~/.litscout/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.litscout/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Pipeline tuning
    #[serde(default)]
    pub research: ResearchConfig,

    /// Knowledge store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Paper source configuration
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    2048
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("research", &self.research)
            .field("store", &self.store)
            .field("sources", &self.sources)
            .field("providers", &self.providers)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Discovery, extraction and quality-gate tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Discovery target per run; also feeds the skip-discovery threshold
    #[serde(default = "default_max_papers")]
    pub max_papers_per_search: usize,

    /// Seconds between successive result reads of scrape-style sources
    #[serde(default = "default_request_delay")]
    pub request_delay: f64,

    /// Per external call, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Discovery widening rounds
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Quality-gate retries before the run ends regardless of score
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound on the per-round search count
    #[serde(default = "default_search_cap")]
    pub search_cap: usize,

    /// Round backoff is `backoff_base_secs * attempt`
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Successful extractions per pass
    #[serde(default = "default_extraction_limit")]
    pub extraction_limit: usize,

    /// Minimum score for a stored match to count as relevant
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Store matches the existing-docs check asks for, on top of `max_papers_per_search`
    #[serde(default = "default_existing_docs_k")]
    pub existing_docs_k: usize,

    /// Extra distinct papers, beyond `max_papers_per_search`, needed to skip discovery
    #[serde(default = "default_skip_margin")]
    pub skip_margin: usize,

    /// Sections at or below this many characters are not indexed
    #[serde(default = "default_min_section_chars")]
    pub min_section_chars: usize,
}

fn default_max_papers() -> usize {
    10
}
fn default_request_delay() -> f64 {
    1.0
}
fn default_timeout() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_max_retries() -> u32 {
    2
}
fn default_search_cap() -> usize {
    75
}
fn default_backoff_base() -> u64 {
    2
}
fn default_extraction_limit() -> usize {
    10
}
fn default_relevance_threshold() -> f32 {
    0.8
}
fn default_existing_docs_k() -> usize {
    50
}
fn default_skip_margin() -> usize {
    10
}
fn default_min_section_chars() -> usize {
    100
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_papers_per_search: default_max_papers(),
            request_delay: default_request_delay(),
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            max_retries: default_max_retries(),
            search_cap: default_search_cap(),
            backoff_base_secs: default_backoff_base(),
            extraction_limit: default_extraction_limit(),
            relevance_threshold: default_relevance_threshold(),
            existing_docs_k: default_existing_docs_k(),
            skip_margin: default_skip_margin(),
            min_section_chars: default_min_section_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "file", "memory", or "none"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// JSONL file for the file backend (defaults to `~/.litscout/knowledge.jsonl`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// "provider" embeds through an LLM provider, "hashed" uses offline
    /// term vectors. Provider mode falls back to hashed when no key is set.
    #[serde(default = "default_embedder")]
    pub embedder: String,

    /// Provider serving embeddings (defaults to `default_provider`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_store_backend() -> String {
    "file".into()
}
fn default_embedder() -> String {
    "provider".into()
}
fn default_embedding_model() -> String {
    "openai/text-embedding-3-small".into()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedder: default_embedder(),
            embedding_provider: None,
            embedding_model: default_embedding_model(),
        }
    }
}

impl StoreConfig {
    /// The effective file path for the file backend.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("knowledge.jsonl"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub arxiv: ArxivSourceConfig,

    #[serde(default)]
    pub web: WebSourceConfig,

    #[serde(default)]
    pub semantic_scholar: SemanticScholarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ArxivSourceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Google Custom Search settings for the web source.
#[derive(Clone, Serialize, Deserialize)]
pub struct WebSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom Search Engine id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cse_id: Option<String>,
}

impl Default for WebSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            cse_id: None,
        }
    }
}

impl std::fmt::Debug for WebSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSourceConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &redact(&self.api_key))
            .field("cse_id", &self.cse_id)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SemanticScholarConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SemanticScholarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticScholarConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.litscout/config.toml).
    ///
    /// Also checks environment variables:
    /// - `LITSCOUT_API_KEY` (highest priority), `OPENROUTER_API_KEY`, `OPENAI_API_KEY`
    /// - `LITSCOUT_PROVIDER`, `LITSCOUT_MODEL`
    /// - `GOOGLE_API_KEY`, `GOOGLE_CSE_ID`, `SEMANTIC_SCHOLAR_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("LITSCOUT_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(provider) = lookup("LITSCOUT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("LITSCOUT_MODEL") {
            self.default_model = model;
        }

        if let Some(model) = lookup("LITSCOUT_EMBEDDING_MODEL") {
            self.store.embedding_model = model;
        }

        if self.sources.web.api_key.is_none() {
            self.sources.web.api_key = lookup("GOOGLE_API_KEY");
        }
        if self.sources.web.cse_id.is_none() {
            self.sources.web.cse_id = lookup("GOOGLE_CSE_ID");
        }
        if self.sources.semantic_scholar.api_key.is_none() {
            self.sources.semantic_scholar.api_key = lookup("SEMANTIC_SCHOLAR_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".litscout")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.research.max_papers_per_search == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_papers_per_search must be at least 1".into(),
            ));
        }

        if self.research.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_attempts must be at least 1".into(),
            ));
        }

        let threshold = self.research.relevance_threshold;
        if threshold <= 0.0 || threshold > 1.0 {
            return Err(ConfigError::ValidationError(
                "research.relevance_threshold must be in (0.0, 1.0]".into(),
            ));
        }

        if self.research.request_delay < 0.0 {
            return Err(ConfigError::ValidationError(
                "research.request_delay must not be negative".into(),
            ));
        }

        if self.store.chunk_overlap >= self.store.chunk_size {
            return Err(ConfigError::ValidationError(
                "store.chunk_overlap must be smaller than store.chunk_size".into(),
            ));
        }

        match self.store.backend.as_str() {
            "file" | "memory" | "none" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown store backend '{other}' (expected file, memory or none)"
                )));
            }
        }

        match self.store.embedder.as_str() {
            "provider" | "hashed" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown store embedder '{other}' (expected provider or hashed)"
                )));
            }
        }

        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            research: ResearchConfig::default(),
            store: StoreConfig::default(),
            sources: SourcesConfig::default(),
            providers: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
