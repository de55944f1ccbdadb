//! Provider router: selects the LLM provider named in config.

use std::collections::HashMap;
use std::sync::Arc;

use litscout_config::AppConfig;
use litscout_core::error::ProviderError;
use litscout_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// Completion calls during synthesis can be slow; they get their own budget.
const PROVIDER_TIMEOUT_SECS: u64 = 120;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Every `[providers.<name>]` table becomes a provider. The
/// `default_provider` and any `store.embedding_provider` are registered
/// even when they have no table of their own.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = match &provider_config.api_url {
            Some(url) => url.clone(),
            None => default_base_url(name).ok_or_else(|| unknown_provider(name))?.to_string(),
        };

        debug!(provider = %name, base_url = %base_url, "Registering provider");
        let provider = OpenAiCompatProvider::new(name, base_url, api_key, PROVIDER_TIMEOUT_SECS)?;
        router.register(name.clone(), Arc::new(provider));
    }

    let implicit = std::iter::once(&config.default_provider).chain(config.store.embedding_provider.as_ref());
    for name in implicit {
        if router.get(name).is_some() {
            continue;
        }
        let base_url = default_base_url(name).ok_or_else(|| unknown_provider(name))?;
        let api_key = config.api_key.clone().unwrap_or_default();
        let provider = OpenAiCompatProvider::new(name, base_url, api_key, PROVIDER_TIMEOUT_SECS)?;
        router.register(name.clone(), Arc::new(provider));
    }

    Ok(router)
}

fn unknown_provider(name: &str) -> ProviderError {
    ProviderError::NotConfigured(format!(
        "provider '{name}' has no well-known endpoint; set providers.{name}.api_url"
    ))
}

/// Default base URL for well-known OpenAI-compatible providers.
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url)
}
