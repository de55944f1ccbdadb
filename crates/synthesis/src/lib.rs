//! Literature synthesis for litscout.
//!
//! [`LlmSynthesisAgent`] asks the configured LLM for a summary, key findings,
//! research gaps, methodology trends, and future directions, then attaches
//! citation, timeline, and meta-analysis blocks computed locally from the
//! paper metadata. [`find_research_trends`] clusters the knowledge store
//! into labelled research themes.

pub mod agent;
pub mod analytics;
pub mod parse;
pub mod trends;

#[cfg(test)]
mod test_helpers;

pub use agent::LlmSynthesisAgent;
pub use trends::{ResearchTrend, TrendSettings, find_research_trends};

use litscout_config::AppConfig;
use litscout_core::error::SynthesisError;

/// Build the synthesis agent for the configured default provider and model.
pub fn build_from_config(config: &AppConfig) -> Result<LlmSynthesisAgent, SynthesisError> {
    let router = litscout_providers::build_from_config(config)?;
    let provider = router.default().ok_or_else(|| {
        SynthesisError::Malformed(format!(
            "default provider '{}' is not registered",
            config.default_provider
        ))
    })?;

    let model = config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone());

    Ok(LlmSynthesisAgent::new(provider, model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens))
}
