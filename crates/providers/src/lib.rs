//! LLM Provider implementations for litscout.
//!
//! All providers implement the `litscout_core::Provider` trait.
//! The router selects the correct provider based on configuration;
//! [`ProviderEmbedder`] adapts a provider into a knowledge-store embedder.

pub mod embedder;
pub mod openai_compat;
pub mod router;

pub use embedder::{ProviderEmbedder, build_embedder};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
