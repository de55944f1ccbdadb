//! Shared test helpers: a provider that answers by prompt kind.

use litscout_core::error::ProviderError;
use litscout_core::message::Message;
use litscout_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that picks a canned answer from the system prompt.
pub struct ScriptedProvider {
    fail: bool,
    call_count: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn happy_path() -> Self {
        Self {
            fail: false,
            call_count: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        if self.fail {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: "upstream unavailable".into(),
            });
        }

        let system = request.messages[0].content.as_str();
        let text = if system.contains("cluster label") {
            "\"Retrieval Augmentation\"\n"
        } else if system.contains("executive summary") {
            "Retrieval-augmented generation couples a parametric generator with a non-parametric memory."
        } else if system.contains("key findings") {
            r#"```json
[
  {"finding": "Retrieval improves factual accuracy", "evidence_level": "strong"},
  {"finding": "Dense retrievers beat BM25 on open QA", "evidence_level": "moderate"},
  {"finding": "Joint training helps", "evidence_level": "moderate"},
  {"finding": "Index freshness matters", "evidence_level": "limited"}
]
```"#
        } else if system.contains("gaps") {
            "1. Few multilingual benchmarks\n2. Little analysis of retrieval latency"
        } else if system.contains("methodological trends") {
            "- Dual encoders\n- Joint retriever-generator training\n- Knowledge distillation\n- Hard negative mining"
        } else {
            "1. Adaptive retrieval\n2. Multimodal memories\n3. Streaming indexes\n4. Better attribution\n5. Efficient rerankers\n6. Privacy-aware retrieval\n7. Overflow item"
        };

        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: request.model,
        })
    }
}
