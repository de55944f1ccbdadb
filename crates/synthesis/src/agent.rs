//! The default synthesis agent: five prompted analyses plus deterministic
//! analytics over the paper set.

use std::sync::Arc;

use async_trait::async_trait;
use litscout_core::error::{ProviderError, SynthesisError};
use litscout_core::extract::ExtractedContent;
use litscout_core::message::Message;
use litscout_core::paper::Paper;
use litscout_core::provider::{Provider, ProviderRequest};
use litscout_core::synthesis::{KeyFinding, ResearchGap, SynthesisAgent, SynthesisResult};
use tracing::{debug, info, warn};

use crate::analytics;
use crate::parse::{parse_findings, parse_gaps, parse_lines};

const MAX_PROMPT_ABSTRACTS: usize = 5;
const MAX_METHOD_SNIPPETS: usize = 5;
const METHOD_SNIPPET_CHARS: usize = 500;
const GAP_SAMPLE_CHARS: usize = 5000;
const DIRECTION_SAMPLE_CHARS: usize = 1500;
const MAX_TRENDS: usize = 7;
const MAX_DIRECTIONS: usize = 6;
const METHOD_KEYWORDS: &[&str] = &["method", "approach", "technique", "model"];
const LABEL_ABSTRACTS: usize = 3;
const LABEL_ABSTRACT_CHARS: usize = 300;
const LABEL_TITLES: usize = 10;
const MAX_LABEL_CHARS: usize = 60;

/// Text drawn from the paper set that the prompts are built from.
struct Corpus<'a> {
    query: &'a str,
    total_papers: usize,
    abstracts: Vec<&'a str>,
    all_text: String,
    method_snippets: Vec<String>,
}

impl<'a> Corpus<'a> {
    fn new(query: &'a str, papers: &'a [Paper], contents: &'a [ExtractedContent], total_papers: usize) -> Self {
        let abstracts: Vec<&str> = papers
            .iter()
            .map(|p| p.abstract_text.as_str())
            .filter(|a| !a.trim().is_empty())
            .collect();

        let all_text = if contents.is_empty() {
            abstracts.join(" ")
        } else {
            contents.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ")
        };

        let mentions_method = |s: &str| {
            let lower = s.to_lowercase();
            METHOD_KEYWORDS.iter().any(|k| lower.contains(k))
        };
        let mut method_snippets: Vec<String> = contents
            .iter()
            .flat_map(|c| c.sections.iter())
            .filter(|s| mentions_method(&s.title) || mentions_method(&s.content))
            .map(|s| truncate_chars(&format!("{}: {}", s.title, s.content), METHOD_SNIPPET_CHARS))
            .collect();
        method_snippets.extend(
            papers
                .iter()
                .flat_map(|p| p.sections.iter())
                .filter(|title| mentions_method(title))
                .map(|title| truncate_chars(title, METHOD_SNIPPET_CHARS)),
        );

        Self {
            query,
            total_papers,
            abstracts,
            all_text,
            method_snippets,
        }
    }

    fn abstract_sample(&self) -> String {
        self.abstracts
            .iter()
            .take(MAX_PROMPT_ABSTRACTS)
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A [`SynthesisAgent`] backed by an LLM [`Provider`].
pub struct LlmSynthesisAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmSynthesisAgent {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    async fn ask(&self, system: &str, user: String) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system), Message::user(user)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self.provider.complete(request).await?;
        Ok(response.message.content.trim().to_string())
    }

    /// A 1-3 word label for a cluster of related papers.
    pub async fn cluster_label(&self, abstracts: &[&str], titles: &[&str]) -> Result<String, ProviderError> {
        let abstracts = abstracts
            .iter()
            .take(LABEL_ABSTRACTS)
            .map(|a| truncate_chars(a, LABEL_ABSTRACT_CHARS))
            .collect::<Vec<_>>()
            .join("\n");
        let titles = titles.iter().take(LABEL_TITLES).copied().collect::<Vec<_>>().join("\n");
        let user = format!(
            "Sample abstracts:\n{abstracts}\n\nPaper titles:\n{titles}\n\n\
             Generate a 1-3 word label that captures the main research theme of these papers. \
             Reply with the label only."
        );
        let text = self
            .ask(
                "You are a research analyst naming a cluster label for a group of related academic papers.",
                user,
            )
            .await?;
        let label = text
            .lines()
            .map(|l| l.trim().trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`' | '.')).trim())
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        Ok(truncate_chars(label, MAX_LABEL_CHARS))
    }

    async fn summary(&self, corpus: &Corpus<'_>) -> Result<String, ProviderError> {
        let user = format!(
            "Research Query: {}\n\nPapers analyzed: {}\n\nKey abstracts and content snippets:\n{}\n\n\
             Please provide a 300-500 word executive summary covering:\n\
             1. The current state of research in this area\n\
             2. Main themes and approaches\n\
             3. Level of research activity and maturity\n\
             4. Key challenges being addressed\n\n\
             Focus on being informative and objective.",
            corpus.query,
            corpus.total_papers,
            corpus.abstract_sample()
        );
        self.ask(
            "You are a research analyst creating an executive summary of academic literature. \
             Capture the main themes, key developments, and current state of research in the given area.",
            user,
        )
        .await
    }

    async fn key_findings(&self, corpus: &Corpus<'_>) -> Vec<KeyFinding> {
        let user = format!(
            "Research Query: {}\n\nRelevant content from papers:\n{}\n\n\
             Extract 5-8 key findings. For each finding, provide:\n\
             1. The main finding (clear and specific)\n\
             2. Level of evidence/support (strong, moderate, limited)\n\
             3. Which aspects support this finding\n\n\
             Format as JSON array with objects containing: finding, evidence_level, supporting_points",
            corpus.query,
            corpus.abstract_sample()
        );
        let system = "You are a research analyst extracting key findings from academic literature. \
                      Identify the most significant and well-supported findings, focusing on concrete results.";
        match self.ask(system, user).await {
            Ok(text) => parse_findings(&text),
            Err(e) => {
                warn!(error = %e, "Key findings extraction failed");
                Vec::new()
            }
        }
    }

    async fn research_gaps(&self, corpus: &Corpus<'_>) -> Vec<ResearchGap> {
        let user = format!(
            "Research Query: {}\n\nAnalysis of {} papers in this area.\n\nSample content: {}\n\n\
             Identify 3-5 significant research gaps or opportunities. For each gap:\n\
             1. Description of what's missing or understudied\n\
             2. Why this gap is significant\n\
             3. Potential research direction to address it\n\n\
             Format as JSON array with objects containing: gap, significance, suggested_direction",
            corpus.query,
            corpus.total_papers,
            truncate_chars(&corpus.all_text, GAP_SAMPLE_CHARS)
        );
        let system = "You are a research strategist identifying gaps and opportunities in academic literature. \
                      Focus on methodological gaps, unexplored areas, and stated limitations.";
        match self.ask(system, user).await {
            Ok(text) => parse_gaps(&text),
            Err(e) => {
                warn!(error = %e, "Research gap identification failed");
                Vec::new()
            }
        }
    }

    async fn methodology_trends(&self, corpus: &Corpus<'_>) -> Vec<String> {
        if corpus.method_snippets.is_empty() {
            return vec!["Insufficient methodology information available".into()];
        }
        let user = format!(
            "Methodology sections from papers:\n{}\n\n\
             Identify 5-7 key methodological trends or common approaches.\n\
             Return as a simple list of strings, each describing a methodological trend.",
            corpus
                .method_snippets
                .iter()
                .take(MAX_METHOD_SNIPPETS)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        );
        let system = "You are analyzing methodological trends in academic research. \
                      Identify the most common approaches, techniques, and methodological patterns.";
        match self.ask(system, user).await {
            Ok(text) => parse_lines(&text, MAX_TRENDS),
            Err(e) => {
                warn!(error = %e, "Methodology trend analysis failed");
                vec!["Methodology analysis failed".into()]
            }
        }
    }

    async fn future_directions(&self, corpus: &Corpus<'_>) -> Vec<String> {
        let user = format!(
            "Research area: {}\nLiterature analysis of {} papers\n\nContent sample: {}\n\n\
             Suggest 5-6 promising future research directions based on:\n\
             1. Current limitations in the field\n\
             2. Emerging trends and opportunities\n\
             3. Technological or methodological advances\n\
             4. Practical applications that need development\n\n\
             Return as a list of specific, actionable research directions.",
            corpus.query,
            corpus.total_papers,
            truncate_chars(&corpus.all_text, DIRECTION_SAMPLE_CHARS)
        );
        let system = "You are a research strategist suggesting future research directions based on \
                      current literature. Focus on logical next steps and emerging opportunities.";
        match self.ask(system, user).await {
            Ok(text) => parse_lines(&text, MAX_DIRECTIONS),
            Err(e) => {
                warn!(error = %e, "Future directions analysis failed");
                vec!["Future directions analysis failed".into()]
            }
        }
    }
}

#[async_trait]
impl SynthesisAgent for LlmSynthesisAgent {
    fn name(&self) -> &str {
        "llm"
    }

    /// The summary call is required; its failure fails the synthesis. The
    /// other analyses degrade to empty or placeholder lists on their own.
    async fn synthesize(
        &self,
        query: &str,
        papers: &[Paper],
        contents: &[ExtractedContent],
        is_web_extracted: bool,
    ) -> Result<SynthesisResult, SynthesisError> {
        let unique = analytics::unique_papers(papers);
        let corpus = Corpus::new(query, papers, contents, unique.len());
        debug!(
            provider = %self.provider.name(),
            papers = unique.len(),
            contents = contents.len(),
            "Synthesizing"
        );

        let summary = self.summary(&corpus).await?;
        let key_findings = self.key_findings(&corpus).await;
        let research_gaps = self.research_gaps(&corpus).await;
        let methodology_trends = self.methodology_trends(&corpus).await;
        let future_directions = self.future_directions(&corpus).await;

        info!(
            findings = key_findings.len(),
            gaps = research_gaps.len(),
            trends = methodology_trends.len(),
            directions = future_directions.len(),
            "Synthesis complete"
        );

        Ok(SynthesisResult {
            summary,
            key_findings,
            research_gaps,
            methodology_trends,
            future_directions,
            citation_network: analytics::citation_network(&unique, contents),
            timeline_insights: analytics::timeline_insights(&unique),
            meta_analysis: analytics::meta_analysis(papers, unique.len(), is_web_extracted),
        })
    }
}

/// The first `max` characters of `s`.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
