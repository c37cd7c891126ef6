use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::RawArticle;

pub mod prompts;
pub mod remote;
pub mod summarizer;
pub mod timeout;

/// Core trait for LLM providers.
///
/// Only `generate` is required. The oracle capabilities (classification,
/// summary, fact-check) build their prompt, call `generate` and parse the JSON
/// reply; providers may override them.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Classify a batch of articles. Reply indices refer to positions in `batch`.
    async fn classify(&self, batch: &[RawArticle]) -> Result<Vec<ClassificationReply>> {
        let response = self.generate(prompts::classification(batch)).await?;
        let reply: ClassificationEnvelope = parse_reply(&response.content)
            .context("Failed to parse classification reply")?;
        Ok(reply.articles)
    }

    /// Headline, synopsis, key points and importance of one article
    async fn summarize(&self, article: &RawArticle) -> Result<SummaryReply> {
        let response = self.generate(prompts::summary(article)).await?;
        parse_reply(&response.content).context("Failed to parse summary reply")
    }

    /// Verifiable claims of one article, assessed against the trusted sources
    async fn fact_check(&self, article: &RawArticle, trusted_sources: &[String]) -> Result<Vec<ClaimReply>> {
        let response = self.generate(prompts::fact_check(article, trusted_sources)).await?;
        let reply: ClaimsEnvelope = parse_reply(&response.content)
            .context("Failed to parse fact-check reply")?;
        Ok(reply.claims)
    }
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
    /// The prompt asks for a single JSON object
    pub json_reply: bool,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// One entry of a classification reply
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationReply {
    pub index: usize,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityMention>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityMention {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryReply {
    pub headline: Option<String>,
    #[serde(alias = "synopsis")]
    pub summary: Option<String>,
    #[serde(rename = "keyPoints", alias = "key_points")]
    pub key_points: Option<Vec<String>>,
    pub importance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimReply {
    pub claim: Option<String>,
    pub verdict: Option<String>,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClassificationEnvelope {
    #[serde(default)]
    articles: Vec<ClassificationReply>,
}

#[derive(Debug, Deserialize)]
struct ClaimsEnvelope {
    #[serde(default)]
    claims: Vec<ClaimReply>,
}

/// Extract and deserialize the JSON object embedded in an LLM reply
pub fn parse_reply<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json_from_text(text).context("No valid JSON found in LLM response")?;
    serde_json::from_str(&json).with_context(|| format!("Unexpected JSON shape. Input was: {}", json))
}

/// Helper to extract JSON from text that might contain markdown backticks or preamble
pub fn extract_json_from_text(text: &str) -> Option<String> {
    // 1. Try to find content between ```json and ```
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 2. Try to find content between ``` and ```
    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    // 3. Try to find the first '{' and last '}'
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return Some(text[start..=end].to_string());
        }
    }

    None
}
