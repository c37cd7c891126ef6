// Prompt builders for the three oracle capabilities
use super::LlmRequest;
use crate::model::{truncate_chars, RawArticle};

/// Characters of content sent per article in a classification batch
pub const CLASSIFY_CONTENT_CHARS: usize = 500;
/// Characters of content sent for summary and fact-check
pub const ANALYSIS_CONTENT_CHARS: usize = 3000;

const DEFAULT_TRUSTED_SOURCES: &str = "Reuters, AP News, official government sources";

pub fn classification(batch: &[RawArticle]) -> LlmRequest {
    let articles_text = batch
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "[{}] Title: {}\nContent: {}",
                i,
                a.title,
                truncate_chars(&a.content, CLASSIFY_CONTENT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let prompt = format!(
        r#"Analyze these news articles and categorize them.

ARTICLES:
{}

For each article, determine:
1. Category (one of: technology, politics, business, sports, entertainment, science, health, world, other)
2. Language (e.g., "en", "ru", "es")
3. Key entities (people, organizations, locations, events mentioned)

Respond in JSON format:
{{
  "articles": [
    {{
      "index": 0,
      "category": "technology",
      "language": "en",
      "entities": [
        {{"type": "person", "name": "Ada Lovelace"}},
        {{"type": "organization", "name": "Acme Corp"}}
      ]
    }}
  ]
}}"#,
        articles_text
    );

    LlmRequest {
        prompt,
        max_tokens: Some(1000),
        temperature: Some(0.2),
        timeout_seconds: None,
        json_reply: true,
    }
}

pub fn summary(article: &RawArticle) -> LlmRequest {
    let prompt = format!(
        r#"Analyze this news article and provide a summary.

ARTICLE:
Title: {}
Source: {}
Content: {}

Respond in JSON format:
{{
  "headline": "A clear, concise headline (max 100 chars)",
  "summary": "2-3 sentence summary of the key information",
  "keyPoints": ["point 1", "point 2", "point 3"],
  "importance": 7
}}

The importance score should be 1-10 based on:
- Global impact
- Number of people affected
- Timeliness/urgency
- Novelty of information"#,
        article.title,
        article.source,
        truncate_chars(&article.content, ANALYSIS_CONTENT_CHARS)
    );

    LlmRequest {
        prompt,
        max_tokens: Some(500),
        temperature: Some(0.5),
        timeout_seconds: None,
        json_reply: true,
    }
}

pub fn fact_check(article: &RawArticle, trusted_sources: &[String]) -> LlmRequest {
    let sources = if trusted_sources.is_empty() {
        DEFAULT_TRUSTED_SOURCES.to_string()
    } else {
        trusted_sources.join(", ")
    };

    let prompt = format!(
        r#"Analyze this news article for factual claims that can be verified.

ARTICLE:
Title: {}
Source: {}
Content: {}

TRUSTED SOURCES FOR VERIFICATION: {}

Identify the main factual claims and assess their verifiability.
For each claim, determine if it:
- Can be verified against known facts
- Contains unverified assertions
- Has disputed elements
- Contains false information

Respond in JSON format:
{{
  "claims": [
    {{
      "claim": "The specific claim made",
      "verdict": "verified|unverified|disputed|false",
      "confidence": 0.85,
      "explanation": "Brief explanation of the assessment",
      "sources": ["source1", "source2"]
    }}
  ]
}}

Only include claims that are significant and verifiable. Limit to 3 most important claims.
If no significant verifiable claims, return empty claims array."#,
        article.title,
        article.source,
        truncate_chars(&article.content, ANALYSIS_CONTENT_CHARS),
        sources
    );

    LlmRequest {
        prompt,
        max_tokens: Some(800),
        temperature: Some(0.2),
        timeout_seconds: None,
        json_reply: true,
    }
}
