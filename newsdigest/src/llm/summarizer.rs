// Summary and fact-check requests with their fallbacks
use tracing::{debug, warn};

use super::{ClaimReply, LlmProvider, SummaryReply};
use crate::model::{truncate_chars, ArticleSummary, FactCheck, RawArticle, Verdict};

/// Most claims kept per article
pub const MAX_FACT_CHECKS: usize = 3;
const DEFAULT_IMPORTANCE: u8 = 5;
const FALLBACK_SYNOPSIS_CHARS: usize = 200;

/// Summarize an article, falling back to its title and leading text when the oracle fails
pub async fn summarize_article<P: LlmProvider + ?Sized>(provider: &P, article: &RawArticle) -> ArticleSummary {
    match provider.summarize(article).await {
        Ok(reply) => {
            debug!("summary ok for article {}", article.id);
            summary_from_reply(article, reply)
        }
        Err(e) => {
            warn!("Error summarizing article {}: {:#}, using fallback summary", article.id, e);
            fallback_summary(article)
        }
    }
}

/// Fact-check an article. Oracle failures yield no claims.
pub async fn fact_check_article<P: LlmProvider + ?Sized>(
    provider: &P,
    article: &RawArticle,
    trusted_sources: &[String],
) -> Vec<FactCheck> {
    match provider.fact_check(article, trusted_sources).await {
        Ok(claims) => fact_checks_from_reply(claims),
        Err(e) => {
            warn!("Error fact-checking article {}: {:#}", article.id, e);
            Vec::new()
        }
    }
}

fn summary_from_reply(article: &RawArticle, reply: SummaryReply) -> ArticleSummary {
    let headline = reply
        .headline
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| article.title.clone());

    ArticleSummary {
        article_id: article.id.clone(),
        headline,
        synopsis: reply.summary.unwrap_or_default(),
        key_points: reply.key_points.unwrap_or_default(),
        importance: reply.importance.map(clamp_importance).unwrap_or(DEFAULT_IMPORTANCE),
    }
}

/// Summary used when the oracle is unreachable or its reply unusable
pub fn fallback_summary(article: &RawArticle) -> ArticleSummary {
    ArticleSummary {
        article_id: article.id.clone(),
        headline: article.title.clone(),
        synopsis: format!("{}...", truncate_chars(&article.content, FALLBACK_SYNOPSIS_CHARS)),
        key_points: Vec::new(),
        importance: DEFAULT_IMPORTANCE,
    }
}

fn clamp_importance(raw: f64) -> u8 {
    if raw.is_nan() {
        return DEFAULT_IMPORTANCE;
    }
    raw.round().clamp(1.0, 10.0) as u8
}

fn fact_checks_from_reply(claims: Vec<ClaimReply>) -> Vec<FactCheck> {
    claims
        .into_iter()
        .filter_map(|c| {
            let claim = c.claim.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
            let confidence = c
                .confidence
                .filter(|v| !v.is_nan())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(0.5);
            Some(FactCheck {
                claim,
                verdict: c.verdict.as_deref().map(Verdict::from_label).unwrap_or(Verdict::Unverified),
                confidence,
                explanation: c.explanation.unwrap_or_default(),
                sources: c.sources,
            })
        })
        .take(MAX_FACT_CHECKS)
        .collect()
}
