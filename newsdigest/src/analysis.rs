use std::time::Duration;
use tracing::info;

use crate::llm::summarizer::{fact_check_article, summarize_article};
use crate::llm::LlmProvider;
use crate::model::{truncate_chars, AnalyzedArticle, ProcessedArticle};

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Pause between two consecutive articles
    pub article_delay: Duration,
    /// Source names the fact-check oracle should verify against
    pub trusted_sources: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            article_delay: Duration::from_secs(1),
            trusted_sources: Vec::new(),
        }
    }
}

/// Summarize and fact-check one article. The two oracle calls run concurrently.
pub async fn analyze_article<P: LlmProvider + ?Sized>(
    provider: &P,
    article: ProcessedArticle,
    trusted_sources: &[String],
) -> AnalyzedArticle {
    let (summary, fact_checks) = tokio::join!(
        summarize_article(provider, &article.raw),
        fact_check_article(provider, &article.raw, trusted_sources),
    );

    AnalyzedArticle {
        article,
        summary,
        fact_checks,
    }
}

/// Analyze articles one after another, pausing between them
pub async fn analyze_articles<P: LlmProvider + ?Sized>(
    provider: &P,
    articles: Vec<ProcessedArticle>,
    settings: &AnalysisSettings,
) -> Vec<AnalyzedArticle> {
    let mut analyzed = Vec::with_capacity(articles.len());

    for (i, article) in articles.into_iter().enumerate() {
        if i > 0 && !settings.article_delay.is_zero() {
            tokio::time::sleep(settings.article_delay).await;
        }
        info!("Analyzing: {}...", truncate_chars(&article.raw.title, 50));
        analyzed.push(analyze_article(provider, article, &settings.trusted_sources).await);
    }

    analyzed
}
