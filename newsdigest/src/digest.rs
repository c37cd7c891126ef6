use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;

use crate::model::{
    AnalyzedArticle, Category, DailyDigest, DigestArticle, DigestSection, DigestStats, FactCheck,
    FactCheckStatus, Verdict,
};

/// Order in which sections appear in the digest
pub const CATEGORY_ORDER: [Category; 9] = [
    Category::World,
    Category::Politics,
    Category::Technology,
    Category::Business,
    Category::Science,
    Category::Health,
    Category::Sports,
    Category::Entertainment,
    Category::Other,
];

pub const MAX_ARTICLES_PER_SECTION: usize = 3;

/// Build the daily digest from analyzed articles.
///
/// Articles are grouped by category and ranked by importance (ties keep input
/// order). Each non-empty category, in [`CATEGORY_ORDER`], contributes its top
/// [`MAX_ARTICLES_PER_SECTION`] articles. Stats cover the whole input.
pub fn assemble_digest(articles: &[AnalyzedArticle], date: DateTime<Utc>) -> DailyDigest {
    let mut by_category: HashMap<Category, Vec<&AnalyzedArticle>> = HashMap::new();
    for article in articles {
        by_category.entry(article.article.category).or_default().push(article);
    }

    // sort_by is stable: equal importance keeps arrival order
    for bucket in by_category.values_mut() {
        bucket.sort_by(|a, b| b.summary.importance.cmp(&a.summary.importance));
    }

    let sections: Vec<DigestSection> = CATEGORY_ORDER
        .iter()
        .filter_map(|category| {
            let bucket = by_category.get(category).filter(|b| !b.is_empty())?;
            Some(DigestSection {
                category: *category,
                marker: category.marker().to_string(),
                articles: bucket
                    .iter()
                    .take(MAX_ARTICLES_PER_SECTION)
                    .map(|a| digest_article(a))
                    .collect(),
            })
        })
        .collect();

    let stats = DigestStats {
        total_articles: articles.len(),
        fact_checks_performed: articles.iter().map(|a| a.fact_checks.len()).sum(),
        categories_covered: sections.len(),
    };

    info!(
        "Digest assembled: {} sections from {} articles ({} fact-checks)",
        stats.categories_covered, stats.total_articles, stats.fact_checks_performed
    );

    DailyDigest { date, sections, stats }
}

/// Badge for an article's fact-checks, with the explanation of the first contested claim
pub fn fact_check_status(checks: &[FactCheck]) -> (FactCheckStatus, Option<String>) {
    if checks.is_empty() {
        return (FactCheckStatus::None, None);
    }

    if let Some(contested) = checks.iter().find(|c| c.verdict.is_contested()) {
        return (FactCheckStatus::Warning, Some(contested.explanation.clone()));
    }

    if checks.iter().all(|c| c.verdict == Verdict::Verified) {
        (FactCheckStatus::Verified, None)
    } else {
        (FactCheckStatus::None, None)
    }
}

fn digest_article(article: &AnalyzedArticle) -> DigestArticle {
    let (status, note) = fact_check_status(&article.fact_checks);
    DigestArticle {
        headline: article.summary.headline.clone(),
        summary: article.summary.synopsis.clone(),
        fact_check_status: status,
        fact_check_note: note,
        sources: vec![article.article.raw.source.clone()],
        url: article.article.raw.url.clone(),
    }
}
