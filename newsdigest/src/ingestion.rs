use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feed_rs::parser;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::model::{truncate_chars, RawArticle, SourceKind};

/// Most entries taken from one feed
pub const MAX_FEED_ITEMS: usize = 30;
/// Content is capped at this many characters
pub const MAX_CONTENT_CHARS: usize = 5000;

/// A source of raw articles (feed, website, channel...)
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    async fn collect(&self) -> Result<Vec<RawArticle>>;
}

/// Run every collector in order. A failing source is logged and skipped.
pub async fn collect_all(collectors: &[Box<dyn Collector>], pause: Duration) -> Vec<RawArticle> {
    let mut articles = Vec::new();

    for (i, collector) in collectors.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        match collector.collect().await {
            Ok(found) => {
                info!("Collected {} articles from {}", found.len(), collector.name());
                articles.extend(found);
            }
            Err(e) => warn!("Error collecting from {}: {:#}", collector.name(), e),
        }
    }

    articles
}

/// Keep articles published within `lookback` of `now`
pub fn retain_recent(articles: Vec<RawArticle>, now: DateTime<Utc>, lookback: ChronoDuration) -> Vec<RawArticle> {
    let cutoff = now - lookback;
    let before = articles.len();
    let recent: Vec<RawArticle> = articles.into_iter().filter(|a| a.published_at >= cutoff).collect();
    if recent.len() < before {
        debug!("Dropped {} articles older than {}", before - recent.len(), cutoff);
    }
    recent
}

/// RSS / Atom feed collector
pub struct FeedCollector {
    url: String,
    name: String,
    client: Client,
}

impl FeedCollector {
    /// `name` defaults to the feed's host
    pub fn new(url: impl Into<String>, name: Option<String>, timeout_secs: u64) -> Result<Self> {
        let url = url.into();
        let name = match name {
            Some(n) => n,
            None => url::Url::parse(&url)
                .context("invalid feed URL")?
                .host_str()
                .unwrap_or(&url)
                .to_string(),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("newsdigest/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self { url, name, client })
    }
}

#[async_trait::async_trait]
impl Collector for FeedCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<RawArticle>> {
        info!("Fetching feed: {}", self.url);
        let response = self.client.get(&self.url).send().await.context("network error during fetch")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("feed fetch failed with status: {}", status);
        }

        let bytes = response.bytes().await.context("failed to read response body")?;
        parse_feed(bytes.as_ref(), &self.name, Utc::now())
    }
}

/// Parse an RSS/Atom document into raw articles.
/// Entries without a title are skipped; entries without a date get `now`.
pub fn parse_feed(bytes: &[u8], source: &str, now: DateTime<Utc>) -> Result<Vec<RawArticle>> {
    let feed = parser::parse(bytes).context("failed to parse feed")?;

    let mut articles = Vec::new();
    for entry in feed.entries.into_iter().take(MAX_FEED_ITEMS) {
        let title = entry.title.as_ref().map(|t| t.content.trim().to_string()).unwrap_or_default();
        if title.is_empty() {
            debug!("Skipping feed entry without title in {}", source);
            continue;
        }

        let url = entry.links.first().map(|l| l.href.clone());
        let html = entry
            .summary
            .as_ref()
            .map(|s| s.content.clone())
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
            .unwrap_or_default();
        let content = html_to_text(&html);

        let id_seed = url.as_deref().unwrap_or(&title);
        let author = entry.authors.first().map(|p| p.name.clone());

        articles.push(RawArticle {
            id: format!("feed_{}", short_hash(id_seed)),
            source: source.to_string(),
            source_kind: SourceKind::Feed,
            title,
            content: truncate_chars(&content, MAX_CONTENT_CHARS).to_string(),
            url,
            author,
            image_url: None,
            published_at: entry.published.or(entry.updated).unwrap_or(now),
        });
    }

    Ok(articles)
}

/// Plain text of an HTML fragment with whitespace collapsed
pub(crate) fn html_to_text(html: &str) -> String {
    let text = match html2text::from_read(html.as_bytes(), 10_000) {
        Ok(t) => t,
        Err(e) => {
            debug!("html2text failed ({}), keeping raw text", e);
            html.to_string()
        }
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First 8 hex digits of the SHA-256 of `seed`
pub(crate) fn short_hash(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    format!("{:x}", digest)[..8].to_string()
}
