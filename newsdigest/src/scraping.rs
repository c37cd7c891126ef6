use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::WebsiteSourceConfig;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

use crate::ingestion::{short_hash, Collector, MAX_CONTENT_CHARS};
use crate::model::{truncate_chars, RawArticle, SourceKind};

/// Most articles taken from one page
pub const MAX_SITE_ITEMS: usize = 20;
const MAX_TITLE_CHARS: usize = 300;

const DEFAULT_TITLE_SELECTOR: &str = "h1, h2, h3, .title, .headline";
const DEFAULT_CONTENT_SELECTOR: &str = "p, .summary, .excerpt, .description";
const DEFAULT_DATE_SELECTOR: &str = "time, .date, .timestamp";

/// Scrapes article teasers from a web page using CSS selectors
pub struct WebsiteCollector {
    config: WebsiteSourceConfig,
    client: Client,
}

impl WebsiteCollector {
    pub fn new(config: WebsiteSourceConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("newsdigest/0.1.0")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl Collector for WebsiteCollector {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn collect(&self) -> Result<Vec<RawArticle>> {
        info!("Scraping website: {}", self.config.name);
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .context("failed to fetch page")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("page fetch failed with status: {}", status));
        }

        let html = response.text().await.context("failed to read response body")?;
        extract_articles(&html, &self.config, Utc::now())
    }
}

struct Selectors {
    article: Selector,
    title: Selector,
    content: Selector,
    date: Selector,
    link: Selector,
}

impl Selectors {
    fn from_config(config: &WebsiteSourceConfig) -> Result<Self> {
        Ok(Self {
            article: parse_selector(&config.article_selector)?,
            title: parse_selector(config.title_selector.as_deref().unwrap_or(DEFAULT_TITLE_SELECTOR))?,
            content: parse_selector(config.content_selector.as_deref().unwrap_or(DEFAULT_CONTENT_SELECTOR))?,
            date: parse_selector(config.date_selector.as_deref().unwrap_or(DEFAULT_DATE_SELECTOR))?,
            link: parse_selector("a")?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid CSS selector '{}': {:?}", css, e))
}

/// Extract articles from a page. Elements without a title are skipped and do
/// not count towards [`MAX_SITE_ITEMS`].
pub fn extract_articles(html: &str, config: &WebsiteSourceConfig, now: DateTime<Utc>) -> Result<Vec<RawArticle>> {
    let selectors = Selectors::from_config(config)?;
    let base = url::Url::parse(&config.url).ok();
    let document = Html::parse_document(html);

    let mut articles = Vec::new();
    for element in document.select(&selectors.article) {
        if articles.len() == MAX_SITE_ITEMS {
            break;
        }
        let first_link = element.select(&selectors.link).next();

        let title = element
            .select(&selectors.title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .or_else(|| first_link.map(element_text))
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        let content: String = element
            .select(&selectors.content)
            .map(element_text)
            .collect::<Vec<_>>()
            .join(" ");
        let content = if content.trim().is_empty() { element_text(element) } else { content };

        let url = first_link
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_url(base.as_ref(), href));

        let published_at = element
            .select(&selectors.date)
            .next()
            .and_then(|d| d.value().attr("datetime").map(str::to_string).or_else(|| Some(element_text(d))))
            .and_then(|raw| parse_date(&raw))
            .unwrap_or(now);

        let title = truncate_chars(&title, MAX_TITLE_CHARS).to_string();
        articles.push(RawArticle {
            id: format!("web_{}_{}", config.name, short_hash(&title)),
            source: config.name.clone(),
            source_kind: SourceKind::Site,
            title,
            content: truncate_chars(&content, MAX_CONTENT_CHARS).to_string(),
            url,
            author: None,
            image_url: None,
            published_at,
        });
    }

    debug!("Extracted {} articles from {}", articles.len(), config.name);
    Ok(articles)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_url(base: Option<&url::Url>, link: &str) -> String {
    base.and_then(|b| b.join(link).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| link.to_string())
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="story">
            <h2>Rust 2.0 announced</h2>
            <p>The team announced a new edition.</p>
            <p>Details follow.</p>
            <a href="/rust-2">read</a>
            <time datetime="2025-06-10T08:30:00Z">June 10</time>
          </div>
          <div class="story">
            <a href="https://other.example.org/x">Link-only headline</a>
          </div>
          <div class="story"><span>   </span></div>
        </body></html>
    "#;

    fn config(article_selector: &str) -> WebsiteSourceConfig {
        WebsiteSourceConfig {
            name: "Example".to_string(),
            url: "https://example.com/news/".to_string(),
            article_selector: article_selector.to_string(),
            title_selector: None,
            content_selector: None,
            date_selector: None,
        }
    }

    #[test]
    fn extracts_with_default_selectors() {
        let now = Utc::now();
        let articles = extract_articles(PAGE, &config(".story"), now).expect("extract");
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.title, "Rust 2.0 announced");
        assert_eq!(first.content, "The team announced a new edition. Details follow.");
        assert_eq!(first.url.as_deref(), Some("https://example.com/rust-2"));
        assert_eq!(first.published_at.to_rfc3339(), "2025-06-10T08:30:00+00:00");
        assert_eq!(first.source_kind, SourceKind::Site);
        assert_eq!(first.id, format!("web_Example_{}", short_hash("Rust 2.0 announced")));

        let second = &articles[1];
        assert_eq!(second.title, "Link-only headline");
        assert_eq!(second.content, "Link-only headline");
        assert_eq!(second.url.as_deref(), Some("https://other.example.org/x"));
        assert_eq!(second.published_at, now);
    }

    #[test]
    fn caps_items_per_site() {
        let page: String = (0..30).map(|i| format!("<li><h3>Story {}</h3></li>", i)).collect();
        let articles = extract_articles(&format!("<ul>{}</ul>", page), &config("li"), Utc::now()).expect("extract");
        assert_eq!(articles.len(), MAX_SITE_ITEMS);
    }

    #[test]
    fn untitled_elements_do_not_use_up_the_cap() {
        let spacers: String = (0..10).map(|_| "<li class=\"ad\"></li>".to_string()).collect();
        let stories: String = (0..25).map(|i| format!("<li><h3>Story {}</h3></li>", i)).collect();
        let page = format!("<ul>{}{}</ul>", spacers, stories);

        let articles = extract_articles(&page, &config("li"), Utc::now()).expect("extract");
        assert_eq!(articles.len(), MAX_SITE_ITEMS);
        assert_eq!(articles[0].title, "Story 0");
        assert_eq!(articles[MAX_SITE_ITEMS - 1].title, "Story 19");
    }

    #[test]
    fn invalid_selector_is_an_error() {
        assert!(extract_articles(PAGE, &config("div[[["), Utc::now()).is_err());
    }

    #[test]
    fn dates() {
        assert!(parse_date("2025-06-10T08:30:00+02:00").is_some());
        assert!(parse_date("Tue, 10 Jun 2025 20:00:00 GMT").is_some());
        assert!(parse_date("yesterday").is_none());
    }
}
