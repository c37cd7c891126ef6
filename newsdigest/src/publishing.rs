use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::model::{DailyDigest, DigestSection, FactCheckStatus};

/// Sent instead of a digest when nothing was collected
pub const NO_ARTICLES_NOTICE: &str = "📭 No news articles found for today's digest.";

/// Destination of the finished digest
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_digest(&self, digest: &DailyDigest) -> Result<()>;

    async fn publish_notice(&self, text: &str) -> Result<()>;
}

/// Render a digest as plain-text messages: a header, then one message per section
pub fn render_digest(digest: &DailyDigest) -> Vec<String> {
    let mut messages = Vec::with_capacity(digest.sections.len() + 1);

    messages.push(format!(
        "📰 Daily News Digest — {}\n\n{} articles analyzed · {} fact-checks · {} categories",
        digest.date.format("%A, %B %-d, %Y"),
        digest.stats.total_articles,
        digest.stats.fact_checks_performed,
        digest.stats.categories_covered,
    ));

    for section in &digest.sections {
        messages.push(render_section(section));
    }

    messages
}

fn render_section(section: &DigestSection) -> String {
    let mut out = format!("{} {}\n", section.marker, section.category.as_str().to_uppercase());

    for article in &section.articles {
        let badge = match article.fact_check_status {
            FactCheckStatus::Verified => " ✅",
            FactCheckStatus::Warning => " ⚠️",
            FactCheckStatus::None => "",
        };
        out.push_str(&format!("\n• {}{}\n", article.headline, badge));
        if !article.summary.is_empty() {
            out.push_str(&format!("{}\n", article.summary));
        }
        if let Some(note) = article.fact_check_note.as_deref().filter(|n| !n.is_empty()) {
            out.push_str(&format!("Fact-check: {}\n", note));
        }
        out.push_str(&format!("Source: {}", article.sources.join(", ")));
        if let Some(url) = &article.url {
            out.push_str(&format!(" — {}", url));
        }
        out.push('\n');
    }

    out
}

/// Prints the digest to stdout
pub struct ConsolePublisher;

#[async_trait::async_trait]
impl Publisher for ConsolePublisher {
    async fn publish_digest(&self, digest: &DailyDigest) -> Result<()> {
        for message in render_digest(digest) {
            println!("{}\n", message);
        }
        Ok(())
    }

    async fn publish_notice(&self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }
}

/// Posts messages to a chat through the Telegram Bot API
pub struct TelegramPublisher {
    api_url: String,
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramPublisher {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at another Bot API server (self-hosted or test)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_url, self.bot_token))
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .context("Telegram HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {}: {}", status, body);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[async_trait::async_trait]
impl Publisher for TelegramPublisher {
    async fn publish_digest(&self, digest: &DailyDigest) -> Result<()> {
        let messages = render_digest(digest);
        let count = messages.len();
        for message in messages {
            self.send_message(&message).await?;
        }
        info!("Published digest to Telegram chat {} ({} messages)", self.chat_id, count);
        Ok(())
    }

    async fn publish_notice(&self, text: &str) -> Result<()> {
        self.send_message(text).await
    }
}
