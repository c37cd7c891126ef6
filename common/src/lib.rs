/*!
common/src/lib.rs

Shared configuration types for newsdigest.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file
- A loader that merges a default file with an override file
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Remote LLM config (used if `llm.adapter = "remote"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

/// LLM top-level config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub adapter: Option<String>, // "remote"
    pub remote: Option<RemoteLlmConfig>,
    /// Upper bound for a single oracle call, applied on top of the HTTP timeout
    pub call_timeout_seconds: Option<u64>,
}

/// Batching and rate limiting of oracle calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
    pub article_delay_ms: Option<u64>,
    pub source_delay_ms: Option<u64>,
    /// Only articles published within this many hours are kept
    pub lookback_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactCheckConfig {
    #[serde(default)]
    pub trusted_sources: Vec<String>,
}

/// Wall-clock times ("HH:MM", 24h, UTC) of the two daily jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub collect_time: String,
    pub publish_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token_env: Option<String>,
    pub chat_id: String,
    pub api_url: Option<String>,
}

/// Where the digest goes. Without a telegram section it is printed to stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishingConfig {
    pub telegram: Option<TelegramConfig>,
}

/// RSS / Atom feed source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    pub url: String,
    pub name: Option<String>,
}

/// Website source scraped with CSS selectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteSourceConfig {
    pub name: String,
    pub url: String,
    pub article_selector: String,
    pub title_selector: Option<String>,
    pub content_selector: Option<String>,
    pub date_selector: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub feeds: Vec<FeedSourceConfig>,
    #[serde(default)]
    pub websites: Vec<WebsiteSourceConfig>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: Option<LlmConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub fact_check: Option<FactCheckConfig>,
    pub schedule: Option<ScheduleConfig>,
    pub publishing: Option<PublishingConfig>,
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Trusted fact-check sources, empty when none are configured
    pub fn trusted_sources(&self) -> &[String] {
        self.fact_check
            .as_ref()
            .map(|f| f.trusted_sources.as_slice())
            .unwrap_or(&[])
    }
}

// Tables merge key by key; any other value (arrays included) is replaced wholesale.
fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn config_from_string() {
        let toml = r#"
            [llm]
            adapter = "remote"

            [llm.remote]
            api_key_env = "OPENAI_API_KEY"
            model = "gpt-4o-mini"

            [pipeline]
            batch_size = 5

            [fact_check]
            trusted_sources = ["reuters.com", "apnews.com"]

            [[sources.feeds]]
            url = "https://feeds.bbci.co.uk/news/rss.xml"
            name = "BBC News"

            [[sources.websites]]
            name = "Hacker News"
            url = "https://news.ycombinator.com"
            article_selector = ".athing"
            title_selector = ".titleline > a"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.pipeline.as_ref().and_then(|p| p.batch_size), Some(5));
        assert_eq!(cfg.trusted_sources(), ["reuters.com", "apnews.com"]);
        assert_eq!(cfg.sources.feeds.len(), 1);
        assert_eq!(cfg.sources.websites[0].title_selector.as_deref(), Some(".titleline > a"));
        assert!(cfg.schedule.is_none());
    }

    #[test]
    fn empty_config_is_valid() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert!(cfg.llm.is_none());
        assert!(cfg.trusted_sources().is_empty());
        assert!(cfg.sources.feeds.is_empty());
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        fs::write(
            &default_path,
            r#"
            [pipeline]
            batch_size = 5
            batch_delay_ms = 1000

            [schedule]
            collect_time = "06:00"
            publish_time = "08:00"
            "#,
        )
        .expect("write defaults");
        fs::write(
            &override_path,
            r#"
            [pipeline]
            batch_size = 10

            [schedule]
            publish_time = "09:30"
            "#,
        )
        .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        let pipeline = cfg.pipeline.expect("pipeline section");
        assert_eq!(pipeline.batch_size, Some(10));
        assert_eq!(pipeline.batch_delay_ms, Some(1000));

        let schedule = cfg.schedule.expect("schedule section");
        assert_eq!(schedule.collect_time, "06:00");
        assert_eq!(schedule.publish_time, "09:30");
    }

    #[tokio::test]
    async fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let cfg = Config::load_with_defaults(Some(&missing), None)
            .await
            .expect("load config");
        assert!(cfg.pipeline.is_none());
    }
}
