use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use common::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::analysis::{self, AnalysisSettings};
use crate::digest;
use crate::ingestion::{self, Collector};
use crate::llm::LlmProvider;
use crate::model::{DailyDigest, RawArticle};
use crate::processing::{self, BatchSettings};
use crate::publishing::{Publisher, NO_ARTICLES_NOTICE};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub batch: BatchSettings,
    pub analysis: AnalysisSettings,
    /// Pause between two sources during collection
    pub source_delay: Duration,
    /// Collected articles older than this are ignored
    pub lookback: ChronoDuration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch: BatchSettings::default(),
            analysis: AnalysisSettings::default(),
            source_delay: Duration::from_millis(500),
            lookback: ChronoDuration::hours(24),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        let pipeline = config.pipeline.clone().unwrap_or_default();

        Self {
            batch: BatchSettings {
                batch_size: pipeline.batch_size.unwrap_or(defaults.batch.batch_size).max(1),
                batch_delay: pipeline
                    .batch_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.batch.batch_delay),
            },
            analysis: AnalysisSettings {
                article_delay: pipeline
                    .article_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.analysis.article_delay),
                trusted_sources: config.trusted_sources().to_vec(),
            },
            source_delay: pipeline
                .source_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.source_delay),
            lookback: pipeline
                .lookback_hours
                .map(ChronoDuration::hours)
                .unwrap_or(defaults.lookback),
        }
    }
}

/// What a publish run produced
#[derive(Debug)]
pub enum RunOutcome {
    Published(DailyDigest),
    NothingToPublish,
}

/// Collects articles and turns them into a published digest.
///
/// The oracle, publisher and collectors are passed in explicitly.
pub struct NewsAggregator {
    provider: Arc<dyn LlmProvider>,
    publisher: Arc<dyn Publisher>,
    collectors: Vec<Box<dyn Collector>>,
    settings: PipelineSettings,
    collected: Vec<RawArticle>,
}

impl NewsAggregator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        publisher: Arc<dyn Publisher>,
        collectors: Vec<Box<dyn Collector>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            publisher,
            collectors,
            settings,
            collected: Vec::new(),
        }
    }

    /// Gather recent articles from every source, replacing any previous collection
    pub async fn collect(&mut self) -> usize {
        info!("Starting article collection from {} sources", self.collectors.len());
        let articles = ingestion::collect_all(&self.collectors, self.settings.source_delay).await;
        self.collected = ingestion::retain_recent(articles, Utc::now(), self.settings.lookback);
        info!("Total collected: {} articles", self.collected.len());
        self.collected.len()
    }

    /// Process the collected articles and hand the digest to the publisher.
    /// The collection is cleared once the publisher accepts the digest or the
    /// notice; after a failed publish it stays pending for the next attempt.
    pub async fn process_and_publish(&mut self) -> Result<RunOutcome> {
        let outcome = match self.digest_for(self.collected.clone()).await {
            Some(digest) => {
                info!("Publishing digest with {} sections", digest.sections.len());
                self.publisher
                    .publish_digest(&digest)
                    .await
                    .with_context(|| format!("{} collected articles kept for retry", self.collected.len()))?;
                info!("Digest published successfully");
                RunOutcome::Published(digest)
            }
            None => {
                info!("No articles to process");
                self.publisher.publish_notice(NO_ARTICLES_NOTICE).await?;
                RunOutcome::NothingToPublish
            }
        };

        self.collected.clear();
        Ok(outcome)
    }

    /// Articles collected and not yet published
    pub fn pending(&self) -> usize {
        self.collected.len()
    }

    /// Collect, then process and publish
    pub async fn run_once(&mut self) -> Result<RunOutcome> {
        self.collect().await;
        self.process_and_publish().await
    }

    /// Deduplicate, classify, analyze and assemble. `None` for an empty input.
    pub async fn digest_for(&self, articles: Vec<RawArticle>) -> Option<DailyDigest> {
        if articles.is_empty() {
            return None;
        }

        let provider = self.provider.as_ref();
        let processed = processing::process_articles(provider, articles, &self.settings.batch).await;
        info!("Processed {} unique articles", processed.len());

        let analyzed = analysis::analyze_articles(provider, processed, &self.settings.analysis).await;
        Some(digest::assemble_digest(&analyzed, Utc::now()))
    }
}
