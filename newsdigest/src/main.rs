/*
newsdigest - main.rs
Collects news from the configured sources and publishes a daily digest,
either once (--run-now) or every day at the scheduled times.
*/

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use newsdigest::ingestion::{Collector, FeedCollector};
use newsdigest::llm::remote::RemoteLlmProvider;
use newsdigest::llm::timeout::TimeoutProvider;
use newsdigest::llm::LlmProvider;
use newsdigest::pipeline::{NewsAggregator, PipelineSettings, RunOutcome};
use newsdigest::publishing::{ConsolePublisher, Publisher, TelegramPublisher};
use newsdigest::schedule::{next_job, DailyTime};
use newsdigest::scraping::WebsiteCollector;

const FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "newsdigest", about = "Daily news digest: collect, analyze, publish")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run one collect + publish cycle immediately and exit
    #[arg(long)]
    run_now: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let llm_config = config
        .llm
        .as_ref()
        .context("missing [llm] section in configuration")?;
    let provider = create_llm_provider(llm_config)?;

    let publisher = create_publisher(&config)?;
    let collectors = create_collectors(&config);
    if collectors.is_empty() {
        warn!("no sources configured; digests will be empty");
    }

    let mut aggregator = NewsAggregator::new(
        provider,
        publisher,
        collectors,
        PipelineSettings::from_config(&config),
    );

    if args.run_now {
        info!("Running one digest cycle now");
        log_outcome(aggregator.run_once().await?);
        return Ok(());
    }

    let shutdown_notify = Arc::new(Notify::new());
    let worker = run_worker(&mut aggregator, &config, shutdown_notify.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
            shutdown_notify.notify_waiters();
        }
        res = worker => {
            if let Err(e) = res {
                error!(%e, "worker encountered an error");
                return Err(e);
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Create the oracle client from the [llm] section
fn create_llm_provider(llm_config: &common::LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let adapter = llm_config.adapter.as_deref().unwrap_or("remote");
    let provider: Arc<dyn LlmProvider> = match adapter {
        "remote" => {
            let remote_config = llm_config
                .remote
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Remote adapter selected but no [llm.remote] section found"))?;

            let api_key_env = remote_config
                .api_key_env
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Missing api_key_env in remote config"))?;
            let api_key = std::env::var(api_key_env)
                .with_context(|| format!("LLM API key env var '{}' not set", api_key_env))?;

            let model = remote_config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            let api_url = remote_config
                .api_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
            let timeout_secs = remote_config.timeout_seconds.unwrap_or(30);
            let max_tokens = remote_config.max_tokens.unwrap_or(1000);

            let provider = RemoteLlmProvider::new(api_url, api_key, model).with_defaults(timeout_secs, max_tokens, 0.3);
            info!("LLM provider initialized: {}", provider.model());
            Arc::new(provider)
        }
        _ => anyhow::bail!("Unknown LLM adapter type: {}", adapter),
    };

    Ok(match llm_config.call_timeout_seconds {
        Some(secs) => Arc::new(TimeoutProvider::new(provider, Duration::from_secs(secs))),
        None => provider,
    })
}

fn create_publisher(config: &Config) -> Result<Arc<dyn Publisher>> {
    let telegram = config.publishing.as_ref().and_then(|p| p.telegram.as_ref());
    let Some(telegram) = telegram else {
        info!("No Telegram publishing configured, printing digests to stdout");
        return Ok(Arc::new(ConsolePublisher));
    };

    let token_env = telegram.bot_token_env.as_deref().unwrap_or("TELEGRAM_BOT_TOKEN");
    let token = std::env::var(token_env)
        .with_context(|| format!("Telegram bot token env var '{}' not set", token_env))?;

    let mut publisher = TelegramPublisher::new(token, telegram.chat_id.clone());
    if let Some(api_url) = &telegram.api_url {
        publisher = publisher.with_api_url(api_url.clone());
    }
    info!(chat_id = %telegram.chat_id, "Telegram publisher initialized");
    Ok(Arc::new(publisher))
}

/// Build one collector per configured source. Misconfigured sources are skipped.
fn create_collectors(config: &Config) -> Vec<Box<dyn Collector>> {
    let mut collectors: Vec<Box<dyn Collector>> = Vec::new();

    for feed in &config.sources.feeds {
        match FeedCollector::new(feed.url.clone(), feed.name.clone(), FETCH_TIMEOUT_SECS) {
            Ok(c) => collectors.push(Box::new(c)),
            Err(e) => warn!("Skipping feed {}: {:#}", feed.url, e),
        }
    }
    for site in &config.sources.websites {
        match WebsiteCollector::new(site.clone(), FETCH_TIMEOUT_SECS) {
            Ok(c) => collectors.push(Box::new(c)),
            Err(e) => warn!("Skipping website {}: {:#}", site.name, e),
        }
    }

    info!("Configured {} sources", collectors.len());
    collectors
}

fn log_outcome(outcome: RunOutcome) {
    match outcome {
        RunOutcome::Published(digest) => info!(
            sections = digest.sections.len(),
            articles = digest.stats.total_articles,
            "digest cycle finished"
        ),
        RunOutcome::NothingToPublish => info!("digest cycle finished with nothing to publish"),
    }
}

/// Collects at `collect_time` and publishes at `publish_time`, every day, until shut down.
async fn run_worker(aggregator: &mut NewsAggregator, config: &Config, shutdown_notify: Arc<Notify>) -> Result<()> {
    let schedule = config
        .schedule
        .as_ref()
        .context("missing [schedule] section; use --run-now for a single run")?;
    let collect_at: DailyTime = schedule.collect_time.parse().context("invalid schedule.collect_time")?;
    let publish_at: DailyTime = schedule.publish_time.parse().context("invalid schedule.publish_time")?;
    info!(
        "worker: collecting at {}, publishing at {} (UTC)",
        schedule.collect_time, schedule.publish_time
    );

    loop {
        let now = Utc::now();
        let (next, job) = next_job(collect_at, publish_at, now);

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!("worker: next {} at {}", job, next);

        select! {
            _ = tokio::time::sleep(wait) => {},
            _ = shutdown_notify.notified() => {
                info!("worker: shutdown requested, exiting loop");
                break;
            }
        }

        if job.collects() {
            aggregator.collect().await;
        }
        if job.publishes() {
            match aggregator.process_and_publish().await {
                Ok(outcome) => log_outcome(outcome),
                Err(e) => error!("worker: publishing failed: {:#}", e),
            }
        }
    }

    info!("worker: cleanup complete");
    Ok(())
}
