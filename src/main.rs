//! News Signal Analyzer: binary entrypoint.
//! Loads config, builds feed providers, and runs the pipeline once or on a schedule.

use anyhow::Context;
use news_signal_analyzer::config::{ai::AiConfig, PipelineConfig};
use news_signal_analyzer::ingest::config::{build_providers, load_feeds_default};
use news_signal_analyzer::ingest::scheduler::{spawn_scheduler, SchedulerCfg};
use news_signal_analyzer::metrics::Metrics;
use news_signal_analyzer::NewsPipeline;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_signal_analyzer=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn run_once_requested(cfg: &PipelineConfig) -> bool {
    cfg.schedule.interval_secs == 0
        || std::env::var("PIPELINE_RUN_ONCE")
            .ok()
            .is_some_and(|v| v == "1")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let _metrics = Metrics::init_from_env()?;

    let cfg = PipelineConfig::load_default().context("loading pipeline config")?;
    let ai = AiConfig::load_default().context("loading ai config")?;
    let feeds = load_feeds_default().context("loading feed list")?;
    let (primary, secondary) = build_providers(&feeds)?;

    tracing::info!(
        primary_feeds = primary.len(),
        secondary_feeds = secondary.len(),
        window_hours = cfg.pipeline.window_hours,
        save = cfg.pipeline.save,
        "pipeline configured"
    );

    let pipeline = NewsPipeline::from_config(&cfg, &ai, primary, secondary)?;

    if run_once_requested(&cfg) {
        let report = pipeline.run(cfg.pipeline.save).await;
        let out = serde_json::json!({
            "stats": report.stats,
            "amplification": report.amplification,
            "trending_symbols": report.trending_symbols,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let handle = spawn_scheduler(
        SchedulerCfg {
            interval_secs: cfg.schedule.interval_secs,
            save: cfg.pipeline.save,
        },
        Arc::new(pipeline),
    );

    tokio::select! {
        res = handle => res.context("scheduler task ended")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }
    Ok(())
}
