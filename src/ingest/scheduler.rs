// src/ingest/scheduler.rs
use crate::pipeline::NewsPipeline;
use metrics::{counter, gauge};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    /// Seconds between run starts; clamped to at least 1.
    pub interval_secs: u64,
    pub save: bool,
}

/// Run the pipeline on a fixed interval, first tick immediately. A run that
/// overruns its interval delays the next one instead of stacking up.
pub fn spawn_scheduler(cfg: SchedulerCfg, pipeline: Arc<NewsPipeline>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(cfg.interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = pipeline.run(cfg.save).await;

            counter!("scheduler_ticks_total").increment(1);
            gauge!("scheduler_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

            tracing::info!(
                target: "ingest",
                analyzed = report.stats.analyzed_count,
                saved = report.stats.saved_count,
                amplification = report.stats.amplification_detected,
                "scheduled tick"
            );
        }
    })
}
