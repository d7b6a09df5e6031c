// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod amplification;
pub mod article;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod sentiment;
pub mod store;

// Symbol extraction, policy detection, priority scoring, LLM relevance
pub mod analyze;

// Feed providers, feed config, scheduler
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::amplification::{AmplificationDetector, AmplificationLevel, AmplificationResult};
pub use crate::article::{Article, SourceTier};
pub use crate::pipeline::{AnalyzedArticle, NewsPipeline, PipelineReport, PipelineStats};
