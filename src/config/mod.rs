// src/config/mod.rs
//! Pipeline configuration (`config/pipeline.toml`).
//!
//! Every section is optional; a missing file means all defaults.

pub mod ai;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::amplification::{TopicMatching, DEFAULT_WINDOW_HOURS};
use crate::analyze::ai_adapter::DEFAULT_MIN_RELEVANCE_SCORE;
use crate::analyze::ner::{SymbolEntry, SymbolRegistry};

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Persist analyzed articles when a store is configured.
    pub save: bool,
    pub window_hours: i64,
    pub topic_matching: TopicMatching,
    pub min_relevance_score: u8,
    /// Run the organization-recognizer pass of symbol extraction.
    pub recognize_organizations: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            save: true,
            window_hours: DEFAULT_WINDOW_HOURS,
            topic_matching: TopicMatching::Raw,
            min_relevance_score: DEFAULT_MIN_RELEVANCE_SCORE,
            recognize_organizations: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// 0 runs once and exits.
    pub interval_secs: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// JSON-lines file; no path means no store.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pipeline: PipelineSection,
    pub schedule: ScheduleSection,
    pub store: StoreSection,
    /// Extra tickers on top of the built-in registry.
    pub symbols: Vec<SymbolEntry>,
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: PipelineConfig = toml::from_str(s).context("parsing pipeline config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// `$PIPELINE_CONFIG_PATH` (must exist), else `config/pipeline.toml` when
    /// present, else defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
            return Self::load_from(Path::new(&p));
        }
        let p = PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }

    /// Built-in tickers plus `[[symbols]]`.
    pub fn symbol_registry(&self) -> SymbolRegistry {
        let mut reg = SymbolRegistry::default_seed();
        for s in &self.symbols {
            reg.add_symbol(&s.ticker, &s.company);
        }
        reg
    }

    fn sanitize(&mut self) {
        if self.pipeline.window_hours <= 0 {
            self.pipeline.window_hours = DEFAULT_WINDOW_HOURS;
        }
        self.pipeline.min_relevance_score = self.pipeline.min_relevance_score.min(100);
    }
}
