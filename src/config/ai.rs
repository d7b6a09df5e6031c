// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, sync::Arc};
use tracing::info;

use crate::analyze::ai_adapter::{ClaudeRelevanceAnalyzer, DynRelevanceAnalyzer};
use crate::sentiment::{HostedFinbert, SentimentScorer};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_relevance_provider() -> String {
    "claude".to_string()
}
fn default_model_provider() -> String {
    "finbert".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceAiConfig {
    pub enabled: bool,
    /// "claude" (case-insensitive)
    #[serde(default = "default_relevance_provider")]
    pub provider: String,
    /// "ENV" means: read from ANTHROPIC_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for RelevanceAiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_relevance_provider(),
            api_key: default_api_key(),
            model: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentModelConfig {
    pub enabled: bool,
    /// "finbert" (case-insensitive)
    #[serde(default = "default_model_provider")]
    pub provider: String,
    #[serde(default)]
    pub endpoint: String,
    /// "ENV" means: read from FINBERT_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for SentimentModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_model_provider(),
            endpoint: String::new(),
            api_key: default_api_key(),
        }
    }
}

/// Optional model-backed collaborators, loaded from `config/ai.json`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub relevance: RelevanceAiConfig,
    #[serde(default)]
    pub sentiment_model: SentimentModelConfig,
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Missing default file means everything disabled.
    pub fn load_default() -> anyhow::Result<Self> {
        let p = Path::new(DEFAULT_AI_CONFIG_PATH);
        if p.exists() {
            Self::load_from_file(p)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AiConfig = serde_json::from_str(data)?;

        // Normalize providers
        cfg.relevance.provider = cfg.relevance.provider.to_lowercase();
        cfg.sentiment_model.provider = cfg.sentiment_model.provider.to_lowercase();

        // Resolve api keys if "ENV" (only for enabled collaborators)
        if cfg.relevance.enabled && cfg.relevance.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.relevance.api_key = match cfg.relevance.provider.as_str() {
                "claude" => env::var("ANTHROPIC_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing ANTHROPIC_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported relevance provider in config: {other}"),
            };
        }
        if cfg.sentiment_model.enabled
            && cfg.sentiment_model.api_key.trim().eq_ignore_ascii_case("env")
        {
            cfg.sentiment_model.api_key = match cfg.sentiment_model.provider.as_str() {
                "finbert" => env::var("FINBERT_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing FINBERT_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported sentiment model provider in config: {other}"),
            };
        }
        if cfg.sentiment_model.enabled && cfg.sentiment_model.endpoint.trim().is_empty() {
            anyhow::bail!("sentiment_model.endpoint is required when enabled");
        }

        Ok(cfg)
    }

    /// `None` when the relevance collaborator is disabled.
    pub fn build_relevance_analyzer(&self) -> anyhow::Result<Option<DynRelevanceAnalyzer>> {
        if !self.relevance.enabled {
            return Ok(None);
        }
        // Safe diagnostics: only provider + key length
        info!(
            provider = %self.relevance.provider,
            key_len = self.relevance.api_key.len(),
            "relevance analyzer enabled"
        );
        let analyzer =
            ClaudeRelevanceAnalyzer::new(&self.relevance.api_key, self.relevance.model.as_deref())?;
        Ok(Some(Arc::new(analyzer)))
    }

    /// Lexicon only unless the hosted model is enabled.
    pub fn build_sentiment_scorer(&self) -> anyhow::Result<SentimentScorer> {
        if !self.sentiment_model.enabled {
            return Ok(SentimentScorer::lexicon_only());
        }
        info!(
            provider = %self.sentiment_model.provider,
            endpoint = %self.sentiment_model.endpoint,
            "sentiment model enabled"
        );
        let model = HostedFinbert::new(&self.sentiment_model.endpoint, &self.sentiment_model.api_key)?;
        Ok(SentimentScorer::with_model(Arc::new(model)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_needs_no_keys() {
        let cfg = AiConfig::from_json_str(r#"{"relevance": {"enabled": false}}"#).unwrap();
        assert_eq!(cfg.relevance.api_key, "ENV");
        assert!(cfg.build_relevance_analyzer().unwrap().is_none());
        assert!(!cfg.build_sentiment_scorer().unwrap().has_model());
    }

    #[test]
    fn explicit_keys_build_collaborators() {
        let cfg = AiConfig::from_json_str(
            r#"{
              "relevance": {"enabled": true, "provider": "Claude", "api_key": "sk-test"},
              "sentiment_model": {"enabled": true, "endpoint": "http://localhost:9/finbert", "api_key": "hf-test"}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.relevance.provider, "claude");
        let analyzer = cfg.build_relevance_analyzer().unwrap().unwrap();
        assert_eq!(analyzer.name(), "claude");
        assert!(cfg.build_sentiment_scorer().unwrap().has_model());
    }

    #[test]
    fn unknown_provider_and_missing_endpoint_are_errors() {
        assert!(AiConfig::from_json_str(
            r#"{"relevance": {"enabled": true, "provider": "other"}}"#
        )
        .is_err());
        assert!(AiConfig::from_json_str(
            r#"{"sentiment_model": {"enabled": true, "api_key": "k"}}"#
        )
        .is_err());
    }
}
