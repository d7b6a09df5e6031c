// src/article.rs
//! Article record shared by ingest, analyzers and the pipeline.
//!
//! Fields are private: an `Article` is assembled once by a provider through
//! `Article::new` + the consuming `with_*` builders and is read-only afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Layer of the source that published an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    /// Layer 1: wire services and other low-volume, high-credibility outlets.
    Primary,
    /// Layer 2: high-volume, opinion-driven outlets.
    Secondary,
}

impl SourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::Primary => "primary",
            SourceTier::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for SourceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    id: String,
    source_name: String,
    tier: SourceTier,
    title: String,
    body: String,
    url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    symbols: BTreeSet<String>,
    sentiment_score: f32,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

impl Article {
    pub fn new(
        source_name: impl Into<String>,
        tier: SourceTier,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            id: article_id(&title),
            source_name: source_name.into(),
            tier,
            title,
            body: body.into(),
            url: None,
            published_at: None,
            symbols: BTreeSet::new(),
            sentiment_score: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach the canonical URL. The id is re-derived from it, so two feeds
    /// carrying the same link produce the same id.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.trim().is_empty() {
            self.id = article_id(&url);
            self.url = Some(url);
        }
        self
    }

    pub fn with_published_at(mut self, ts: DateTime<Utc>) -> Self {
        self.published_at = Some(ts);
        self
    }

    /// Merge symbols into the existing set (feeds sometimes pre-tag them).
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for s in symbols {
            let s = s.into();
            let t = s.trim();
            if !t.is_empty() {
                self.symbols.insert(t.to_ascii_uppercase());
            }
        }
        self
    }

    /// Sentiment in [-1, 1]; NaN is treated as neutral.
    pub fn with_sentiment(mut self, score: f32) -> Self {
        self.sentiment_score = if score.is_nan() {
            0.0
        } else {
            score.clamp(-1.0, 1.0)
        };
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn source_name(&self) -> &str {
        &self.source_name
    }
    pub fn tier(&self) -> SourceTier {
        self.tier
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn body(&self) -> &str {
        &self.body
    }
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
    pub fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }
    pub fn sentiment_score(&self) -> f32 {
        self.sentiment_score
    }
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Text fed to the analyzers: title and body joined by a space.
    pub fn text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.body)
        }
    }

    /// True when the article has a timestamp at or after `cutoff`.
    pub fn published_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.published_at.is_some_and(|ts| ts >= cutoff)
    }

    /// True when the article mentions at least one of `wanted`.
    pub fn mentions_any(&self, wanted: &BTreeSet<String>) -> bool {
        self.symbols.iter().any(|s| wanted.contains(s))
    }
}

/// Short, stable id: first 8 bytes of SHA-256 as hex.
fn article_id(seed: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(seed.trim().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
