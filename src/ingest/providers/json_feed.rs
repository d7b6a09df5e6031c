// src/ingest/providers/json_feed.rs
//! JSON array feed in the collector hand-off shape:
//! `{title, content, source, published_at, symbols, metadata, url?}`.
//! Items that fail to parse are logged and skipped.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::article::{Article, SourceTier};
use crate::ingest::normalize_text;
use crate::ingest::types::SourceProvider;

use super::{http_client, parse_feed_date};

#[derive(Debug, Deserialize)]
struct RawItem {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

pub struct JsonFeedProvider {
    name: String,
    tier: SourceTier,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        urls: Vec<String>,
        client: reqwest::Client,
    },
}

impl JsonFeedProvider {
    pub fn from_fixture(name: impl Into<String>, tier: SourceTier, json: &str) -> Self {
        Self {
            name: name.into(),
            tier,
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_urls(name: impl Into<String>, tier: SourceTier, urls: Vec<String>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            tier,
            mode: Mode::Http {
                urls,
                client: http_client()?,
            },
        })
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();
        let items: Vec<Value> = serde_json::from_str(s)
            .with_context(|| format!("parsing {} json feed", self.name))?;

        let mut out = Vec::with_capacity(items.len());
        for (idx, raw) in items.into_iter().enumerate() {
            match self.item_to_article(raw) {
                Ok(a) => out.push(a),
                Err(e) => {
                    tracing::warn!(target: "ingest", provider = %self.name, idx, error = %e, "skipping feed item");
                    counter!("ingest_item_errors_total").increment(1);
                }
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_articles_total").increment(out.len() as u64);
        Ok(out)
    }

    fn item_to_article(&self, raw: Value) -> Result<Article> {
        let item: RawItem = serde_json::from_value(raw).context("item shape")?;
        let title = normalize_text(&item.title);
        if title.is_empty() {
            return Err(anyhow!("empty title"));
        }

        let source = item
            .source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.name.clone());
        let mut article = Article::new(source, self.tier, title, normalize_text(&item.content))
            .with_symbols(item.symbols);

        if let Some(ts) = item.published_at.as_deref() {
            let parsed = parse_feed_date(ts).ok_or_else(|| anyhow!("bad published_at {ts:?}"))?;
            article = article.with_published_at(parsed);
        }
        if let Some(url) = item.url {
            article = article.with_url(url.trim());
        }
        if let Some(score) = item.metadata.get("sentiment_score").and_then(Value::as_f64) {
            article = article.with_sentiment(score as f32);
        }
        for (k, v) in item.metadata {
            article = article.with_metadata(k, v);
        }
        Ok(article)
    }
}

#[async_trait]
impl SourceProvider for JsonFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { urls, client } => {
                let mut out = Vec::new();
                let mut failures = 0usize;
                for url in urls {
                    let fetched = async {
                        let resp = client.get(url).send().await.context("json feed get()")?;
                        let resp = resp.error_for_status().context("json feed status")?;
                        let body = resp.text().await.context("json feed .text()")?;
                        self.parse_items_from_str(&body)
                    }
                    .await;
                    match fetched {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(target: "ingest", error = ?e, provider = %self.name, %url, "feed url failed");
                        }
                    }
                }
                if failures > 0 && failures == urls.len() {
                    return Err(anyhow!("all {} feed urls failed for {}", failures, self.name));
                }
                Ok(out)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> SourceTier {
        self.tier
    }
}
