//! Persistence collaborator for analyzed articles.
//!
//! `JsonlStore` appends one JSON object per article to a file. Lookups scan
//! the file; it is meant for a single scheduled writer, not concurrent ones.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::pipeline::AnalyzedArticle;

/// Filter for `ArticleStore::query`; empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub min_relevance: Option<u8>,
}

impl StoreQuery {
    fn matches(&self, a: &AnalyzedArticle) -> bool {
        if let Some(id) = &self.id {
            if a.article.id() != id {
                return false;
            }
        }
        if let Some(sym) = &self.symbol {
            if !a.symbols.contains(&sym.to_ascii_uppercase()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if !a.article.published_since(since) {
                return false;
            }
        }
        if let Some(min) = self.min_relevance {
            if !a.relevance.as_ref().is_some_and(|r| r.relevance_score >= min) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn contains_url(&self, url: &str) -> Result<bool>;
    async fn insert(&self, item: &AnalyzedArticle) -> Result<()>;
    async fn query(&self, q: &StoreQuery) -> Result<Vec<AnalyzedArticle>>;
}

pub struct JsonlStore {
    path: PathBuf,
    // serializes appends from one process
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All readable rows; corrupt lines are logged and skipped.
    async fn load(&self) -> Result<Vec<AnalyzedArticle>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading store {}", self.path.display()))
            }
        };
        let mut out = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AnalyzedArticle>(line) {
                Ok(a) => out.push(a),
                Err(e) => warn!(target: "pipeline", line = n + 1, error = %e, "corrupt store row"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ArticleStore for JsonlStore {
    async fn contains_url(&self, url: &str) -> Result<bool> {
        Ok(self
            .load()
            .await?
            .iter()
            .any(|a| a.article.url() == Some(url)))
    }

    async fn insert(&self, item: &AnalyzedArticle) -> Result<()> {
        let mut line = serde_json::to_string(item).context("serializing analyzed article")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening store {}", self.path.display()))?;
        f.write_all(line.as_bytes()).await.context("appending to store")?;
        f.flush().await.context("flushing store")?;
        Ok(())
    }

    async fn query(&self, q: &StoreQuery) -> Result<Vec<AnalyzedArticle>> {
        Ok(self.load().await?.into_iter().filter(|a| q.matches(a)).collect())
    }
}
