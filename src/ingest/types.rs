// src/ingest/types.rs
use crate::article::{Article, SourceTier};
use anyhow::Result;

/// A news feed that yields articles of one tier.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
    fn tier(&self) -> SourceTier;
}
