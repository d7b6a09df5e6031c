// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::article::SourceTier;
use crate::ingest::providers::{JsonFeedProvider, RssProvider};
use crate::ingest::types::SourceProvider;

const ENV_PATH: &str = "INGEST_FEEDS_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    #[default]
    Rss,
    Json,
}

fn default_enabled() -> bool {
    true
}

/// One configured feed; several URLs share the source name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub tier: SourceTier,
    #[serde(default)]
    pub kind: FeedKind,
    pub urls: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl FeedConfig {
    fn new(name: &str, tier: SourceTier, urls: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tier,
            kind: FeedKind::Rss,
            urls: urls.iter().map(|u| u.to_string()).collect(),
            enabled: true,
        }
    }

    pub fn build_provider(&self) -> Result<Box<dyn SourceProvider>> {
        let urls = self.urls.clone();
        Ok(match self.kind {
            FeedKind::Rss => Box::new(RssProvider::from_urls(&self.name, self.tier, urls)?),
            FeedKind::Json => Box::new(JsonFeedProvider::from_urls(&self.name, self.tier, urls)?),
        })
    }
}

/// Wire services (Layer 1) and mass outlets (Layer 2).
pub fn default_feeds() -> Vec<FeedConfig> {
    use SourceTier::{Primary, Secondary};
    vec![
        FeedConfig::new(
            "Reuters",
            Primary,
            &[
                "https://www.reuters.com/rssfeed/businessNews",
                "https://www.reuters.com/rssfeed/marketsNews",
                "https://www.reuters.com/rssfeed/technologyNews",
            ],
        ),
        FeedConfig::new(
            "WSJ",
            Primary,
            &[
                "https://feeds.a.dj.com/rss/WSJcomUSBusiness.xml",
                "https://feeds.a.dj.com/rss/RSSMarketsMain.xml",
                "https://feeds.a.dj.com/rss/RSSWSJD.xml",
            ],
        ),
        FeedConfig::new(
            "Bloomberg",
            Primary,
            &["https://www.bloomberg.com/politics/feeds/site.xml"],
        ),
        FeedConfig::new(
            "Fox News",
            Secondary,
            &[
                "https://moxie.foxnews.com/google-publisher/latest.xml",
                "https://moxie.foxnews.com/google-publisher/politics.xml",
            ],
        ),
        FeedConfig::new(
            "CNN",
            Secondary,
            &[
                "http://rss.cnn.com/rss/money_news_economy.rss",
                "http://rss.cnn.com/rss/cnn_topstories.rss",
            ],
        ),
        FeedConfig::new(
            "Yahoo Finance",
            Secondary,
            &[
                "https://finance.yahoo.com/news/rssindex",
                "https://finance.yahoo.com/rss/topstories",
            ],
        ),
    ]
}

/// Load feeds from an explicit path. Supports TOML (`[[feeds]]`) or a JSON array.
pub fn load_feeds_from(path: &Path) -> Result<Vec<FeedConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Load feeds using env var + fallbacks:
/// 1) $INGEST_FEEDS_PATH
/// 2) config/feeds.toml
/// 3) config/feeds.json
/// 4) the built-in list
pub fn load_feeds_default() -> Result<Vec<FeedConfig>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("INGEST_FEEDS_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feeds.json");
    if json_p.exists() {
        return load_feeds_from(&json_p);
    }
    Ok(default_feeds())
}

/// Build providers for enabled feeds, split into (primary, secondary).
pub fn build_providers(
    feeds: &[FeedConfig],
) -> Result<(Vec<Box<dyn SourceProvider>>, Vec<Box<dyn SourceProvider>>)> {
    let mut primary = Vec::new();
    let mut secondary = Vec::new();
    for f in feeds.iter().filter(|f| f.enabled) {
        let p = f.build_provider()?;
        match f.tier {
            SourceTier::Primary => primary.push(p),
            SourceTier::Secondary => secondary.push(p),
        }
    }
    Ok((primary, secondary))
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<Vec<FeedConfig>> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[feeds]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feeds format"))
}

fn parse_toml(s: &str) -> Result<Vec<FeedConfig>> {
    #[derive(Deserialize)]
    struct TomlFeeds {
        feeds: Vec<FeedConfig>,
    }
    let v: TomlFeeds = toml::from_str(s)?;
    Ok(clean_list(v.feeds))
}

fn parse_json(s: &str) -> Result<Vec<FeedConfig>> {
    let v: Vec<FeedConfig> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim names/urls, drop empty urls and feeds left without a name or url.
fn clean_list(items: Vec<FeedConfig>) -> Vec<FeedConfig> {
    items
        .into_iter()
        .filter_map(|mut f| {
            f.name = f.name.trim().to_string();
            f.urls = f
                .urls
                .iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect();
            (!f.name.is_empty() && !f.urls.is_empty()).then_some(f)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_formats_work() {
        let toml = r#"
[[feeds]]
name = " Reuters "
tier = "primary"
urls = ["https://a/rss", " "]

[[feeds]]
name = "Empty"
tier = "secondary"
urls = []
"#;
        let json = r#"[{"name": "Wire", "tier": "secondary", "kind": "json", "urls": ["https://w"], "enabled": false}]"#;
        let t = parse_feeds(toml, "toml").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].name, "Reuters");
        assert_eq!(t[0].urls, vec!["https://a/rss".to_string()]);
        assert_eq!(t[0].kind, FeedKind::Rss);
        assert!(t[0].enabled);

        let j = parse_feeds(json, "json").unwrap();
        assert_eq!(j[0].kind, FeedKind::Json);
        assert!(!j[0].enabled);
    }

    #[test]
    fn default_list_covers_both_tiers() {
        let feeds = default_feeds();
        assert!(feeds.iter().any(|f| f.tier == SourceTier::Primary));
        assert!(feeds.iter().any(|f| f.tier == SourceTier::Secondary));
        let (p, s) = build_providers(&feeds).unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_feeds("not a feed list", "txt").is_err());
    }
}
