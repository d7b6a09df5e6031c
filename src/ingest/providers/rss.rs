// src/ingest/providers/rss.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::Value;

use crate::article::{Article, SourceTier};
use crate::ingest::normalize_text;
use crate::ingest::types::SourceProvider;

use super::{http_client, parse_feed_date};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(default)]
    category: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "$text", default)]
    value: String,
}

/// RSS 2.0 feed of one tier. Several URLs may share one source name
/// (e.g. a publisher's business and markets feeds).
pub struct RssProvider {
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

impl RssProvider {
    pub fn from_fixture(name: impl Into<String>, tier: SourceTier, xml: &str) -> Self {
        Self {
            name: name.into(),
            tier,
            mode: Mode::Fixture(xml.to_string()),
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
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", self.name))?;

        let fetched_at = Utc::now();
        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let body = normalize_text(it.description.as_deref().unwrap_or_default());

            // undated items are stamped with the fetch time
            let published = it
                .pub_date
                .as_deref()
                .and_then(parse_feed_date)
                .unwrap_or(fetched_at);

            let mut article = Article::new(self.name.clone(), self.tier, title, body)
                .with_published_at(published);
            if let Some(link) = it.link {
                article = article.with_url(link.trim());
            }
            let categories: Vec<Value> = it
                .category
                .into_iter()
                .map(|c| c.value.trim().to_string())
                .filter(|c| !c.is_empty())
                .map(Value::String)
                .collect();
            if !categories.is_empty() {
                article = article.with_metadata("categories", Value::Array(categories));
            }
            out.push(article);
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_articles_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { urls, client } => {
                let mut out = Vec::new();
                let mut failures = 0usize;
                for url in urls {
                    let fetched = async {
                        let resp = client.get(url).send().await.context("rss http get()")?;
                        let resp = resp.error_for_status().context("rss http status")?;
                        let body = resp.text().await.context("rss http .text()")?;
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

/// quick-xml only knows the XML entities; map common HTML ones first.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Wire</title>
<item>
  <title>Fed holds rates&nbsp;steady</title>
  <link>https://example.com/a</link>
  <pubDate>Tue, 10 Sep 2024 14:30:00 GMT</pubDate>
  <description><![CDATA[<p>Policy makers <b>paused</b>.</p>]]></description>
  <category domain="x">Markets</category>
  <category>Economy</category>
</item>
<item>
  <title></title>
  <link>https://example.com/b</link>
</item>
<item>
  <title>Undated wire</title>
</item>
</channel></rss>"#;

    #[tokio::test]
    async fn parses_items_categories_and_dates() {
        let p = RssProvider::from_fixture("Reuters", SourceTier::Primary, XML);
        let out = p.fetch_latest().await.unwrap();
        assert_eq!(out.len(), 2);

        let a = &out[0];
        assert_eq!(a.title(), "Fed holds rates steady");
        assert_eq!(a.body(), "Policy makers paused");
        assert_eq!(a.url(), Some("https://example.com/a"));
        assert_eq!(a.tier(), SourceTier::Primary);
        assert_eq!(
            a.metadata()["categories"],
            serde_json::json!(["Markets", "Economy"])
        );
        assert_eq!(a.published_at().unwrap().to_rfc3339(), "2024-09-10T14:30:00+00:00");

        // missing pubDate falls back to fetch time
        assert!(out[1].published_at().is_some());
        assert!(out[1].url().is_none());
    }

    #[tokio::test]
    async fn malformed_xml_is_an_error() {
        let p = RssProvider::from_fixture("CNN", SourceTier::Secondary, "<rss><channel>");
        assert!(p.fetch_latest().await.is_err());
    }
}
