// src/ingest/providers/mod.rs
pub mod json_feed;
pub mod rss;

use chrono::{DateTime, NaiveDateTime, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

pub use json_feed::JsonFeedProvider;
pub use rss::RssProvider;

/// Feed HTTP timeout.
pub const FEED_TIMEOUT_SECS: u64 = 20;

pub(crate) fn http_client() -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .user_agent("news-signal-analyzer/0.1")
        .connect_timeout(std::time::Duration::from_secs(5))
        .timeout(std::time::Duration::from_secs(FEED_TIMEOUT_SECS))
        .build()
        .context("building feed http client")
}

/// RFC 2822 (RSS pubDate) first, then RFC 3339, then ISO-8601 without an
/// offset, which is read as UTC.
pub fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Some(unix) = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
    {
        return DateTime::<Utc>::from_timestamp(unix, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
