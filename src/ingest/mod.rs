// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::article::Article;
use crate::ingest::types::SourceProvider;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// Body text is capped at this many characters after normalization.
pub const MAX_TEXT_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_articles_total", "Articles parsed from providers.");
        describe_counter!(
            "ingest_kept_total",
            "Articles kept after normalization + URL dedup."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Articles dropped for an empty title."
        );
        describe_counter!("ingest_dedup_total", "Articles removed as duplicate URLs.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "ingest_item_errors_total",
            "Feed items skipped because they failed to parse."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when a tier was last collected."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, ASCII quotes, collapse
/// whitespace, drop trailing sentence punctuation, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

/// Drop untitled articles and repeated URLs (first occurrence wins).
/// Returns (kept, filtered_count, dedup_count).
pub fn filter_dedup(raw: Vec<Article>) -> (Vec<Article>, usize, usize) {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(raw.len());
    let mut filtered_out = 0usize;
    let mut dedup_out = 0usize;

    for a in raw {
        if a.title().trim().is_empty() {
            filtered_out += 1;
            continue;
        }
        if let Some(url) = a.url() {
            if !seen_urls.insert(url.to_string()) {
                dedup_out += 1;
                continue;
            }
        }
        keep.push(a);
    }

    (keep, filtered_out, dedup_out)
}

/// Fetch every provider in order. A failing provider is logged, counted and
/// contributes nothing; the rest of the tier still loads.
pub async fn collect(providers: &[Box<dyn SourceProvider>]) -> Vec<Article> {
    ensure_metrics_described();

    let mut raw = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => {
                tracing::debug!(target: "ingest", provider = p.name(), count = v.len(), "provider fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let (kept, filtered_cnt, dedup_cnt) = filter_dedup(raw);

    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_filtered_total").increment(filtered_cnt as u64);
    counter!("ingest_dedup_total").increment(dedup_cnt as u64);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    kept
}
