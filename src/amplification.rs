//! # Amplification Detector
//! How strongly a Layer 1 (primary) story is re-covered by Layer 2 (secondary)
//! outlets within a time window.
//!
//! Pure business logic: no I/O, no state kept between calls. `detect` reads the
//! wall clock; `detect_at` takes `now` explicitly and is what tests drive.
//!
//! Steps: symbol filter → time-window filter → zero result if no primary →
//! ratio, topic overlap, sentiment shift → level and flag.

use crate::article::Article;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const MAX_MATCHED_TOPICS: usize = 5;

/// Primary-title words must be longer than this to act as topic keywords.
const MIN_TOPIC_WORD_CHARS: usize = 3;
/// Group sentiment label cut-offs (exclusive).
const SHIFT_POSITIVE: f32 = 0.1;
const SHIFT_NEGATIVE: f32 = -0.1;

/// Trend tracking walks back this many buckets from `now`.
pub const TREND_BUCKETS: i64 = 4;

/// Words ignored by `TopicMatching::SkipStopWords`.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "of", "and", "or", "to", "in", "is", "are", "for", "on", "with", "that",
    "as", "at", "by", "from", "this", "it", "be", "will", "can", "not", "we", "our", "their",
    "has", "have", "had", "but", "if", "into", "about", "over", "per", "vs", "vs.", "###", "##",
    "#",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmplificationLevel {
    None,
    Low,
    Medium,
    High,
    Viral,
}

impl AmplificationLevel {
    /// viral: ratio > 10 or topics > 5; high: ratio > 5; medium: ratio > 2; else low.
    pub fn classify(ratio: f64, topic_count: usize) -> Self {
        if ratio > 10.0 || topic_count > 5 {
            AmplificationLevel::Viral
        } else if ratio > 5.0 {
            AmplificationLevel::High
        } else if ratio > 2.0 {
            AmplificationLevel::Medium
        } else {
            AmplificationLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AmplificationLevel::None => "none",
            AmplificationLevel::Low => "low",
            AmplificationLevel::Medium => "medium",
            AmplificationLevel::High => "high",
            AmplificationLevel::Viral => "viral",
        }
    }
}

/// How primary-title words become topic keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicMatching {
    /// Every whitespace-separated word longer than three characters.
    #[default]
    Raw,
    /// Same, minus common stop words.
    SkipStopWords,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmplificationDetails {
    pub primary_sources: Vec<String>,
    pub secondary_sources: Vec<String>,
    pub window_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplificationResult {
    pub has_amplification: bool,
    /// secondary / primary, rounded to 2 decimals.
    pub ratio: f64,
    pub primary_count: usize,
    pub secondary_count: usize,
    pub matched_topics: Vec<String>,
    /// `"{p}_stable"`, `"{p}_to_{s}"`, or `"none"` for the zero result.
    pub sentiment_shift: String,
    pub level: AmplificationLevel,
    pub details: AmplificationDetails,
}

impl AmplificationResult {
    /// Canonical "nothing to amplify" result.
    pub fn none() -> Self {
        Self {
            has_amplification: false,
            ratio: 0.0,
            primary_count: 0,
            secondary_count: 0,
            matched_topics: Vec::new(),
            sentiment_shift: "none".to_string(),
            level: AmplificationLevel::None,
            details: AmplificationDetails::default(),
        }
    }
}

/// One bucket of `track_over_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplificationTrendPoint {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub result: AmplificationResult,
}

#[derive(Debug, Clone, Copy)]
pub struct AmplificationDetector {
    window: Duration,
    topics: TopicMatching,
}

impl Default for AmplificationDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_HOURS)
    }
}

impl AmplificationDetector {
    pub fn new(window_hours: i64) -> Self {
        Self {
            window: Duration::hours(window_hours.max(0)),
            topics: TopicMatching::Raw,
        }
    }

    pub fn with_topic_matching(mut self, topics: TopicMatching) -> Self {
        self.topics = topics;
        self
    }

    pub fn window_hours(&self) -> i64 {
        self.window.num_hours()
    }

    pub fn detect(
        &self,
        primary: &[Article],
        secondary: &[Article],
        symbols: Option<&BTreeSet<String>>,
    ) -> AmplificationResult {
        self.detect_at(primary, secondary, symbols, Utc::now())
    }

    pub fn detect_at(
        &self,
        primary: &[Article],
        secondary: &[Article],
        symbols: Option<&BTreeSet<String>>,
        now: DateTime<Utc>,
    ) -> AmplificationResult {
        let cutoff = now - self.window;
        let keep = |a: &&Article| {
            symbols.map_or(true, |s| s.is_empty() || a.mentions_any(s)) && a.published_since(cutoff)
        };
        let primary: Vec<&Article> = primary.iter().filter(keep).collect();
        let secondary: Vec<&Article> = secondary.iter().filter(keep).collect();

        if primary.is_empty() {
            return AmplificationResult::none();
        }

        // classify on the exact ratio, report the rounded one
        let raw_ratio = secondary.len() as f64 / primary.len() as f64;
        let ratio = round2(raw_ratio);
        let matched_topics = self.common_topics(&primary, &secondary);
        let sentiment_shift = sentiment_shift(&primary, &secondary);
        let level = AmplificationLevel::classify(raw_ratio, matched_topics.len());
        let has_amplification = raw_ratio > 2.0 || matched_topics.len() > 2;

        debug!(
            target: "amplification",
            primary = primary.len(),
            secondary = secondary.len(),
            ratio,
            level = level.as_str(),
            topics = matched_topics.len(),
            "amplification evaluated"
        );

        AmplificationResult {
            has_amplification,
            ratio,
            primary_count: primary.len(),
            secondary_count: secondary.len(),
            matched_topics,
            sentiment_shift,
            level,
            details: AmplificationDetails {
                primary_sources: sources(&primary),
                secondary_sources: sources(&secondary),
                window_hours: self.window.num_seconds() as f64 / 3600.0,
            },
        }
    }

    /// Primary-title keywords found (as substrings) in any secondary title.
    /// Sorted, at most `MAX_MATCHED_TOPICS`.
    fn common_topics(&self, primary: &[&Article], secondary: &[&Article]) -> Vec<String> {
        let keywords: BTreeSet<String> = primary
            .iter()
            .flat_map(|a| {
                a.title()
                    .to_lowercase()
                    .split_whitespace()
                    .filter(|w| w.chars().count() > MIN_TOPIC_WORD_CHARS)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|w| self.topics == TopicMatching::Raw || !STOP_WORDS.contains(&w.as_str()))
            .collect();

        let titles: Vec<String> = secondary.iter().map(|a| a.title().to_lowercase()).collect();

        keywords
            .into_iter()
            .filter(|k| titles.iter().any(|t| t.contains(k.as_str())))
            .take(MAX_MATCHED_TOPICS)
            .collect()
    }

    /// Amplification for `symbol` in consecutive `interval_hours` buckets,
    /// newest first, walking back `TREND_BUCKETS` buckets from now.
    pub fn track_over_time(
        &self,
        symbol: &str,
        primary: &[Article],
        secondary: &[Article],
        interval_hours: i64,
    ) -> Vec<AmplificationTrendPoint> {
        self.track_over_time_at(symbol, primary, secondary, interval_hours, Utc::now())
    }

    pub fn track_over_time_at(
        &self,
        symbol: &str,
        primary: &[Article],
        secondary: &[Article],
        interval_hours: i64,
        now: DateTime<Utc>,
    ) -> Vec<AmplificationTrendPoint> {
        let interval = Duration::hours(interval_hours.max(1));
        let wanted: BTreeSet<String> = [symbol.to_ascii_uppercase()].into_iter().collect();

        let in_bucket = |a: &Article, start: DateTime<Utc>, end: DateTime<Utc>| {
            a.published_at().is_some_and(|ts| ts >= start && ts < end) && a.mentions_any(&wanted)
        };

        (0..TREND_BUCKETS)
            .map(|i| {
                let end = now - interval * (i as i32);
                let start = end - interval;
                let p: Vec<Article> = primary
                    .iter()
                    .filter(|a| in_bucket(a, start, end))
                    .cloned()
                    .collect();
                let s: Vec<Article> = secondary
                    .iter()
                    .filter(|a| in_bucket(a, start, end))
                    .cloned()
                    .collect();
                AmplificationTrendPoint {
                    start,
                    end,
                    result: self.detect_at(&p, &s, Some(&wanted), now),
                }
            })
            .collect()
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn mean_sentiment(articles: &[&Article]) -> f32 {
    if articles.is_empty() {
        return 0.0;
    }
    let sum: f32 = articles.iter().map(|a| a.sentiment_score()).sum();
    sum / articles.len() as f32
}

fn group_label(score: f32) -> &'static str {
    if score > SHIFT_POSITIVE {
        "positive"
    } else if score < SHIFT_NEGATIVE {
        "negative"
    } else {
        "neutral"
    }
}

fn sentiment_shift(primary: &[&Article], secondary: &[&Article]) -> String {
    let p = group_label(mean_sentiment(primary));
    let s = group_label(mean_sentiment(secondary));
    if p == s {
        format!("{p}_stable")
    } else {
        format!("{p}_to_{s}")
    }
}

fn sources(articles: &[&Article]) -> Vec<String> {
    articles
        .iter()
        .map(|a| a.source_name().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::SourceTier;

    fn art(tier: SourceTier, source: &str, title: &str, at: DateTime<Utc>) -> Article {
        Article::new(source, tier, title, "").with_published_at(at)
    }

    #[test]
    fn level_uses_unrounded_ratio() {
        let now = Utc::now();
        let primary: Vec<Article> = (0..250)
            .map(|i| art(SourceTier::Primary, "Reuters", &format!("p{i}"), now))
            .collect();
        let secondary: Vec<Article> = (0..501)
            .map(|i| art(SourceTier::Secondary, "CNN", &format!("s{i}"), now))
            .collect();

        let out = AmplificationDetector::default().detect_at(&primary, &secondary, None, now);
        assert_eq!(out.ratio, 2.0);
        assert!(out.matched_topics.is_empty());
        assert_eq!(out.level, AmplificationLevel::Medium);
        assert!(out.has_amplification);
    }

    #[test]
    fn topics_are_substring_matches_of_long_words() {
        let now = Utc::now();
        let p = vec![art(SourceTier::Primary, "Reuters", "Fed raises rates again", now)];
        let s = vec![art(SourceTier::Secondary, "CNN", "Why the federal rate raises matter", now)];
        let out = AmplificationDetector::default().detect_at(&p, &s, None, now);
        // "raises" matches, "rates" does not ("rate raises" lacks "rates"), "again" absent
        assert_eq!(out.matched_topics, vec!["raises".to_string()]);
        assert_eq!(out.ratio, 1.0);
        assert_eq!(out.level, AmplificationLevel::Low);
        assert!(!out.has_amplification);
    }

    #[test]
    fn stop_word_mode_drops_filler() {
        let now = Utc::now();
        let p = vec![art(SourceTier::Primary, "WSJ", "about chips over there", now)];
        let s = vec![art(SourceTier::Secondary, "Fox", "talk about chips over there", now)];
        let raw = AmplificationDetector::default().detect_at(&p, &s, None, now);
        assert_eq!(raw.matched_topics, vec!["about", "chips", "over", "there"]);
        let filtered = AmplificationDetector::default()
            .with_topic_matching(TopicMatching::SkipStopWords)
            .detect_at(&p, &s, None, now);
        assert_eq!(filtered.matched_topics, vec!["chips", "there"]);
    }

    #[test]
    fn topics_capped_at_five() {
        let now = Utc::now();
        let title = "alpha bravo charlie delta echoo foxtrot golfy";
        let p = vec![art(SourceTier::Primary, "WSJ", title, now)];
        let s = vec![art(SourceTier::Secondary, "Fox", title, now)];
        let out = AmplificationDetector::default().detect_at(&p, &s, None, now);
        assert_eq!(out.matched_topics.len(), MAX_MATCHED_TOPICS);
        // five topics alone: amplified but not viral
        assert!(out.has_amplification);
        assert_eq!(out.level, AmplificationLevel::Low);
    }

    #[test]
    fn sentiment_shift_labels() {
        let now = Utc::now();
        let p = vec![art(SourceTier::Primary, "Reuters", "x", now).with_sentiment(0.0)];
        let s = vec![
            art(SourceTier::Secondary, "CNN", "y", now).with_sentiment(-0.5),
            art(SourceTier::Secondary, "Fox", "z", now).with_sentiment(-0.1),
        ];
        let out = AmplificationDetector::default().detect_at(&p, &s, None, now);
        assert_eq!(out.sentiment_shift, "neutral_to_negative");

        let out = AmplificationDetector::default().detect_at(&p, &[], None, now);
        assert_eq!(out.sentiment_shift, "neutral_stable");
        assert_eq!(out.ratio, 0.0);
        assert_eq!(out.level, AmplificationLevel::Low);
    }

    #[test]
    fn old_and_undated_articles_are_outside_the_window() {
        let now = Utc::now();
        let p = vec![
            art(SourceTier::Primary, "Reuters", "a", now - Duration::hours(25)),
            Article::new("Reuters", SourceTier::Primary, "b", ""),
        ];
        let out = AmplificationDetector::default().detect_at(&p, &[], None, now);
        assert_eq!(out, AmplificationResult::none());
    }

    #[test]
    fn details_list_distinct_sources() {
        let now = Utc::now();
        let p = vec![
            art(SourceTier::Primary, "Reuters", "a", now),
            art(SourceTier::Primary, "Reuters", "b", now),
        ];
        let s = vec![art(SourceTier::Secondary, "CNN", "c", now)];
        let out = AmplificationDetector::new(6).detect_at(&p, &s, None, now);
        assert_eq!(out.details.primary_sources, vec!["Reuters".to_string()]);
        assert_eq!(out.details.secondary_sources, vec!["CNN".to_string()]);
        assert_eq!(out.details.window_hours, 6.0);
        assert_eq!(out.ratio, 0.5);
    }

    #[test]
    fn trend_buckets_walk_back_from_now() {
        let now = Utc::now();
        let tag = |a: Article| a.with_symbols(["AAPL"]);
        let p = vec![
            tag(art(SourceTier::Primary, "Reuters", "apple one", now - Duration::hours(1))),
            tag(art(SourceTier::Primary, "Reuters", "apple two", now - Duration::hours(7))),
        ];
        let s = vec![
            tag(art(SourceTier::Secondary, "CNN", "apple one", now - Duration::hours(2))),
            tag(art(SourceTier::Secondary, "Fox", "apple one", now - Duration::hours(3))),
            art(SourceTier::Secondary, "Fox", "untagged", now - Duration::hours(2)),
        ];
        let trend = AmplificationDetector::default().track_over_time_at("aapl", &p, &s, 6, now);
        assert_eq!(trend.len(), 4);
        assert_eq!(trend[0].end, now);
        assert_eq!(trend[0].start, now - Duration::hours(6));
        assert_eq!(trend[0].result.primary_count, 1);
        assert_eq!(trend[0].result.secondary_count, 2);
        assert_eq!(trend[1].result.primary_count, 1);
        assert_eq!(trend[1].result.secondary_count, 0);
        assert_eq!(trend[2].result, AmplificationResult::none());
    }
}
