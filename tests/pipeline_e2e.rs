// tests/pipeline_e2e.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use news_signal_analyzer::analyze::ai_adapter::{
    Importance, PriceImpact, RelevanceAnalysis, RelevanceAnalyzer,
};
use news_signal_analyzer::ingest::providers::{JsonFeedProvider, RssProvider};
use news_signal_analyzer::ingest::types::SourceProvider;
use news_signal_analyzer::store::{ArticleStore, JsonlStore, StoreQuery};
use news_signal_analyzer::{Article, NewsPipeline, SourceTier};
use std::sync::Arc;

/// Scores Fed stories 80, refuses everything else.
struct FedOnlyAnalyzer;

#[async_trait]
impl RelevanceAnalyzer for FedOnlyAnalyzer {
    async fn analyze(&self, title: &str, _: &str, symbols: &[String]) -> Result<RelevanceAnalysis> {
        if !title.contains("Fed") {
            bail!("not relevant enough to ask");
        }
        Ok(RelevanceAnalysis {
            relevance_score: 80,
            affected_symbols: symbols.to_vec(),
            price_impact: PriceImpact::Down,
            importance: Importance::High,
            reasoning: "Rate decision".into(),
            key_points: vec![],
        })
    }

    fn name(&self) -> &'static str {
        "fed-only"
    }
}

struct DownProvider;

#[async_trait]
impl SourceProvider for DownProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        bail!("connection refused")
    }
    fn name(&self) -> &str {
        "Down"
    }
    fn tier(&self) -> SourceTier {
        SourceTier::Secondary
    }
}

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-09-18T20:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn build(store: Arc<JsonlStore>) -> NewsPipeline {
    let primary: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(RssProvider::from_fixture(
            "Reuters",
            SourceTier::Primary,
            include_str!("fixtures/reuters_rss.xml"),
        )),
        Box::new(JsonFeedProvider::from_fixture(
            "Bloomberg",
            SourceTier::Primary,
            include_str!("fixtures/wire_feed.json"),
        )),
    ];
    let secondary: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(RssProvider::from_fixture(
            "CNN",
            SourceTier::Secondary,
            include_str!("fixtures/cnn_rss.xml"),
        )),
        Box::new(DownProvider),
    ];
    NewsPipeline::new(primary, secondary)
        .with_relevance(Arc::new(FedOnlyAnalyzer), 70)
        .with_store(store)
}

#[tokio::test]
async fn full_run_collects_analyzes_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path().join("nested/analyzed.jsonl")));
    let pipeline = build(store.clone());

    let report = pipeline.run_at(true, now()).await;
    let s = &report.stats;
    assert_eq!(s.primary_count, 4);
    assert_eq!(s.secondary_count, 2);
    assert_eq!(s.total_articles, 6);
    assert_eq!(s.analyzed_count, 6);
    assert_eq!(s.failed_count, 0);
    assert_eq!(s.saved_count, 6);
    assert_eq!(s.policy_signal_count, 2);
    assert!(s.high_priority_count >= 2);
    assert!(s.duration_seconds >= 0.0);

    let amp = &report.amplification;
    assert_eq!(amp.primary_count, 4);
    assert_eq!(amp.secondary_count, 2);
    assert_eq!(amp.ratio, 0.5);
    assert_eq!(amp.matched_topics, vec!["raises", "rates"]);
    assert!(!s.amplification_detected);

    assert!(report.trending_symbols.iter().any(|t| t.symbol == "COIN"));

    let with_relevance = report.analyzed.iter().filter(|a| a.relevance.is_some()).count();
    assert_eq!(with_relevance, 3);

    // feed symbol COIN plus extracted RIOT on the SEC story
    let sec = report
        .analyzed
        .iter()
        .find(|a| a.article.source_name() == "Bloomberg" && a.policy.has_change)
        .unwrap();
    assert!(sec.symbols.contains("COIN"));
    assert!(sec.symbols.contains("RIOT"));

    // second run: everything with a url is already stored
    let again = pipeline.run_at(true, now()).await;
    assert_eq!(again.stats.saved_count, 1);

    let coin = store
        .query(&StoreQuery {
            symbol: Some("coin".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(coin.len(), 1);

    let relevant = store
        .query(&StoreQuery {
            min_relevance: Some(80),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(relevant.len(), 3);
    assert!(store
        .contains_url("https://www.cnn.com/2024/09/18/investing/stocks-fed")
        .await
        .unwrap());
}

#[tokio::test]
async fn dry_run_saves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path().join("analyzed.jsonl")));
    let report = build(store.clone()).run_at(false, now()).await;
    assert_eq!(report.stats.saved_count, 0);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn narrow_window_drops_old_stories() {
    use news_signal_analyzer::AmplificationDetector;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path().join("analyzed.jsonl")));
    let pipeline = build(store).with_amplification(AmplificationDetector::new(2));

    // 18:00-20:00 keeps Reuters 18:05 and both CNN stories
    let report = pipeline.run_at(false, now()).await;
    assert_eq!(report.amplification.primary_count, 1);
    assert_eq!(report.amplification.secondary_count, 2);
    assert_eq!(report.amplification.ratio, 2.0);
    assert_eq!(report.amplification.details.window_hours, 2.0);
}

#[tokio::test]
async fn repeated_titles_keep_their_own_source_and_tier() {
    // no urls, so every copy hashes to the same id
    let primary: Vec<Box<dyn SourceProvider>> = vec![Box::new(JsonFeedProvider::from_fixture(
        "wire",
        SourceTier::Primary,
        r#"[{"title": "Fed raises rates", "source": "Reuters",
             "published_at": "2024-09-18T19:00:00", "metadata": {"sentiment_score": 0.6}}]"#,
    ))];
    let secondary: Vec<Box<dyn SourceProvider>> = vec![Box::new(JsonFeedProvider::from_fixture(
        "outlets",
        SourceTier::Secondary,
        r#"[
          {"title": "Fed raises rates", "source": "CNN",
           "published_at": "2024-09-18T19:10:00", "metadata": {"sentiment_score": -0.6}},
          {"title": "Fed raises rates", "source": "Fox News",
           "published_at": "2024-09-18T19:20:00", "metadata": {"sentiment_score": -0.6}},
          {"title": "Fed raises rates", "source": "CNN",
           "published_at": "2024-09-18T19:30:00", "metadata": {"sentiment_score": -0.6}}
        ]"#,
    ))];

    let report = NewsPipeline::new(primary, secondary).run_at(false, now()).await;
    assert_eq!(report.stats.analyzed_count, 4);

    let amp = &report.amplification;
    assert_eq!(amp.primary_count, 1);
    assert_eq!(amp.secondary_count, 3);
    assert_eq!(amp.ratio, 3.0);
    assert_eq!(amp.details.primary_sources, vec!["Reuters"]);
    assert_eq!(amp.details.secondary_sources, vec!["CNN", "Fox News"]);
    assert_eq!(amp.sentiment_shift, "positive_to_negative");

    let tiers: Vec<(SourceTier, &str)> = report
        .analyzed
        .iter()
        .map(|a| (a.article.tier(), a.article.source_name()))
        .collect();
    assert_eq!(
        tiers,
        vec![
            (SourceTier::Primary, "Reuters"),
            (SourceTier::Secondary, "CNN"),
            (SourceTier::Secondary, "Fox News"),
            (SourceTier::Secondary, "CNN"),
        ]
    );
}
