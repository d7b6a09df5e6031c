// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
use news_signal_analyzer::ingest::providers::{JsonFeedProvider, RssProvider};
use news_signal_analyzer::ingest::types::SourceProvider;
use news_signal_analyzer::metrics::Metrics;
use news_signal_analyzer::{NewsPipeline, SourceTier};

#[tokio::test]
async fn metrics_exposed_after_run() {
    // Install a process-wide recorder for this test binary
    let m = Metrics::init(None).expect("recorder");

    let xml = std::fs::read_to_string("tests/fixtures/reuters_rss.xml").expect("fixture");
    // wire_feed.json carries one item with an unparseable date
    let primary: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(RssProvider::from_fixture("Reuters", SourceTier::Primary, &xml)),
        Box::new(JsonFeedProvider::from_fixture(
            "Bloomberg",
            SourceTier::Primary,
            include_str!("fixtures/wire_feed.json"),
        )),
    ];
    let broken: Vec<Box<dyn SourceProvider>> = vec![Box::new(RssProvider::from_fixture(
        "Broken",
        SourceTier::Secondary,
        "<rss>",
    ))];
    let _ = NewsPipeline::new(primary, broken).run(false).await;

    // Scrape metrics text and check series presence by substring
    let out = m.render();
    for needle in [
        "ingest_articles_total",
        "ingest_kept_total",
        "ingest_provider_errors_total",
        "ingest_parse_ms",
        "pipeline_runs_total",
        "pipeline_analyzed_total",
        "pipeline_run_seconds",
        "build_info",
    ] {
        assert!(out.contains(needle), "exposition missing '{needle}'\n{out}");
    }

    // every ingest series carries a description
    for described in [
        "# HELP ingest_item_errors_total",
        "# HELP ingest_provider_errors_total",
        "# HELP ingest_kept_total",
    ] {
        assert!(out.contains(described), "exposition missing '{described}'\n{out}");
    }
}
