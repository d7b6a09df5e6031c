//! # News Pipeline
//! One batch run: collect both tiers → analyze every article → amplification
//! across tiers → optional persistence → stats.
//!
//! Nothing inside a run is fatal. Provider failures shrink a tier, analysis
//! failures skip an article, store failures skip a save; all are logged and
//! counted.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::amplification::{AmplificationDetector, AmplificationResult};
use crate::analyze::ai_adapter::{DynRelevanceAnalyzer, RelevanceAnalysis, DEFAULT_MIN_RELEVANCE_SCORE};
use crate::analyze::ner::{CorporateSuffixRecognizer, SymbolExtractor};
use crate::analyze::policy::{PolicyDetector, PolicySignal};
use crate::analyze::scoring::{priority_score, PriorityScore, HIGH_PRIORITY_THRESHOLD};
use crate::article::Article;
use crate::config::ai::AiConfig;
use crate::config::PipelineConfig;
use crate::ingest::{self, types::SourceProvider};
use crate::sentiment::{SentimentResult, SentimentScorer};
use crate::store::{ArticleStore, JsonlStore};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Completed pipeline runs.");
        describe_counter!("pipeline_analyzed_total", "Articles analyzed.");
        describe_counter!("pipeline_failed_total", "Articles that failed analysis.");
        describe_counter!("pipeline_saved_total", "Analyzed articles persisted.");
        describe_counter!("pipeline_high_priority_total", "Articles at or above the high-priority threshold.");
        describe_counter!("pipeline_policy_signals_total", "Articles carrying a policy change.");
        describe_gauge!("pipeline_amplification_ratio", "Secondary/primary ratio of the last run.");
        describe_histogram!("pipeline_run_seconds", "Pipeline run duration in seconds.");
    });
}

/// An article plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedArticle {
    pub article: Article,
    /// Extracted symbols merged with feed-supplied ones.
    pub symbols: BTreeSet<String>,
    pub sentiment: SentimentResult,
    pub policy: PolicySignal,
    pub priority: PriorityScore,
    pub relevance: Option<RelevanceAnalysis>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalyzedArticle {
    /// The article as the amplification detector should see it: merged symbols,
    /// and computed sentiment unless the feed supplied one.
    pub fn amplification_view(&self) -> Article {
        let a = self.article.clone().with_symbols(self.symbols.iter().cloned());
        if a.metadata().contains_key("sentiment_score") {
            a
        } else {
            a.with_sentiment(self.sentiment.score)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_articles: usize,
    pub primary_count: usize,
    pub secondary_count: usize,
    pub analyzed_count: usize,
    pub failed_count: usize,
    pub saved_count: usize,
    pub high_priority_count: usize,
    pub policy_signal_count: usize,
    pub amplification_detected: bool,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingSymbol {
    pub symbol: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub primary: Vec<Article>,
    pub secondary: Vec<Article>,
    pub analyzed: Vec<AnalyzedArticle>,
    pub amplification: AmplificationResult,
    pub trending_symbols: Vec<TrendingSymbol>,
    pub stats: PipelineStats,
}

pub struct NewsPipeline {
    primary: Vec<Box<dyn SourceProvider>>,
    secondary: Vec<Box<dyn SourceProvider>>,
    extractor: SymbolExtractor,
    sentiment: SentimentScorer,
    policy: PolicyDetector,
    amplification: AmplificationDetector,
    relevance: Option<DynRelevanceAnalyzer>,
    min_relevance_score: u8,
    store: Option<Arc<dyn ArticleStore>>,
}

impl NewsPipeline {
    /// Built-in registry, lexicon sentiment, 24 h window, no collaborators.
    pub fn new(
        primary: Vec<Box<dyn SourceProvider>>,
        secondary: Vec<Box<dyn SourceProvider>>,
    ) -> Self {
        Self {
            primary,
            secondary,
            extractor: SymbolExtractor::default(),
            sentiment: SentimentScorer::lexicon_only(),
            policy: PolicyDetector::new(),
            amplification: AmplificationDetector::default(),
            relevance: None,
            min_relevance_score: DEFAULT_MIN_RELEVANCE_SCORE,
            store: None,
        }
    }

    /// Wire everything the config files describe.
    pub fn from_config(
        cfg: &PipelineConfig,
        ai: &AiConfig,
        primary: Vec<Box<dyn SourceProvider>>,
        secondary: Vec<Box<dyn SourceProvider>>,
    ) -> anyhow::Result<Self> {
        let mut extractor = SymbolExtractor::new(cfg.symbol_registry());
        if cfg.pipeline.recognize_organizations {
            extractor = extractor.with_recognizer(Arc::new(CorporateSuffixRecognizer));
        }
        let amplification = AmplificationDetector::new(cfg.pipeline.window_hours)
            .with_topic_matching(cfg.pipeline.topic_matching);

        let mut p = Self::new(primary, secondary)
            .with_extractor(extractor)
            .with_sentiment(ai.build_sentiment_scorer()?)
            .with_amplification(amplification);
        if let Some(analyzer) = ai.build_relevance_analyzer()? {
            p = p.with_relevance(analyzer, cfg.pipeline.min_relevance_score);
        }
        if let Some(path) = &cfg.store.path {
            p = p.with_store(Arc::new(JsonlStore::new(path)));
        }
        Ok(p)
    }

    pub fn with_extractor(mut self, extractor: SymbolExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_sentiment(mut self, sentiment: SentimentScorer) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_amplification(mut self, detector: AmplificationDetector) -> Self {
        self.amplification = detector;
        self
    }

    pub fn with_relevance(mut self, analyzer: DynRelevanceAnalyzer, min_score: u8) -> Self {
        self.relevance = Some(analyzer);
        self.min_relevance_score = min_score.min(100);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ArticleStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn amplification_detector(&self) -> &AmplificationDetector {
        &self.amplification
    }

    /// Derive symbols, sentiment, policy, priority and (optionally) relevance.
    /// Fails only for an article with no text.
    pub async fn analyze_article(&self, article: &Article) -> anyhow::Result<AnalyzedArticle> {
        let text = article.text();
        if text.trim().is_empty() {
            anyhow::bail!("article {} has no text", article.id());
        }

        let mut symbols = self.extractor.extract_symbols(&text);
        symbols.extend(article.symbols().iter().cloned());

        let sentiment = self.sentiment.score(&text).await;
        let policy = self.policy.detect(&text);
        let priority = priority_score(&sentiment, &policy, symbols.len());
        let relevance = self.relevance_for(article, &symbols).await;

        Ok(AnalyzedArticle {
            article: article.clone(),
            symbols,
            sentiment,
            policy,
            priority,
            relevance,
            analyzed_at: Utc::now(),
        })
    }

    async fn relevance_for(
        &self,
        article: &Article,
        symbols: &BTreeSet<String>,
    ) -> Option<RelevanceAnalysis> {
        let analyzer = self.relevance.as_ref()?;
        let known: Vec<String> = symbols.iter().cloned().collect();
        match analyzer.analyze(article.title(), article.body(), &known).await {
            Ok(r) => {
                if !r.meets(self.min_relevance_score) {
                    debug!(
                        target: "pipeline",
                        id = article.id(),
                        score = r.relevance_score,
                        min = self.min_relevance_score,
                        "below_threshold"
                    );
                }
                Some(r)
            }
            Err(e) => {
                warn!(target: "pipeline", id = article.id(), analyzer = analyzer.name(), error = %e, "relevance unavailable");
                None
            }
        }
    }

    /// One slot per input article; `None` where analysis failed.
    async fn analyze_tier(&self, tier: &[Article], failed: &mut usize) -> Vec<Option<AnalyzedArticle>> {
        let mut out = Vec::with_capacity(tier.len());
        for article in tier {
            match self.analyze_article(article).await {
                Ok(a) => out.push(Some(a)),
                Err(e) => {
                    *failed += 1;
                    warn!(target: "pipeline", id = article.id(), source = article.source_name(), error = %e, "analysis failed; skipping");
                    out.push(None);
                }
            }
        }
        out
    }

    pub async fn run(&self, save: bool) -> PipelineReport {
        self.run_at(save, Utc::now()).await
    }

    /// `now` anchors the amplification window.
    pub async fn run_at(&self, save: bool, now: DateTime<Utc>) -> PipelineReport {
        ensure_metrics_described();
        let t0 = Instant::now();

        // 1-2) collect tiers
        let primary = ingest::collect(&self.primary).await;
        let secondary = ingest::collect(&self.secondary).await;
        info!(target: "pipeline", primary = primary.len(), secondary = secondary.len(), "tiers collected");

        // 3) analyze each tier, results aligned with their articles
        let mut failed = 0usize;
        let primary_done = self.analyze_tier(&primary, &mut failed).await;
        let secondary_done = self.analyze_tier(&secondary, &mut failed).await;

        // 4) amplification over both tiers
        let view = |tier: &[Article], done: &[Option<AnalyzedArticle>]| -> Vec<Article> {
            tier.iter()
                .zip(done)
                .map(|(a, d)| match d {
                    Some(done) => done.amplification_view(),
                    None => a.clone(),
                })
                .collect()
        };
        let amplification = self.amplification.detect_at(
            &view(&primary, &primary_done),
            &view(&secondary, &secondary_done),
            None,
            now,
        );
        let analyzed: Vec<AnalyzedArticle> = primary_done
            .into_iter()
            .chain(secondary_done)
            .flatten()
            .collect();

        // 5) persistence
        let saved = if save {
            self.persist(&analyzed).await
        } else {
            0
        };

        // 6) stats
        let high_priority_count = analyzed.iter().filter(|a| a.priority.is_high_priority()).count();
        let policy_signal_count = analyzed.iter().filter(|a| a.policy.has_change).count();
        let stats = PipelineStats {
            total_articles: primary.len() + secondary.len(),
            primary_count: primary.len(),
            secondary_count: secondary.len(),
            analyzed_count: analyzed.len(),
            failed_count: failed,
            saved_count: saved,
            high_priority_count,
            policy_signal_count,
            amplification_detected: amplification.has_amplification,
            duration_seconds: t0.elapsed().as_secs_f64(),
        };
        let trending_symbols = trending_symbols(&analyzed);

        counter!("pipeline_runs_total").increment(1);
        counter!("pipeline_analyzed_total").increment(stats.analyzed_count as u64);
        counter!("pipeline_failed_total").increment(stats.failed_count as u64);
        counter!("pipeline_saved_total").increment(stats.saved_count as u64);
        counter!("pipeline_high_priority_total").increment(stats.high_priority_count as u64);
        counter!("pipeline_policy_signals_total").increment(stats.policy_signal_count as u64);
        gauge!("pipeline_amplification_ratio").set(amplification.ratio);
        histogram!("pipeline_run_seconds").record(stats.duration_seconds);

        info!(
            target: "pipeline",
            total = stats.total_articles,
            analyzed = stats.analyzed_count,
            failed = stats.failed_count,
            saved = stats.saved_count,
            high_priority = stats.high_priority_count,
            policy_signals = stats.policy_signal_count,
            amplification = stats.amplification_detected,
            ratio = amplification.ratio,
            level = amplification.level.as_str(),
            secs = stats.duration_seconds,
            "pipeline run complete"
        );

        PipelineReport {
            primary,
            secondary,
            analyzed,
            amplification,
            trending_symbols,
            stats,
        }
    }

    /// Save new articles; URLs the store already has are skipped.
    async fn persist(&self, analyzed: &[AnalyzedArticle]) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let mut saved = 0usize;
        for a in analyzed {
            if let Some(url) = a.article.url() {
                match store.contains_url(url).await {
                    Ok(true) => {
                        debug!(target: "pipeline", %url, "already stored");
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(target: "pipeline", %url, error = ?e, "store lookup failed; skipping");
                        continue;
                    }
                }
            }
            match store.insert(a).await {
                Ok(()) => saved += 1,
                Err(e) => warn!(target: "pipeline", id = a.article.id(), error = ?e, "store insert failed"),
            }
        }
        saved
    }
}

/// Symbol counts over high-priority articles, most mentioned first.
pub fn trending_symbols(analyzed: &[AnalyzedArticle]) -> Vec<TrendingSymbol> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for a in analyzed
        .iter()
        .filter(|a| a.priority.value >= HIGH_PRIORITY_THRESHOLD)
    {
        for s in &a.symbols {
            *counts.entry(s.as_str()).or_default() += 1;
        }
    }
    let mut out: Vec<TrendingSymbol> = counts
        .into_iter()
        .map(|(symbol, count)| TrendingSymbol {
            symbol: symbol.to_string(),
            count,
        })
        .collect();
    // stable sort keeps ticker order among equal counts
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}
