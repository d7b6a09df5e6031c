//! Sentiment scoring for news text.
//!
//! Two strategies, tried in a fixed order:
//! 1. an optional finance-tuned classifier (`SentimentModel`), used only for
//!    texts of at least `MODEL_MIN_CHARS` characters;
//! 2. the embedded lexicon (`LexiconScorer`), which always succeeds.
//!
//! A model error falls back to the lexicon. The executed strategy is reported
//! in `SentimentResult::strategy` and logged at debug level.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

static LEXICON: Lazy<HashMap<String, f32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f32>>(raw).expect("valid sentiment lexicon")
});

/// Label thresholds on the compound score (inclusive).
pub const POSITIVE_THRESHOLD: f32 = 0.05;
pub const NEGATIVE_THRESHOLD: f32 = -0.05;

/// Texts shorter than this never reach the model.
pub const MODEL_MIN_CHARS: usize = 100;

/// Normalization constant of the compound score: s / sqrt(s^2 + ALPHA).
const ALPHA: f32 = 15.0;
/// A negated valence flips and loses a quarter of its weight.
const NEGATION_SCALAR: f32 = -0.74;
const BOOSTER_INCR: f32 = 0.293;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Lexicon,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    /// Signed score in [-1, 1].
    pub score: f32,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub strategy: Strategy,
}

impl SentimentResult {
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            confidence: 0.0,
            strategy: Strategy::Lexicon,
        }
    }
}

/// Map a compound score to its label (boundaries at ±0.05 are inclusive).
pub fn label_for_score(score: f32) -> SentimentLabel {
    if score >= POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if score <= NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/* ----------------------------
Lexicon strategy
---------------------------- */

#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> f32 {
        *LEXICON.get(w).unwrap_or(&0.0)
    }

    /// Compound polarity in [-1, 1], rounded to 4 decimals.
    ///
    /// Negation: a negator in the previous 1..=3 tokens flips and damps the
    /// word's valence. A booster right before a valenced word pushes it
    /// further from zero.
    pub fn compound(&self, text: &str) -> f32 {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut sum = 0.0f32;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0.0 {
                continue;
            }

            let mut v = base;
            if i >= 1 && is_booster(tokens[i - 1].as_str()) {
                v += BOOSTER_INCR * base.signum();
            }

            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            if negated {
                v *= NEGATION_SCALAR;
            }
            sum += v;
        }

        normalize_compound(sum)
    }

    pub fn score(&self, text: &str) -> SentimentResult {
        let score = self.compound(text);
        SentimentResult {
            label: label_for_score(score),
            score,
            confidence: score.abs(),
            strategy: Strategy::Lexicon,
        }
    }
}

fn normalize_compound(sum: f32) -> f32 {
    if sum == 0.0 {
        return 0.0;
    }
    let c = (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0);
    (c * 10_000.0).round() / 10_000.0
}

/// Lower-cased alphanumeric tokens; apostrophes stay inside words ("isn't").
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|t| t.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
            | "nor"
    )
}

fn is_booster(tok: &str) -> bool {
    matches!(
        tok,
        "very"
            | "extremely"
            | "highly"
            | "sharply"
            | "significantly"
            | "hugely"
            | "strongly"
            | "deeply"
            | "massive"
            | "huge"
    )
}

/* ----------------------------
Model strategy
---------------------------- */

/// Three-way class probabilities (softmax output).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbs {
    pub negative: f32,
    pub neutral: f32,
    pub positive: f32,
}

impl ClassProbs {
    pub fn into_result(self) -> SentimentResult {
        let max = self.negative.max(self.neutral).max(self.positive);
        let label = if max == self.positive {
            SentimentLabel::Positive
        } else if max == self.negative {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        SentimentResult {
            label,
            score: (self.positive - self.negative).clamp(-1.0, 1.0),
            confidence: max.clamp(0.0, 1.0),
            strategy: Strategy::Model,
        }
    }
}

/// Higher-fidelity classifier (e.g. FinBERT). Implementations may do I/O.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassProbs>;
    fn name(&self) -> &'static str;
}

/// FinBERT behind a hosted inference endpoint
/// (`POST {endpoint}` with `{"inputs": text}`).
pub struct HostedFinbert {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// Roughly the 512-token window of the model.
const MODEL_MAX_CHARS: usize = 2000;

impl HostedFinbert {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("news-signal-analyzer/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building finbert http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// Collect label/score pairs into class probabilities. All three labels must be present.
fn probs_from_labels(items: &[LabelScore]) -> Result<ClassProbs> {
    let mut neg = None;
    let mut neu = None;
    let mut pos = None;
    for it in items {
        match it.label.to_ascii_lowercase().as_str() {
            "negative" => neg = Some(it.score),
            "neutral" => neu = Some(it.score),
            "positive" => pos = Some(it.score),
            _ => {}
        }
    }
    match (neg, neu, pos) {
        (Some(negative), Some(neutral), Some(positive)) => Ok(ClassProbs {
            negative,
            neutral,
            positive,
        }),
        _ => Err(anyhow!("model response lacks one of negative/neutral/positive")),
    }
}

#[async_trait]
impl SentimentModel for HostedFinbert {
    async fn classify(&self, text: &str) -> Result<ClassProbs> {
        let input: String = text.chars().take(MODEL_MAX_CHARS).collect();
        let mut req = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": input }));
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let resp = req.send().await.context("finbert request")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("finbert returned status {status}"));
        }
        let body: InferenceResponse = resp.json().await.context("decoding finbert response")?;
        match body {
            InferenceResponse::Nested(v) => {
                let first = v.first().ok_or_else(|| anyhow!("empty finbert response"))?;
                probs_from_labels(first)
            }
            InferenceResponse::Flat(v) => probs_from_labels(&v),
        }
    }

    fn name(&self) -> &'static str {
        "finbert"
    }
}

/* ----------------------------
Strategy selection
---------------------------- */

#[derive(Clone, Default)]
pub struct SentimentScorer {
    lexicon: LexiconScorer,
    model: Option<Arc<dyn SentimentModel>>,
}

impl SentimentScorer {
    pub fn lexicon_only() -> Self {
        Self::default()
    }

    pub fn with_model(model: Arc<dyn SentimentModel>) -> Self {
        Self {
            lexicon: LexiconScorer::new(),
            model: Some(model),
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Fast path only. Pure: identical text gives identical output.
    pub fn score_lexicon(&self, text: &str) -> SentimentResult {
        self.lexicon.score(text)
    }

    /// Model for long texts when configured, lexicon otherwise or on model failure.
    pub async fn score(&self, text: &str) -> SentimentResult {
        if let Some(model) = &self.model {
            if text.chars().count() >= MODEL_MIN_CHARS {
                match model.classify(text).await {
                    Ok(probs) => {
                        let out = probs.into_result();
                        debug!(target: "sentiment", strategy = "model", model = model.name(), score = out.score);
                        return out;
                    }
                    Err(e) => {
                        warn!(target: "sentiment", model = model.name(), error = %e, "model failed; using lexicon");
                    }
                }
            }
        }
        let out = self.lexicon.score(text);
        debug!(target: "sentiment", strategy = "lexicon", score = out.score);
        out
    }
}
