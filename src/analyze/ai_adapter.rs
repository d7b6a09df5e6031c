//! LLM relevance analyzer: provider abstraction + Claude client.
//!
//! The analyzer asks a model how useful a story is to stock investors and
//! parses its JSON reply into a `RelevanceAnalysis`. Callers treat any error as
//! "no relevance available".

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stories scoring below this are kept but logged as below threshold.
pub const DEFAULT_MIN_RELEVANCE_SCORE: u8 = 70;

/// Article content is cut to this many characters before prompting.
const PROMPT_CONTENT_CHARS: usize = 2000;
const MAX_AFFECTED_SYMBOLS: usize = 5;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceImpact {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceAnalysis {
    /// 0–100.
    pub relevance_score: u8,
    pub affected_symbols: Vec<String>,
    pub price_impact: PriceImpact,
    pub importance: Importance,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl RelevanceAnalysis {
    pub fn meets(&self, min_score: u8) -> bool {
        self.relevance_score >= min_score
    }
}

#[async_trait]
pub trait RelevanceAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        title: &str,
        content: &str,
        symbols: &[String],
    ) -> Result<RelevanceAnalysis>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

pub type DynRelevanceAnalyzer = Arc<dyn RelevanceAnalyzer>;

/// Always errors; used when the collaborator is switched off.
pub struct DisabledAnalyzer;

#[async_trait]
impl RelevanceAnalyzer for DisabledAnalyzer {
    async fn analyze(&self, _: &str, _: &str, _: &[String]) -> Result<RelevanceAnalysis> {
        bail!("relevance analyzer disabled")
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Claude via the Anthropic Messages API.
pub struct ClaudeRelevanceAnalyzer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl ClaudeRelevanceAnalyzer {
    /// `model_override`: defaults to a current Sonnet alias.
    pub fn new(api_key: impl Into<String>, model_override: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("news-signal-analyzer/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building anthropic http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
            endpoint: ANTHROPIC_URL.to_string(),
        })
    }

    /// Point at a different base URL (proxies, local stubs).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl RelevanceAnalyzer for ClaudeRelevanceAnalyzer {
    async fn analyze(
        &self,
        title: &str,
        content: &str,
        symbols: &[String],
    ) -> Result<RelevanceAnalysis> {
        if self.api_key.is_empty() {
            bail!("missing anthropic api key");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: String,
        }

        let prompt = build_prompt(title, content, symbols);
        let req = Req {
            model: &self.model,
            max_tokens: 1024,
            temperature: 0.0,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .context("anthropic request")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("anthropic returned status {status}");
        }
        let body: Resp = resp.json().await.context("decoding anthropic response")?;
        let text: String = body.content.into_iter().map(|b| b.text).collect();
        parse_analysis(&text)
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}

/// Analyst prompt asking for the JSON shape `parse_analysis` reads.
pub fn build_prompt(title: &str, content: &str, symbols: &[String]) -> String {
    let content: String = content.chars().take(PROMPT_CONTENT_CHARS).collect();
    let known = if symbols.is_empty() {
        "none".to_string()
    } else {
        symbols.join(", ")
    };
    format!(
        r#"You are a US equity market analyst. Rate how useful the following news is to stock investors.

Title: {title}

Content:
{content}

Symbols already extracted: {known}

Return JSON only, with these fields:
1. relevance_score (0-100)
   - 0-30: unrelated (general news, politics, sports)
   - 31-60: indirectly related (macro economy, industry trends)
   - 61-80: directly related (a specific company or sector)
   - 81-100: critical (earnings, M&A, regulatory change, major events)
2. affected_symbols: tickers affected, at most 5, only companies actually mentioned
3. price_impact: "up" | "down" | "neutral"
4. importance: "high" (immediate price impact) | "medium" (mid-term) | "low" (long-term or indirect)
5. reasoning: 2-3 sentences
6. key_points: 3-5 short bullet strings

Example:
{{
  "relevance_score": 85,
  "affected_symbols": ["AAPL", "MSFT"],
  "price_impact": "up",
  "importance": "high",
  "reasoning": "...",
  "key_points": ["...", "...", "..."]
}}"#
    )
}

/// Parse the span from the first `{` to the last `}` of a model reply.
pub fn parse_analysis(reply: &str) -> Result<RelevanceAnalysis> {
    let start = reply.find('{').ok_or_else(|| anyhow!("no JSON object in reply"))?;
    let end = reply.rfind('}').ok_or_else(|| anyhow!("no JSON object in reply"))?;
    if end < start {
        bail!("no JSON object in reply");
    }
    let value: Value =
        serde_json::from_str(&reply[start..=end]).context("parsing relevance JSON")?;

    for field in ["relevance_score", "affected_symbols", "price_impact", "importance"] {
        if value.get(field).is_none() {
            bail!("relevance reply missing `{field}`");
        }
    }

    let score = value["relevance_score"]
        .as_f64()
        .or_else(|| value["relevance_score"].as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| anyhow!("relevance_score is not a number"))?;

    let affected_symbols = value["affected_symbols"]
        .as_array()
        .ok_or_else(|| anyhow!("affected_symbols is not a list"))?
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .take(MAX_AFFECTED_SYMBOLS)
        .collect();

    let price_impact: PriceImpact = serde_json::from_value(lowercased(&value["price_impact"]))
        .context("price_impact must be up/down/neutral")?;
    let importance: Importance = serde_json::from_value(lowercased(&value["importance"]))
        .context("importance must be high/medium/low")?;

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let key_points = value
        .get("key_points")
        .and_then(Value::as_array)
        .map(|v| {
            v.iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(RelevanceAnalysis {
        relevance_score: score.round().clamp(0.0, 100.0) as u8,
        affected_symbols,
        price_impact,
        importance,
        reasoning,
        key_points,
    })
}

fn lowercased(v: &Value) -> Value {
    match v.as_str() {
        Some(s) => Value::String(s.trim().to_lowercase()),
        None => v.clone(),
    }
}
