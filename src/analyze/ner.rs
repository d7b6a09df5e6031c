// src/analyze/ner.rs
//! Ticker extraction against an explicitly owned symbol registry.
//!
//! Three passes, unioned and sorted:
//! 1. explicit sigils (`$AAPL`, `NASDAQ:AAPL`, `(AAPL)`) validated against the registry,
//! 2. company names matched on word boundaries over the lower-cased text,
//! 3. an optional organization recognizer whose hits are mapped back to the registry.
//!
//! The extractor never returns a ticker the registry does not know.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

static RE_CASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Z]{1,5})\b").expect("cashtag regex"));
static RE_EXCHANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:NASDAQ|NYSE|AMEX):([A-Z]{1,5})\b").expect("exchange regex")
});
static RE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([A-Z]{1,5})\)").expect("paren regex"));

/// One registry entry, also the shape of `[[symbols]]` in the pipeline config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub ticker: String,
    pub company: String,
}

/// Ticker → company dictionary plus its compiled name patterns.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    by_ticker: BTreeMap<String, String>,
    // lower-cased company name → (ticker, `\bname\b` pattern)
    by_company: BTreeMap<String, (String, Regex)>,
}

impl SymbolRegistry {
    pub fn empty() -> Self {
        Self {
            by_ticker: BTreeMap::new(),
            by_company: BTreeMap::new(),
        }
    }

    /// Tickers tracked by the site out of the box.
    pub fn default_seed() -> Self {
        let mut reg = Self::empty();
        for (t, c) in [
            // Tech
            ("AAPL", "Apple"),
            ("MSFT", "Microsoft"),
            ("GOOGL", "Google"),
            ("AMZN", "Amazon"),
            ("META", "Meta"),
            ("TSLA", "Tesla"),
            ("NVDA", "NVIDIA"),
            ("AMD", "AMD"),
            ("INTC", "Intel"),
            ("NFLX", "Netflix"),
            ("UBER", "Uber"),
            ("LYFT", "Lyft"),
            // Finance
            ("JPM", "JPMorgan"),
            ("BAC", "Bank of America"),
            ("GS", "Goldman Sachs"),
            ("MS", "Morgan Stanley"),
            ("WFC", "Wells Fargo"),
            ("C", "Citigroup"),
            // Pharma
            ("PFE", "Pfizer"),
            ("JNJ", "Johnson & Johnson"),
            ("MRNA", "Moderna"),
            ("BNTX", "BioNTech"),
            // Retail
            ("WMT", "Walmart"),
            ("TGT", "Target"),
            ("COST", "Costco"),
            // Energy
            ("XOM", "Exxon Mobil"),
            ("CVX", "Chevron"),
            // Crypto
            ("COIN", "Coinbase"),
            ("MSTR", "MicroStrategy"),
            ("RIOT", "Riot Platforms"),
            // Index
            ("SPY", "S&P 500"),
        ] {
            reg.add_symbol(t, c);
        }
        reg
    }

    /// Register (or replace) a ticker. A company name already mapped to another
    /// ticker is re-pointed to this one.
    pub fn add_symbol(&mut self, ticker: &str, company: &str) {
        let ticker = ticker.trim().to_ascii_uppercase();
        let company_lc = company.trim().to_lowercase();
        if ticker.is_empty() || company_lc.is_empty() {
            return;
        }
        if let Some(old) = self.by_ticker.insert(ticker.clone(), company.trim().to_string()) {
            let old_lc = old.to_lowercase();
            // the old name may already belong to another ticker
            if self.by_company.get(&old_lc).is_some_and(|(t, _)| *t == ticker) {
                self.by_company.remove(&old_lc);
            }
        }
        let pattern = format!(r"\b{}\b", regex::escape(&company_lc));
        // Escaped literal between word boundaries always compiles.
        if let Ok(re) = Regex::new(&pattern) {
            self.by_company.insert(company_lc, (ticker.clone(), re));
        }
        debug!(target: "ner", %ticker, company, "symbol registered");
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.by_ticker.contains_key(ticker)
    }

    pub fn company(&self, ticker: &str) -> Option<&str> {
        self.by_ticker.get(ticker).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.by_ticker.keys().map(String::as_str)
    }

    fn companies(&self) -> impl Iterator<Item = (&str, &str, &Regex)> {
        self.by_company
            .iter()
            .map(|(name, (ticker, re))| (name.as_str(), ticker.as_str(), re))
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::default_seed()
    }
}

/// Pluggable organization-name recognizer (pass 3).
pub trait OrgRecognizer: Send + Sync {
    fn organizations(&self, text: &str) -> Vec<String>;
    fn name(&self) -> &'static str;
}

/// Heuristic recognizer: runs of capitalized words closed by a corporate suffix
/// ("Riot Platforms", "Apple Inc", "Exxon Mobil Corporation").
#[derive(Debug, Default, Clone, Copy)]
pub struct CorporateSuffixRecognizer;

static RE_CORP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b((?:[A-Z][A-Za-z0-9&.\-]*\s+){0,3}?[A-Z][A-Za-z0-9&.\-]*)\s+(?:Inc|Incorporated|Corp|Corporation|Co|Company|Ltd|Limited|LLC|PLC|Group|Holdings|Platforms|Technologies|Bank)\b\.?",
    )
    .expect("corporate suffix regex")
});

impl OrgRecognizer for CorporateSuffixRecognizer {
    fn organizations(&self, text: &str) -> Vec<String> {
        RE_CORP
            .find_iter(text)
            .map(|m| m.as_str().trim_end_matches('.').to_string())
            .collect()
    }

    fn name(&self) -> &'static str {
        "corporate-suffix"
    }
}

/// Symbols plus the organization names the recognizer saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entities {
    pub symbols: BTreeSet<String>,
    pub organizations: Vec<String>,
}

#[derive(Clone)]
pub struct SymbolExtractor {
    registry: Arc<SymbolRegistry>,
    recognizer: Option<Arc<dyn OrgRecognizer>>,
}

impl SymbolExtractor {
    pub fn new(registry: SymbolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            recognizer: None,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn OrgRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    pub fn extract_symbols(&self, text: &str) -> BTreeSet<String> {
        let mut out = self.explicit_symbols(text);
        out.extend(self.company_symbols(text));
        if let Some(rec) = &self.recognizer {
            let orgs = rec.organizations(text);
            out.extend(self.symbols_for_orgs(&orgs));
        }
        out
    }

    pub fn extract_entities(&self, text: &str) -> Entities {
        let organizations = self
            .recognizer
            .as_ref()
            .map(|r| r.organizations(text))
            .unwrap_or_default();
        Entities {
            symbols: self.extract_symbols(text),
            organizations,
        }
    }

    fn explicit_symbols(&self, text: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for caps in RE_CASHTAG.captures_iter(text) {
            self.keep_known(&caps[1], &mut out);
        }
        for caps in RE_EXCHANGE.captures_iter(text) {
            self.keep_known(&caps[1].to_ascii_uppercase(), &mut out);
        }
        for caps in RE_PAREN.captures_iter(text) {
            self.keep_known(&caps[1], &mut out);
        }
        out
    }

    fn keep_known(&self, candidate: &str, out: &mut BTreeSet<String>) {
        if self.registry.contains(candidate) {
            out.insert(candidate.to_string());
        }
    }

    fn company_symbols(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.registry
            .companies()
            .filter(|(_, _, re)| re.is_match(&lower))
            .map(|(_, ticker, _)| ticker.to_string())
            .collect()
    }

    /// First registry company (registry order) contained in each org name.
    fn symbols_for_orgs(&self, orgs: &[String]) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for org in orgs {
            let org_lc = org.to_lowercase();
            if let Some((_, ticker, _)) = self
                .registry
                .companies()
                .find(|(name, _, _)| org_lc.contains(name))
            {
                out.insert(ticker.to_string());
            }
        }
        out
    }
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new(SymbolRegistry::default_seed())
    }
}
