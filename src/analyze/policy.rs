//! Policy / regulatory change detector.
//!
//! Keyword sets per change type (English + Korean) are matched as
//! case-insensitive substrings. The type with the most hits wins; ties go to
//! the earlier entry of `CHANGE_PRIORITY`.
//!
//! Confidence: 0.6 base, +0.3 when a government agency is named, +0.1 when a
//! sector is affected, capped at 1.0.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    NewPolicy,
    PolicyRemoved,
    PolicyChanged,
    None,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::NewPolicy => "new_policy",
            ChangeType::PolicyRemoved => "policy_removed",
            ChangeType::PolicyChanged => "policy_changed",
            ChangeType::None => "none",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            ChangeType::NewPolicy => NEW_POLICY,
            ChangeType::PolicyRemoved => POLICY_REMOVED,
            ChangeType::PolicyChanged => POLICY_CHANGED,
            ChangeType::None => &[],
        }
    }
}

/// Tie-break order when two change types have the same hit count.
pub const CHANGE_PRIORITY: [ChangeType; 3] = [
    ChangeType::NewPolicy,
    ChangeType::PolicyRemoved,
    ChangeType::PolicyChanged,
];

const NEW_POLICY: &[&str] = &[
    "new regulation",
    "introduces law",
    "passes bill",
    "signs executive order",
    "announces policy",
    "implements rule",
    "enacts legislation",
    "tariff on",
    "sanctions against",
    "export ban",
    "import restriction",
    "tax on",
    "subsidy for",
    "grant for",
    "신규 정책",
    "법안 통과",
    "행정명령",
    "규제 도입",
    "관세 부과",
    "제재 발표",
    "수출 금지",
    "세금 부과",
    "보조금 지급",
];

const POLICY_REMOVED: &[&str] = &[
    "repeals",
    "removes regulation",
    "lifts ban",
    "ends sanctions",
    "deregulation",
    "eases restrictions",
    "scraps policy",
    "tariff relief",
    "tax cut",
    "subsidy cut",
    "규제 완화",
    "금지 해제",
    "제재 해제",
    "관세 철폐",
    "세금 감면",
    "보조금 삭감",
];

const POLICY_CHANGED: &[&str] = &[
    "raises interest rate",
    "lowers interest rate",
    "changes policy",
    "adjusts regulation",
    "modifies law",
    "amends bill",
    "increases tax",
    "reduces tax",
    "extends deadline",
    "금리 인상",
    "금리 인하",
    "정책 변경",
    "세율 조정",
    "법 개정",
    "기한 연장",
];

const GOVERNMENT_AGENCIES: &[&str] = &[
    "SEC",
    "FTC",
    "FDA",
    "FCC",
    "EPA",
    "DOJ",
    "Treasury",
    "Federal Reserve",
    "Fed",
    "White House",
    "Congress",
    "Senate",
    "House of Representatives",
    "연준",
    "재무부",
    "상무부",
];

/// Sectors in reporting order; the first keyword hit per sector counts.
const SECTOR_KEYWORDS: &[(&str, &[&str])] = &[
    ("Technology", &["tech", "software", "ai", "chip", "semiconductor", "cloud"]),
    ("Finance", &["bank", "financial", "investment", "trading", "crypto"]),
    ("Healthcare", &["pharma", "biotech", "drug", "medical", "health"]),
    ("Energy", &["oil", "gas", "energy", "renewable", "solar", "wind"]),
    ("Automotive", &["auto", "car", "electric vehicle", "ev", "automotive"]),
    ("Retail", &["retail", "e-commerce", "consumer"]),
    ("Telecom", &["telecom", "wireless", "5g", "network"]),
];

static RE_AGENCY: Lazy<Regex> = Lazy::new(|| {
    let alts = GOVERNMENT_AGENCIES
        .iter()
        .map(|a| regex::escape(a))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alts})\b")).expect("agency regex")
});

pub const FALLBACK_DESCRIPTION: &str = "Policy change detected (details unclear)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySignal {
    pub has_change: bool,
    pub change_type: ChangeType,
    pub description: String,
    pub affected_sectors: Vec<String>,
    /// One-line reading of what the change may mean for the sectors.
    pub catalyst: String,
    /// In [0, 1].
    pub confidence: f32,
}

impl PolicySignal {
    pub fn none() -> Self {
        Self {
            has_change: false,
            change_type: ChangeType::None,
            description: String::new(),
            affected_sectors: Vec::new(),
            catalyst: String::new(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyDetector;

impl PolicyDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str) -> PolicySignal {
        let lower = text.to_lowercase();

        let change_type = detect_change_type(&lower);
        if change_type == ChangeType::None {
            return PolicySignal::none();
        }

        let has_agency = RE_AGENCY.is_match(text);
        let description = extract_description(text, change_type);
        let affected_sectors = affected_sectors(&lower);
        let catalyst = catalyst(change_type, &affected_sectors);

        // tenths keep 0.6 + 0.3 + 0.1 exact
        let mut tenths: u8 = 6;
        if has_agency {
            tenths += 3;
        }
        if !affected_sectors.is_empty() {
            tenths += 1;
        }
        let confidence = f32::from(tenths.min(10)) / 10.0;

        PolicySignal {
            has_change: true,
            change_type,
            description,
            affected_sectors,
            catalyst,
            confidence,
        }
    }
}

fn hit_count(lower: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .filter(|k| lower.contains(&k.to_lowercase()))
        .count()
}

fn detect_change_type(lower: &str) -> ChangeType {
    let mut best = ChangeType::None;
    let mut best_hits = 0usize;
    for ct in CHANGE_PRIORITY {
        let hits = hit_count(lower, ct.keywords());
        // strict: an equal count never displaces an earlier type
        if hits > best_hits {
            best = ct;
            best_hits = hits;
        }
    }
    best
}

/// First of the first five sentences that carries a keyword of `ct`.
fn extract_description(text: &str, ct: ChangeType) -> String {
    for sentence in text.split('.').take(5) {
        let lower = sentence.to_lowercase();
        if ct.keywords().iter().any(|k| lower.contains(&k.to_lowercase())) {
            return sentence.trim().to_string();
        }
    }
    FALLBACK_DESCRIPTION.to_string()
}

fn affected_sectors(lower: &str) -> Vec<String> {
    SECTOR_KEYWORDS
        .iter()
        .filter(|(_, kws)| kws.iter().any(|k| lower.contains(k)))
        .map(|(sector, _)| sector.to_string())
        .collect()
}

fn catalyst(ct: ChangeType, sectors: &[String]) -> String {
    let base = match ct {
        ChangeType::NewPolicy => "New regulation may increase costs or restrict operations",
        ChangeType::PolicyRemoved => "Deregulation may boost profitability and market access",
        _ => "Policy change may create winners and losers",
    };
    if sectors.is_empty() {
        base.to_string()
    } else {
        format!("{base} for {} sector", sectors.join(", "))
    }
}
