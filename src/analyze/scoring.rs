//! Priority scoring and the signal-level table.
//!
//! Priority (0–100) = base 50, overridden by a detected policy change
//! (new/removed 95, changed 90), plus a sentiment-magnitude bonus and a
//! symbol-count bonus, clamped to [0, 100].
//!
//! `SignalLevel::from_score` is the only place the urgency thresholds live.

use super::policy::{ChangeType, PolicySignal};
use crate::sentiment::SentimentResult;
use serde::{Deserialize, Serialize};

pub const BASE_PRIORITY: i32 = 50;

/// Articles at or above this priority count as "high priority" in run stats.
pub const HIGH_PRIORITY_THRESHOLD: u8 = 80;

const MAX_SYMBOL_BONUS: i32 = 20;
const PER_SYMBOL_BONUS: usize = 5;

/// Alert urgency bucket; 1 is the most urgent. Serialized as the integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SignalLevel {
    Urgent = 1,
    High = 2,
    Medium = 3,
    Low = 4,
}

impl SignalLevel {
    /// ≥90 urgent, ≥70 high, ≥50 medium, otherwise low.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => SignalLevel::Urgent,
            70..=89 => SignalLevel::High,
            50..=69 => SignalLevel::Medium,
            _ => SignalLevel::Low,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl From<SignalLevel> for u8 {
    fn from(level: SignalLevel) -> u8 {
        level.as_u8()
    }
}

impl TryFrom<u8> for SignalLevel {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(SignalLevel::Urgent),
            2 => Ok(SignalLevel::High),
            3 => Ok(SignalLevel::Medium),
            4 => Ok(SignalLevel::Low),
            other => Err(format!("signal level must be 1-4, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub value: u8,
    pub signal_level: SignalLevel,
}

impl PriorityScore {
    pub fn from_value(value: u8) -> Self {
        let value = value.min(100);
        Self {
            value,
            signal_level: SignalLevel::from_score(value),
        }
    }

    pub fn is_high_priority(&self) -> bool {
        self.value >= HIGH_PRIORITY_THRESHOLD
    }
}

fn sentiment_bonus(score: f32) -> i32 {
    let magnitude = score.abs();
    if magnitude > 0.5 {
        30
    } else if magnitude > 0.3 {
        20
    } else if magnitude > 0.1 {
        10
    } else {
        0
    }
}

fn policy_base(policy: &PolicySignal) -> i32 {
    if !policy.has_change {
        return BASE_PRIORITY;
    }
    match policy.change_type {
        ChangeType::NewPolicy | ChangeType::PolicyRemoved => 95,
        ChangeType::PolicyChanged => 90,
        ChangeType::None => BASE_PRIORITY,
    }
}

pub fn priority_score(
    sentiment: &SentimentResult,
    policy: &PolicySignal,
    symbol_count: usize,
) -> PriorityScore {
    let symbol_bonus = symbol_count
        .saturating_mul(PER_SYMBOL_BONUS)
        .min(MAX_SYMBOL_BONUS as usize) as i32;

    let raw = policy_base(policy) + sentiment_bonus(sentiment.score) + symbol_bonus;
    PriorityScore::from_value(raw.clamp(0, 100) as u8)
}
