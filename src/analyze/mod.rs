// src/analyze/mod.rs
//! Per-article analyzers: symbols, policy change, priority, LLM relevance.

pub mod ai_adapter;
pub mod ner;
pub mod policy;
pub mod scoring;

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{RelevanceAnalysis, RelevanceAnalyzer};
pub use crate::analyze::ner::{SymbolExtractor, SymbolRegistry};
pub use crate::analyze::policy::{ChangeType, PolicyDetector, PolicySignal};
pub use crate::analyze::scoring::{priority_score, PriorityScore, SignalLevel};
