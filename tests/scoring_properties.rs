// tests/scoring_properties.rs
use news_signal_analyzer::analyze::ner::{SymbolExtractor, SymbolRegistry};
use news_signal_analyzer::analyze::policy::{ChangeType, PolicyDetector, PolicySignal};
use news_signal_analyzer::analyze::scoring::{priority_score, SignalLevel};
use news_signal_analyzer::sentiment::{
    label_for_score, SentimentLabel, SentimentResult, SentimentScorer, Strategy,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sentiment(score: f32) -> SentimentResult {
    SentimentResult {
        label: label_for_score(score),
        score,
        confidence: score.abs().min(1.0),
        strategy: Strategy::Lexicon,
    }
}

#[test]
fn priority_is_always_within_bounds() {
    let mut rng = StdRng::seed_from_u64(2024);
    let policies = [
        PolicySignal::none(),
        PolicyDetector::new().detect("Treasury passes bill on chip exports"),
        PolicyDetector::new().detect("Regulator repeals the rule"),
        PolicyDetector::new().detect("Fed raises interest rate"),
    ];
    for _ in 0..2_000 {
        let s = sentiment(rng.random_range(-50.0f32..50.0));
        let policy = &policies[rng.random_range(0..policies.len())];
        let count = if rng.random_bool(0.1) {
            usize::MAX - rng.random_range(0..10usize)
        } else {
            rng.random_range(0..100usize)
        };
        let p = priority_score(&s, policy, count);
        assert!(p.value <= 100);
        assert_eq!(p.signal_level, SignalLevel::from_score(p.value));
    }
}

#[test]
fn policy_override_values() {
    let d = PolicyDetector::new();
    let new = d.detect("Congress passes bill");
    assert_eq!(new.change_type, ChangeType::NewPolicy);
    assert_eq!(priority_score(&sentiment(0.0), &new, 0).value, 95);

    let changed = d.detect("Central bank raises interest rate");
    assert_eq!(changed.change_type, ChangeType::PolicyChanged);
    assert_eq!(priority_score(&sentiment(0.0), &changed, 0).value, 90);
}

#[test]
fn sec_crypto_regulation_example() {
    let s = PolicyDetector::new().detect("The SEC introduces new regulation on crypto trading");
    assert_eq!(s.change_type, ChangeType::NewPolicy);
    assert!(s.confidence >= 0.9);
}

#[test]
fn extractor_never_returns_unknown_tickers() {
    let mut rng = StdRng::seed_from_u64(99);
    let words = [
        "Apple", "apple", "$AAPL", "$ZZZ", "NYSE:XYZ", "nasdaq:msft", "(GS)", "(QQQQ)", "Tesla",
        "Meta", "metaverse", "Bank of America", "Palantir", "Acme Corp", "rally", "the", "$C",
        "Goldman Sachs", "(PLTR)", "S&P 500", "Riot Platforms",
    ];
    for round in 0..200 {
        let mut reg = if round % 2 == 0 {
            SymbolRegistry::default_seed()
        } else {
            SymbolRegistry::empty()
        };
        if rng.random_bool(0.5) {
            reg.add_symbol("PLTR", "Palantir");
        }
        let known: Vec<String> = reg.tickers().map(str::to_string).collect();
        let ex = SymbolExtractor::new(reg);

        let n = rng.random_range(0..25);
        let text: Vec<&str> = (0..n).map(|_| words[rng.random_range(0..words.len())]).collect();
        let text = text.join(" ");

        for t in ex.extract_symbols(&text) {
            assert!(known.contains(&t), "unknown ticker {t} from {text:?}");
        }
    }
}

#[tokio::test]
async fn sentiment_is_idempotent() {
    let scorer = SentimentScorer::lexicon_only();
    for text in [
        "",
        "Apple shares surge after strong earnings",
        "Markets did not crash despite weak data",
        "Shares fell sharply as the outlook was cut",
    ] {
        let a = scorer.score(text).await;
        let b = scorer.score(text).await;
        assert_eq!(a, b);
        assert_eq!(scorer.score_lexicon(text), a);
    }
}

#[test]
fn sentiment_label_boundaries() {
    assert_eq!(label_for_score(0.06), SentimentLabel::Positive);
    assert_eq!(label_for_score(-0.04), SentimentLabel::Neutral);
}
