use once_cell::sync::Lazy;
use std::collections::HashMap;

// Fixed word-polarity table, AFINN-style integer weights in [-5, 5].
// Positive words carry positive weights, negative words negative ones.
static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    serde_json::from_str(include_str!("sentiment_lexicon.json")).expect("valid sentiment lexicon")
});

/// Sum of lexicon weights over the words of `text`. Matching is done on
/// lowercased alphanumeric runs of the raw text, not on the cleaned form,
/// so contractions and punctuation don't mask lexicon hits.
pub fn lexicon_score(text: &str) -> i64 {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| i64::from(*LEXICON.get(&w.to_ascii_lowercase()).unwrap_or(&0)))
        .sum()
}

/// Length-normalized sentiment: lexicon score over the raw whitespace word
/// count, floored at one word. Empty text scores 0. Roughly [-1, 1] but
/// unbounded in principle.
pub fn compute_sentiment(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let words = text.split_whitespace().count().max(1);
    lexicon_score(text) as f64 / words as f64
}
