use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

// Anything shaped like scheme://non-space is dropped before punctuation
// stripping would otherwise smear it into tokens ("https", "com", ...).
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z][a-z0-9+.-]*://\S+").expect("valid url pattern"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "how", "i", "if",
        "in", "is", "it", "of", "on", "or", "the", "to", "we", "what", "when", "where", "who",
        "why", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Normalize raw text for similarity work: NFC, lowercase, URLs dropped,
/// everything outside `[a-z0-9\s]` spaced out, whitespace collapsed.
/// Total and idempotent.
pub fn clean_text(text: &str) -> String {
    let lowered = text.nfc().collect::<String>().to_lowercase();
    let no_urls = URL_RE.replace_all(&lowered, " ");
    let spaced: String = no_urls
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleaned, stopword-filtered tokens in original order. Not deduplicated.
pub fn tokenize(text: &str) -> Vec<String> {
    clean_text(text)
        .split(' ')
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(*t))
        .map(str::to_string)
        .collect()
}
