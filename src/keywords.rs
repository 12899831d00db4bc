pub const DEFAULT_MAX_KEYWORDS: usize = 5;

/// Top-`max_keywords` tokens by frequency, most frequent first. Counts are
/// accumulated in first-seen order and the sort is stable, so ties resolve
/// to whichever token appeared first.
pub fn extract_keywords(tokens: &[String], max_keywords: usize) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for token in tokens {
        match counts.iter_mut().find(|(t, _)| *t == token.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((token, 1)),
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(max_keywords)
        .map(|(t, _)| t.to_string())
        .collect()
}
