use tracing::debug;

use crate::models::ResearchItem;
use crate::similarity::jaccard;
use crate::text::tokenize;

pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.9;

/// Drop near-duplicates, keeping the first occurrence. Each candidate is
/// compared against every already-kept item by Jaccard similarity over the
/// tokens of its cleaned text; meeting the threshold counts as duplicate.
/// Input order is preserved. O(n²) in item count, which is fine for the
/// tens-to-hundreds batches this pipeline handles.
pub fn deduplicate_items(items: Vec<ResearchItem>, threshold: f64) -> Vec<ResearchItem> {
    let before = items.len();
    let mut kept: Vec<ResearchItem> = Vec::with_capacity(items.len());
    let mut kept_tokens: Vec<Vec<String>> = Vec::with_capacity(items.len());

    for candidate in items {
        let tokens = tokenize(&candidate.clean_text);
        let is_duplicate = kept_tokens
            .iter()
            .any(|existing| jaccard(&tokens, existing) >= threshold);
        if !is_duplicate {
            kept_tokens.push(tokens);
            kept.push(candidate);
        }
    }

    let removed = before - kept.len();
    if removed > 0 {
        debug!(
            "Deduplication - removed={} near-duplicates, retained={}",
            removed,
            kept.len()
        );
    }
    kept
}
