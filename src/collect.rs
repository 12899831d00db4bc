use chrono::{Duration, Utc};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::models::{RawItem, ResearchRequest};

/// How many mock items a collection pass yields.
pub const DEFAULT_ITEM_COUNT: usize = 20;

// Fixed sample corpus standing in for real platform APIs. Texts cycle via
// modulo indexing, so any requested count reuses them deterministically.
const SAMPLE_TEXTS: [&str; 10] = [
    "Having serious issues with the payment system. It keeps failing randomly.",
    "The new feature is absolutely amazing! Love how easy it is to use.",
    "Customer support took forever to respond. Very disappointed.",
    "Great product overall, but the UI could use some improvements.",
    "Found a critical bug that affects data exports. Please fix ASAP.",
    "This has transformed how we work. Highly recommended!",
    "Pricing seems a bit high compared to competitors.",
    "The mobile app crashes frequently on Android devices.",
    "Best tool I have used for this purpose. Worth every penny.",
    "Documentation is lacking. Spent hours figuring things out.",
];

fn make_item_id(url: &str, author: &str) -> String {
    format!("{:016x}", xxh3_64(format!("{}|{}", url, author).as_bytes()))
}

/// Produce `count` mock items for the request, spread across its sources.
/// Timestamps and engagement are index-derived rather than random, so a
/// rerun over the same request reproduces the same batch shape.
pub fn collect_items(request: &ResearchRequest, count: usize) -> Vec<RawItem> {
    let now = Utc::now();
    let items: Vec<RawItem> = (0..count)
        .map(|i| {
            let text = SAMPLE_TEXTS[i % SAMPLE_TEXTS.len()];
            let source = request.sources[i % request.sources.len()].clone();
            let author = format!("user{}", i + 1);
            let url = format!("https://example.com/post/{}", i + 1);
            // spread posts over the past ~30 days
            let created_at = (now - Duration::hours(((i as i64) * 37) % (30 * 24))).to_rfc3339();
            RawItem {
                id: make_item_id(&url, &author),
                text: text.to_string(),
                source,
                author,
                url: Some(url),
                created_at,
                engagement: Some((i as u64 * 137) % 1000),
            }
        })
        .collect();

    debug!(
        "Collection - topic={:?}, items={}, sources={:?}",
        request.topic,
        items.len(),
        request.sources
    );
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn request() -> ResearchRequest {
        ResearchRequest {
            topic: "payments".into(),
            sources: vec!["reddit".into(), "x".into()],
            query_terms: vec!["payment".into()],
            date_range: None,
        }
    }

    #[test]
    fn yields_requested_count() {
        assert_eq!(collect_items(&request(), DEFAULT_ITEM_COUNT).len(), 20);
        assert_eq!(collect_items(&request(), 7).len(), 7);
    }

    #[test]
    fn ids_are_unique_and_stable() {
        let a = collect_items(&request(), 20);
        let b = collect_items(&request(), 20);
        let ids: HashSet<&str> = a.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), 20);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
        }
    }

    #[test]
    fn sources_alternate_by_index() {
        let items = collect_items(&request(), 4);
        let sources: Vec<&str> = items.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["reddit", "x", "reddit", "x"]);
    }

    #[test]
    fn texts_cycle_through_sample_corpus() {
        let items = collect_items(&request(), 20);
        assert_eq!(items[0].text, items[10].text);
        assert_eq!(items[3].text, items[13].text);
        assert_ne!(items[0].text, items[1].text);
    }
}
