use crate::models::{ResearchCluster, ResearchItem, ResearchSummary, SentimentOverview};

/// Sentiment above this is bucketed positive, below its negation negative.
pub const SENTIMENT_BUCKET_THRESHOLD: f64 = 0.1;

const MAX_PAIN_POINTS: usize = 5;
const MAX_TEMPLATED_CLUSTERS: usize = 3;
const EXCERPT_CHARS: usize = 150;

/// Derive the report summary from scored items and their clusters.
///
/// Pain points are the most negative items' excerpts; actions and
/// hypotheses are templated from the first clusters in emission order;
/// sources are counted exhaustively; the three sentiment buckets are
/// mutually exclusive and always sum to the item count.
pub fn generate_summary(items: &[ResearchItem], clusters: &[ResearchCluster]) -> ResearchSummary {
    let mut negative: Vec<&ResearchItem> = items
        .iter()
        .filter(|i| i.sentiment < -SENTIMENT_BUCKET_THRESHOLD)
        .collect();
    negative.sort_by(|a, b| a.sentiment.total_cmp(&b.sentiment));

    let top_pain_points = negative
        .iter()
        .take(MAX_PAIN_POINTS)
        .map(|i| excerpt(&i.text))
        .collect();

    let recommended_actions = clusters
        .iter()
        .take(MAX_TEMPLATED_CLUSTERS)
        .map(|c| {
            format!(
                "Address {} issues affecting {} mentions with avg sentiment {:.2}",
                c.label, c.size, c.avg_sentiment
            )
        })
        .collect();

    let product_hypotheses = clusters
        .iter()
        .take(MAX_TEMPLATED_CLUSTERS)
        .map(|c| format!("Opportunity: Improve {} based on {} user mentions", c.label, c.size))
        .collect();

    // insertion-ordered counts so equal-count sources keep first-seen order
    let mut source_counts: Vec<(&str, usize)> = Vec::new();
    for item in items {
        match source_counts.iter_mut().find(|(s, _)| *s == item.source) {
            Some((_, n)) => *n += 1,
            None => source_counts.push((item.source.as_str(), 1)),
        }
    }
    source_counts.sort_by(|a, b| b.1.cmp(&a.1));
    let top_sources = source_counts
        .into_iter()
        .map(|(source, count)| format!("{source}: {count}"))
        .collect();

    let positive = items
        .iter()
        .filter(|i| i.sentiment > SENTIMENT_BUCKET_THRESHOLD)
        .count();
    let negative_count = items
        .iter()
        .filter(|i| i.sentiment < -SENTIMENT_BUCKET_THRESHOLD)
        .count();
    let neutral = items.len() - positive - negative_count;

    ResearchSummary {
        top_pain_points,
        recommended_actions,
        product_hypotheses,
        top_sources,
        sentiment_overview: SentimentOverview {
            positive,
            negative: negative_count,
            neutral,
        },
    }
}

fn excerpt(text: &str) -> String {
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{cut}...")
}
