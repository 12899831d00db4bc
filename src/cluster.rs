use tracing::debug;

use crate::models::{ResearchCluster, ResearchItem};
use crate::similarity::jaccard;

/// Label used when a cluster's seed item carries no keywords at all.
pub const FALLBACK_LABEL: &str = "General";

#[derive(Debug, Clone)]
pub struct ClusterParams {
    /// Keyword-set similarity a member must exceed to join a cluster.
    pub similarity_threshold: f64,
    /// Hard cap on members per cluster.
    pub max_members: usize,
    /// At most this many clusters are emitted; later ones are dropped whole.
    pub max_clusters: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            max_members: 20,
            max_clusters: 5,
        }
    }
}

/// Greedy single-pass clustering over keyword sets.
///
/// Items are visited in input order; each unassigned item seeds a new
/// cluster labeled with its first keyword, then sweeps the remaining
/// unassigned items for keyword-set similarity above the threshold. Every
/// item lands in exactly one cluster before truncation, so the pre-cap
/// cluster list partitions the input. Deterministic for a fixed input
/// order, but not invariant under permutation: reordering the input can
/// change which items seed clusters.
pub fn cluster_items(items: &[ResearchItem], params: &ClusterParams) -> Vec<ResearchCluster> {
    let mut assigned = vec![false; items.len()];
    let mut clusters: Vec<ResearchCluster> = Vec::new();

    for i in 0..items.len() {
        if assigned[i] {
            continue;
        }

        let seed = &items[i];
        assigned[i] = true;
        let mut members = vec![seed.clone()];

        // grow cluster - single sweep over the remaining unassigned items
        for j in (i + 1)..items.len() {
            if assigned[j] {
                continue;
            }
            if members.len() >= params.max_members {
                break;
            }
            if jaccard(&seed.keywords, &items[j].keywords) > params.similarity_threshold {
                assigned[j] = true;
                members.push(items[j].clone());
            }
        }

        let size = members.len();
        let avg_sentiment = members.iter().map(|m| m.sentiment).sum::<f64>() / size as f64;
        let label = seed
            .keywords
            .first()
            .cloned()
            .unwrap_or_else(|| FALLBACK_LABEL.to_string());

        clusters.push(ResearchCluster {
            id: format!("cluster-{}", clusters.len() + 1),
            label,
            items: members,
            avg_sentiment,
            size,
        });
    }

    if !clusters.is_empty() {
        let sizes: Vec<usize> = clusters.iter().map(|c| c.size).collect();
        debug!(
            "Clustering done - clusters={}, sizes={:?}, emitting={}",
            clusters.len(),
            sizes,
            clusters.len().min(params.max_clusters)
        );
    }

    clusters.truncate(params.max_clusters);
    clusters
}
