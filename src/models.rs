use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// One raw social-media item as delivered by a collector, before the
/// pipeline has touched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub id: String,
    pub text: String,
    pub source: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<u64>,
}

/// A fully processed item: `clean_text`, `sentiment` and `keywords` are
/// derived exactly once, before dedup/clustering ever see the item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchItem {
    pub id: String,
    pub text: String,
    pub clean_text: String,
    pub source: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: String,
    pub sentiment: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<u64>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchCluster {
    pub id: String,
    pub label: String,
    pub items: Vec<ResearchItem>,
    pub avg_sentiment: f64,
    pub size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentOverview {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSummary {
    pub top_pain_points: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub product_hypotheses: Vec<String>,
    pub top_sources: Vec<String>,
    pub sentiment_overview: SentimentOverview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub topic: String,
    pub sources: Vec<String>,
    pub query_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl ResearchRequest {
    /// Gate a request before any run record exists. A rejected request is
    /// never enqueued.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            bail!("topic is required");
        }
        if self.query_terms.is_empty() {
            bail!("at least one query term is required");
        }
        if self.sources.is_empty() {
            bail!("at least one source is required");
        }
        Ok(())
    }
}

/// The complete result of a run: request echo + items + clusters + summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchPayload {
    pub run_id: String,
    pub topic: String,
    pub sources: Vec<String>,
    pub query_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    pub created_at: String,
    pub items: Vec<ResearchItem>,
    pub clusters: Vec<ResearchCluster>,
    pub summary: ResearchSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Compact result digest stored alongside the payload on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDigest {
    pub total_items: usize,
    pub pain_points: Vec<String>,
    pub recommendations: Vec<String>,
}

/// One run's state as held by a [`crate::store::RunStore`]. The pipeline
/// writes into this record but never manages its persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: String,
    pub request: ResearchRequest,
    pub status: RunStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResearchPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ResearchRequest {
        ResearchRequest {
            topic: "checkout friction".into(),
            sources: vec!["reddit".into()],
            query_terms: vec!["checkout".into()],
            date_range: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn blank_topic_rejected() {
        let mut req = request();
        req.topic = "   ".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_query_terms_rejected() {
        let mut req = request();
        req.query_terms.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_sources_rejected() {
        let mut req = request();
        req.sources.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn run_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }
}
