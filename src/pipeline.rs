use anyhow::{bail, Result};
use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::cluster::{cluster_items, ClusterParams};
use crate::collect::{collect_items, DEFAULT_ITEM_COUNT};
use crate::dedup::{deduplicate_items, DEFAULT_DEDUP_THRESHOLD};
use crate::keywords::{extract_keywords, DEFAULT_MAX_KEYWORDS};
use crate::models::{
    RawItem, ResearchItem, ResearchPayload, ResearchRequest, RunDigest, RunStatus,
};
use crate::sentiment::compute_sentiment;
use crate::store::RunStore;
use crate::summary::generate_summary;
use crate::text::{clean_text, tokenize};

/// Tunables for one research run. Defaults mirror the documented
/// pipeline constants; none of them is a hard invariant.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    pub item_count: usize,
    pub max_keywords: usize,
    pub dedup_threshold: f64,
    pub cluster: ClusterParams,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            item_count: DEFAULT_ITEM_COUNT,
            max_keywords: DEFAULT_MAX_KEYWORDS,
            dedup_threshold: DEFAULT_DEDUP_THRESHOLD,
            cluster: ClusterParams::default(),
        }
    }
}

/// Derive `clean_text`, `sentiment` and `keywords` for every raw item.
///
/// Each item is independent and the output preserves input order, so this
/// stage fans out across cores without changing observable results. Dedup
/// and clustering stay sequential: their decisions depend on earlier ones.
pub fn process_raw_items(raw: Vec<RawItem>, max_keywords: usize) -> Vec<ResearchItem> {
    raw.into_par_iter()
        .map(|item| {
            let clean = clean_text(&item.text);
            let sentiment = compute_sentiment(&item.text);
            let keywords = extract_keywords(&tokenize(&item.text), max_keywords);
            ResearchItem {
                id: item.id,
                text: item.text,
                clean_text: clean,
                source: item.source,
                author: item.author,
                url: item.url,
                created_at: item.created_at,
                sentiment,
                engagement: item.engagement,
                keywords,
            }
        })
        .collect()
}

/// Execute one research run end to end, reporting progress into the store.
///
/// On success the store record carries the payload and digest and reads
/// `completed`. On any stage failure the record reads `failed` with the
/// error's message and nothing partial is published.
pub fn execute_run(store: &dyn RunStore, run_id: &str, params: &PipelineParams) -> Result<()> {
    let Some(record) = store.get(run_id)? else {
        bail!("run {} not found", run_id);
    };

    match run_stages(store, run_id, &record.request, &record.created_at, params) {
        Ok((digest, payload)) => {
            store.save_results(run_id, digest, payload)?;
            info!("Run completed - run_id={}", run_id);
            Ok(())
        }
        Err(err) => {
            error!("Run failed - run_id={}, error={:#}", run_id, err);
            // keep whatever progress the run actually reached
            let progress = store
                .get(run_id)?
                .map(|r| r.progress)
                .unwrap_or(record.progress);
            store.update_status(run_id, RunStatus::Failed, progress, Some(err.to_string()))?;
            Ok(())
        }
    }
}

fn run_stages(
    store: &dyn RunStore,
    run_id: &str,
    request: &ResearchRequest,
    created_at: &str,
    params: &PipelineParams,
) -> Result<(RunDigest, ResearchPayload)> {
    let pipeline_start = std::time::Instant::now();
    info!("Pipeline started - run_id={}, topic={:?}", run_id, request.topic);
    store.update_status(run_id, RunStatus::Running, 10, None)?;

    // 1) collect raw items
    let raw = collect_items(request, params.item_count);
    store.update_status(run_id, RunStatus::Running, 30, None)?;

    // 2) per-item processing: clean, score, extract keywords
    let stage_start = std::time::Instant::now();
    let processed = process_raw_items(raw, params.max_keywords);
    debug!(
        "Item processing - items={}, duration={:.2}s",
        processed.len(),
        stage_start.elapsed().as_secs_f32()
    );
    store.update_status(run_id, RunStatus::Running, 70, None)?;

    // 3) dedup, then cluster the surviving batch
    let unique = deduplicate_items(processed, params.dedup_threshold);
    let clusters = cluster_items(&unique, &params.cluster);
    info!(
        "Batch reduced - unique_items={}, clusters={}",
        unique.len(),
        clusters.len()
    );
    store.update_status(run_id, RunStatus::Running, 90, None)?;

    // 4) summarize and assemble the payload
    let summary = generate_summary(&unique, &clusters);
    let digest = RunDigest {
        total_items: unique.len(),
        pain_points: summary.top_pain_points.clone(),
        recommendations: summary.recommended_actions.clone(),
    };
    let payload = ResearchPayload {
        run_id: run_id.to_string(),
        topic: request.topic.clone(),
        sources: request.sources.clone(),
        query_terms: request.query_terms.clone(),
        date_range: request.date_range.clone(),
        created_at: created_at.to_string(),
        items: unique,
        clusters,
        summary,
    };

    info!(
        "Pipeline finished - run_id={}, duration={:.2}s",
        run_id,
        pipeline_start.elapsed().as_secs_f32()
    );
    Ok((digest, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;
    use crate::store::{MemoryStore, RunStore};

    fn request() -> ResearchRequest {
        ResearchRequest {
            topic: "payment problems".into(),
            sources: vec!["reddit".into(), "x".into()],
            query_terms: vec!["payment".into(), "checkout".into()],
            date_range: Some(DateRange {
                from: "2026-07-01".into(),
                to: "2026-08-01".into(),
            }),
        }
    }

    fn raw(id: &str, text: &str) -> RawItem {
        RawItem {
            id: id.to_string(),
            text: text.to_string(),
            source: "reddit".into(),
            author: "tester".into(),
            url: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            engagement: None,
        }
    }

    #[test]
    fn processing_populates_derived_fields() {
        let items = process_raw_items(
            vec![raw("1", "The payment system is terrible! https://ex.com/a")],
            DEFAULT_MAX_KEYWORDS,
        );
        let item = &items[0];
        assert_eq!(item.clean_text, "the payment system is terrible");
        assert!(item.sentiment < 0.0);
        assert!(item.keywords.contains(&"payment".to_string()));
        assert!(item.keywords.len() <= DEFAULT_MAX_KEYWORDS);
    }

    #[test]
    fn processing_preserves_order() {
        let items = process_raw_items(
            vec![raw("a", "first text"), raw("b", "second text"), raw("c", "third text")],
            DEFAULT_MAX_KEYWORDS,
        );
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn end_to_end_run_completes_with_bounded_payload() {
        let store = MemoryStore::new();
        store.create("run-e2e", request()).unwrap();

        let params = PipelineParams {
            item_count: 10,
            ..PipelineParams::default()
        };
        execute_run(&store, "run-e2e", &params).unwrap();

        let record = store.get("run-e2e").unwrap().unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.progress, 100);
        assert!(record.started_at.is_some());
        assert!(record.finished_at.is_some());

        let payload = record.payload.expect("completed run carries payload");
        assert_eq!(payload.topic, "payment problems");
        assert_eq!(payload.query_terms.len(), 2);
        assert!(payload.items.len() <= 10);
        assert!(!payload.items.is_empty());
        assert!(payload.clusters.len() <= 5);
        assert!(payload.summary.top_pain_points.len() <= 5);
        for point in &payload.summary.top_pain_points {
            assert!(point.ends_with("..."));
        }

        let overview = &payload.summary.sentiment_overview;
        assert_eq!(
            overview.positive + overview.negative + overview.neutral,
            payload.items.len()
        );

        let digest = record.summary.expect("completed run carries digest");
        assert_eq!(digest.total_items, payload.items.len());
    }

    #[test]
    fn ten_mock_items_dedup_to_the_distinct_texts() {
        // 10 sample texts cycled over 20 slots collapse back to 10 uniques
        let store = MemoryStore::new();
        store.create("run-dedup", request()).unwrap();
        execute_run(&store, "run-dedup", &PipelineParams::default()).unwrap();

        let payload = store.get("run-dedup").unwrap().unwrap().payload.unwrap();
        assert_eq!(payload.items.len(), 10);
    }

    #[test]
    fn missing_run_is_an_error() {
        let store = MemoryStore::new();
        assert!(execute_run(&store, "nope", &PipelineParams::default()).is_err());
    }

    #[test]
    fn stage_failure_marks_run_failed_without_partial_publish() {
        // A store that rejects the 90% checkpoint simulates a stage throwing
        // late in the run.
        struct FailingStore(MemoryStore);
        impl RunStore for FailingStore {
            fn create(&self, run_id: &str, request: ResearchRequest) -> Result<()> {
                self.0.create(run_id, request)
            }
            fn get(&self, run_id: &str) -> Result<Option<crate::models::RunRecord>> {
                self.0.get(run_id)
            }
            fn update_status(
                &self,
                run_id: &str,
                status: RunStatus,
                progress: u8,
                message: Option<String>,
            ) -> Result<()> {
                if progress == 90 && status == RunStatus::Running {
                    bail!("simulated stage failure");
                }
                self.0.update_status(run_id, status, progress, message)
            }
            fn save_results(
                &self,
                run_id: &str,
                digest: RunDigest,
                payload: ResearchPayload,
            ) -> Result<()> {
                self.0.save_results(run_id, digest, payload)
            }
            fn delete(&self, run_id: &str) -> Result<bool> {
                self.0.delete(run_id)
            }
            fn list_recent(&self, limit: usize) -> Result<Vec<crate::models::RunRecord>> {
                self.0.list_recent(limit)
            }
        }

        let store = FailingStore(MemoryStore::new());
        store.create("run-fail", request()).unwrap();
        execute_run(&store, "run-fail", &PipelineParams::default()).unwrap();

        let record = store.get("run-fail").unwrap().unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.message.as_deref(), Some("simulated stage failure"));
        assert!(record.payload.is_none());
        assert!(record.summary.is_none());
    }
}
