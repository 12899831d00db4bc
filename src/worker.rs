use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::{ResearchRequest, RunRecord};
use crate::pipeline::{execute_run, PipelineParams};
use crate::store::RunStore;

/// Queue-backed research runner.
///
/// Callers submit a request and get back a run id immediately; the run is
/// executed off the caller's path and observed by polling the store. Each
/// accepted job runs on its own blocking task, so concurrent runs make
/// progress independently. Dropping the worker closes intake; jobs already
/// dequeued still finish. There is no mid-run cancellation.
pub struct ResearchWorker {
    store: Arc<dyn RunStore>,
    tx: mpsc::UnboundedSender<String>,
}

impl ResearchWorker {
    pub fn spawn(store: Arc<dyn RunStore>, params: PipelineParams) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let loop_store = Arc::clone(&store);

        tokio::spawn(async move {
            while let Some(run_id) = rx.recv().await {
                debug!("Job dequeued - run_id={}", run_id);
                let store = Arc::clone(&loop_store);
                let params = params.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(err) = execute_run(store.as_ref(), &run_id, &params) {
                        error!("Run execution error - run_id={}, error={:#}", run_id, err);
                    }
                });
            }
            debug!("Worker queue closed");
        });

        Self { store, tx }
    }

    /// Validate, record as queued, and enqueue. Invalid requests are
    /// rejected here, before any run record exists.
    pub fn submit(&self, request: ResearchRequest) -> Result<String> {
        request.validate()?;

        let run_id = Uuid::new_v4().to_string();
        self.store.create(&run_id, request)?;
        self.tx
            .send(run_id.clone())
            .map_err(|_| anyhow!("worker queue is closed"))?;

        info!("Run queued - run_id={}", run_id);
        Ok(run_id)
    }

    pub fn status(&self, run_id: &str) -> Result<Option<RunRecord>> {
        self.store.get(run_id)
    }
}
