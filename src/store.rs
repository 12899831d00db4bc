use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::debug;

use crate::models::{ResearchPayload, ResearchRequest, RunDigest, RunRecord, RunStatus};

/// Run-record storage as seen by the pipeline. The pipeline core only ever
/// talks to this trait; which backend sits behind it is the caller's choice.
pub trait RunStore: Send + Sync {
    /// Insert a fresh queued record. Fails if the run id already exists.
    fn create(&self, run_id: &str, request: ResearchRequest) -> Result<()>;

    fn get(&self, run_id: &str) -> Result<Option<RunRecord>>;

    /// Update status/progress/message. Entering `Running` stamps
    /// `started_at`; a terminal status stamps `finished_at`.
    fn update_status(
        &self,
        run_id: &str,
        status: RunStatus,
        progress: u8,
        message: Option<String>,
    ) -> Result<()>;

    /// Publish results and mark the run completed in one step.
    fn save_results(&self, run_id: &str, digest: RunDigest, payload: ResearchPayload)
        -> Result<()>;

    /// Remove a record; returns whether anything was deleted.
    fn delete(&self, run_id: &str) -> Result<bool>;

    /// Most recently created records first.
    fn list_recent(&self, limit: usize) -> Result<Vec<RunRecord>>;
}

fn new_record(run_id: &str, request: ResearchRequest) -> RunRecord {
    RunRecord {
        run_id: run_id.to_string(),
        request,
        status: RunStatus::Queued,
        progress: 0,
        message: None,
        created_at: Utc::now().to_rfc3339(),
        started_at: None,
        finished_at: None,
        summary: None,
        payload: None,
    }
}

fn apply_status(record: &mut RunRecord, status: RunStatus, progress: u8, message: Option<String>) {
    record.status = status;
    record.progress = progress;
    if message.is_some() {
        record.message = message;
    }
    let now = || Utc::now().to_rfc3339();
    if status == RunStatus::Running && record.started_at.is_none() {
        record.started_at = Some(now());
    }
    if status.is_terminal() && record.finished_at.is_none() {
        record.finished_at = Some(now());
    }
}

fn apply_results(record: &mut RunRecord, digest: RunDigest, payload: ResearchPayload) {
    record.status = RunStatus::Completed;
    record.progress = 100;
    record.finished_at = Some(Utc::now().to_rfc3339());
    record.summary = Some(digest);
    record.payload = Some(payload);
}

/// Ephemeral in-process store, the default for CLI runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<String, RunRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<T>(
        &self,
        run_id: &str,
        f: impl FnOnce(&mut RunRecord) -> T,
    ) -> Result<T> {
        let mut runs = self.runs.write().expect("run store lock");
        match runs.get_mut(run_id) {
            Some(record) => Ok(f(record)),
            None => bail!("run {} not found", run_id),
        }
    }
}

impl RunStore for MemoryStore {
    fn create(&self, run_id: &str, request: ResearchRequest) -> Result<()> {
        let mut runs = self.runs.write().expect("run store lock");
        if runs.contains_key(run_id) {
            bail!("run {} already exists", run_id);
        }
        runs.insert(run_id.to_string(), new_record(run_id, request));
        Ok(())
    }

    fn get(&self, run_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.runs.read().expect("run store lock").get(run_id).cloned())
    }

    fn update_status(
        &self,
        run_id: &str,
        status: RunStatus,
        progress: u8,
        message: Option<String>,
    ) -> Result<()> {
        self.with_record(run_id, |record| apply_status(record, status, progress, message))
    }

    fn save_results(
        &self,
        run_id: &str,
        digest: RunDigest,
        payload: ResearchPayload,
    ) -> Result<()> {
        self.with_record(run_id, |record| apply_results(record, digest, payload))
    }

    fn delete(&self, run_id: &str) -> Result<bool> {
        Ok(self.runs.write().expect("run store lock").remove(run_id).is_some())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().expect("run store lock");
        let mut records: Vec<RunRecord> = runs.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

/// Document-per-run store: each record is one pretty-printed JSON file
/// under the state directory, so completed runs survive process restarts.
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("create state dir {:?}", dir))?;
        Ok(Self { dir })
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }

    fn read_record(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let path = self.path_for(run_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("read {:?}", path)),
        };
        let record = serde_json::from_slice(&bytes)
            .with_context(|| format!("decode run document {:?}", path))?;
        Ok(Some(record))
    }

    fn write_record(&self, record: &RunRecord) -> Result<()> {
        let path = self.path_for(&record.run_id);
        fs::write(&path, serde_json::to_vec_pretty(record)?)
            .with_context(|| format!("write {:?}", path))?;
        debug!("Run document written - path={:?}", path);
        Ok(())
    }

    fn modify(&self, run_id: &str, f: impl FnOnce(&mut RunRecord)) -> Result<()> {
        let Some(mut record) = self.read_record(run_id)? else {
            bail!("run {} not found", run_id);
        };
        f(&mut record);
        self.write_record(&record)
    }
}

impl RunStore for JsonDirStore {
    fn create(&self, run_id: &str, request: ResearchRequest) -> Result<()> {
        if self.read_record(run_id)?.is_some() {
            bail!("run {} already exists", run_id);
        }
        self.write_record(&new_record(run_id, request))
    }

    fn get(&self, run_id: &str) -> Result<Option<RunRecord>> {
        self.read_record(run_id)
    }

    fn update_status(
        &self,
        run_id: &str,
        status: RunStatus,
        progress: u8,
        message: Option<String>,
    ) -> Result<()> {
        self.modify(run_id, |record| apply_status(record, status, progress, message))
    }

    fn save_results(
        &self,
        run_id: &str,
        digest: RunDigest,
        payload: ResearchPayload,
    ) -> Result<()> {
        self.modify(run_id, |record| apply_results(record, digest, payload))
    }

    fn delete(&self, run_id: &str) -> Result<bool> {
        let path = self.path_for(run_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("delete {:?}", path)),
        }
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir).with_context(|| format!("list {:?}", self.dir))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let bytes = fs::read(&path).with_context(|| format!("read {:?}", path))?;
                if let Ok(record) = serde_json::from_slice::<RunRecord>(&bytes) {
                    records.push(record);
                }
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}
