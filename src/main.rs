mod cluster;
mod collect;
mod dedup;
mod export;
mod keywords;
mod models;
mod pipeline;
mod sentiment;
mod similarity;
mod store;
mod summary;
mod text;
mod webhook;
mod worker;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cluster::ClusterParams;
use crate::models::{DateRange, ResearchRequest, RunStatus};
use crate::pipeline::PipelineParams;
use crate::store::{JsonDirStore, MemoryStore, RunStore};
use crate::webhook::{share_payload, WebhookPlatform};
use crate::worker::ResearchWorker;

/// Crowd Pulse - social listening research pipeline
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Research topic to investigate
    #[arg(short, long)]
    topic: String,

    /// Platforms to collect from (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "reddit,x")]
    sources: Vec<String>,

    /// Query terms (comma separated); defaults to the topic itself
    #[arg(long, value_delimiter = ',')]
    query_terms: Vec<String>,

    /// Restrict collection to this date range, as FROM..TO (YYYY-MM-DD)
    #[arg(long)]
    date_range: Option<String>,

    /// Output directory for exported results (default: "out")
    #[arg(short, long, default_value = "out")]
    output_dir: String,

    /// Keep run records as JSON documents under this directory instead of
    /// in memory (also: CROWD_PULSE_STATE_DIR)
    #[arg(long)]
    state_dir: Option<String>,

    /// Number of mock items to collect
    #[arg(long, default_value_t = collect::DEFAULT_ITEM_COUNT)]
    items: usize,

    /// Near-duplicate similarity threshold
    #[arg(long, default_value_t = dedup::DEFAULT_DEDUP_THRESHOLD)]
    dedup_threshold: f64,

    /// Cluster join similarity threshold
    #[arg(long, default_value_t = ClusterParams::default().similarity_threshold)]
    cluster_threshold: f64,

    /// Maximum members per cluster
    #[arg(long, default_value_t = ClusterParams::default().max_members)]
    max_members: usize,

    /// Maximum number of clusters in the report
    #[arg(long, default_value_t = ClusterParams::default().max_clusters)]
    max_clusters: usize,

    /// Webhook URL to share the completed report to
    #[arg(long)]
    webhook_url: Option<String>,

    /// Webhook payload shape: slack, discord or generic
    #[arg(long, default_value = "generic")]
    webhook_platform: String,
}

fn parse_date_range(raw: &str) -> Result<DateRange> {
    match raw.split_once("..") {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => Ok(DateRange {
            from: from.to_string(),
            to: to.to_string(),
        }),
        _ => bail!("invalid date range {:?}, expected FROM..TO", raw),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting crowd-pulse");

    let args = Args::parse();

    let query_terms = if args.query_terms.is_empty() {
        debug!("No query terms given, falling back to the topic");
        vec![args.topic.clone()]
    } else {
        args.query_terms.clone()
    };

    let date_range = args.date_range.as_deref().map(parse_date_range).transpose()?;

    let request = ResearchRequest {
        topic: args.topic.clone(),
        sources: args.sources.clone(),
        query_terms,
        date_range,
    };

    // State dir: CLI flag > env var > ephemeral in-memory store
    let state_dir = args
        .state_dir
        .clone()
        .or_else(|| std::env::var("CROWD_PULSE_STATE_DIR").ok());
    let store: Arc<dyn RunStore> = match state_dir {
        Some(dir) => {
            debug!("Using JSON document store at {}", dir);
            Arc::new(JsonDirStore::new(dir)?)
        }
        None => {
            debug!("Using in-memory run store");
            Arc::new(MemoryStore::new())
        }
    };

    let params = PipelineParams {
        item_count: args.items,
        dedup_threshold: args.dedup_threshold,
        cluster: ClusterParams {
            similarity_threshold: args.cluster_threshold,
            max_members: args.max_members,
            max_clusters: args.max_clusters,
        },
        ..PipelineParams::default()
    };

    let worker = ResearchWorker::spawn(Arc::clone(&store), params);
    let run_id = worker.submit(request)?;
    info!("Run submitted - run_id={}, topic={:?}", run_id, args.topic);

    // Poll the store the way an HTTP status endpoint would
    let mut last_progress = None;
    let record = loop {
        let Some(record) = worker.status(&run_id)? else {
            bail!("run {} vanished from the store", run_id);
        };
        if last_progress != Some((record.status, record.progress)) {
            info!(
                "Run progress - status={}, progress={}%",
                record.status.as_str(),
                record.progress
            );
            last_progress = Some((record.status, record.progress));
        }
        if record.status.is_terminal() {
            break record;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    };

    if record.status == RunStatus::Failed {
        bail!(
            "research run failed: {}",
            record.message.as_deref().unwrap_or("unknown error")
        );
    }

    let Some(payload) = record.payload else {
        bail!("completed run {} has no payload", run_id);
    };

    let out_dir = Path::new(&args.output_dir).join(&run_id);
    export::write_run_outputs(&out_dir, &payload)?;

    if let Some(webhook_url) = &args.webhook_url {
        let platform: WebhookPlatform = args.webhook_platform.parse()?;
        let client = reqwest::Client::builder().build()?;
        if let Err(err) = share_payload(&client, webhook_url, platform, &payload).await {
            // a dead webhook shouldn't sink an otherwise completed run
            warn!("Webhook delivery failed - error={:#}", err);
        }
    }

    info!(
        "Done - run_id={}, items={}, clusters={}, outputs={}",
        run_id,
        payload.items.len(),
        payload.clusters.len(),
        out_dir.display()
    );
    Ok(())
}
