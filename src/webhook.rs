use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

use crate::models::ResearchPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookPlatform {
    Slack,
    Discord,
    /// Any endpoint that accepts the raw payload JSON.
    Generic,
}

impl FromStr for WebhookPlatform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "slack" => Ok(Self::Slack),
            "discord" => Ok(Self::Discord),
            "generic" => Ok(Self::Generic),
            other => bail!("unknown webhook platform {:?} (slack|discord|generic)", other),
        }
    }
}

/// Build the platform-shaped body for a completed payload.
pub fn build_body(platform: WebhookPlatform, payload: &ResearchPayload) -> Result<Value> {
    let pain_points = payload
        .summary
        .top_pain_points
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");

    let body = match platform {
        WebhookPlatform::Slack => json!({
            "text": format!("New Research Report: {}", payload.topic),
            "blocks": [
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!(
                            "*Research Report: {}*\n\nTotal Items: {}\nClusters: {}",
                            payload.topic,
                            payload.items.len(),
                            payload.clusters.len()
                        ),
                    },
                },
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!("*Top Pain Points:*\n{}", pain_points),
                    },
                },
            ],
        }),
        WebhookPlatform::Discord => json!({
            "content": format!(
                "**New Research Report: {}**\n\nTotal Items: {}\nClusters: {}\n\n**Top Pain Points:**\n{}",
                payload.topic,
                payload.items.len(),
                payload.clusters.len(),
                pain_points
            ),
        }),
        WebhookPlatform::Generic => serde_json::to_value(payload)?,
    };
    Ok(body)
}

/// POST a completed payload to a webhook endpoint.
pub async fn share_payload(
    client: &Client,
    webhook_url: &str,
    platform: WebhookPlatform,
    payload: &ResearchPayload,
) -> Result<()> {
    let url = Url::parse(webhook_url).with_context(|| format!("invalid webhook url {:?}", webhook_url))?;
    let body = build_body(platform, payload)?;

    let start = std::time::Instant::now();
    debug!("Webhook delivery starting - platform={:?}", platform);

    client
        .post(url)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("webhook request failed for {}", webhook_url))?
        .error_for_status()
        .with_context(|| format!("webhook endpoint rejected delivery for {}", webhook_url))?;

    info!(
        "Webhook delivered - platform={:?}, duration={:.2}s",
        platform,
        start.elapsed().as_secs_f32()
    );
    Ok(())
}
