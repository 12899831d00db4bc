use anyhow::{Context, Result};
use itertools::Itertools;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::models::{ResearchItem, ResearchPayload};

/// Persist a completed run into `<dir>`: the full payload as pretty JSON,
/// the item table as CSV, and a human-readable Markdown summary.
pub fn write_run_outputs(dir: &Path, payload: &ResearchPayload) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;

    fs::write(dir.join("payload.json"), serde_json::to_vec_pretty(payload)?)?;
    debug!("Wrote payload.json");

    fs::write(dir.join("items.csv"), render_items_csv(&payload.items))?;
    debug!("Wrote items.csv");

    fs::write(dir.join("summary.md"), render_summary_markdown(payload))?;
    debug!("Wrote summary.md");

    info!(
        "Outputs persisted - run_id={}, directory={}",
        payload.run_id,
        dir.display()
    );
    Ok(())
}

pub fn render_items_csv(items: &[ResearchItem]) -> String {
    let mut out = String::from("id,text,source,author,sentiment,createdAt,keywords\n");
    for item in items {
        let row = [
            csv_field(&item.id),
            csv_field(&item.text),
            csv_field(&item.source),
            csv_field(&item.author),
            format!("{}", item.sentiment),
            csv_field(&item.created_at),
            csv_field(&item.keywords.iter().join("; ")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

// RFC 4180: quote any field containing a comma, quote or newline; double
// embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render_summary_markdown(payload: &ResearchPayload) -> String {
    let summary = &payload.summary;
    let mut md = String::new();
    md.push_str(&format!("# Research Report: {}\n\n", payload.topic));

    let overview = &summary.sentiment_overview;
    md.push_str("## Sentiment Overview\n");
    md.push_str(&format!(
        "- Positive: {}\n- Negative: {}\n- Neutral: {}\n\n",
        overview.positive, overview.negative, overview.neutral
    ));

    if !summary.top_pain_points.is_empty() {
        md.push_str("## Top Pain Points\n");
        for point in &summary.top_pain_points {
            md.push_str(&format!("- {}\n", point));
        }
        md.push('\n');
    }

    if !summary.recommended_actions.is_empty() {
        md.push_str("## Recommended Actions\n");
        for action in &summary.recommended_actions {
            md.push_str(&format!("- {}\n", action));
        }
        md.push('\n');
    }

    if !summary.product_hypotheses.is_empty() {
        md.push_str("## Product Hypotheses\n");
        for hypothesis in &summary.product_hypotheses {
            md.push_str(&format!("- {}\n", hypothesis));
        }
        md.push('\n');
    }

    if !summary.top_sources.is_empty() {
        md.push_str("## Top Sources\n");
        for source in &summary.top_sources {
            md.push_str(&format!("- {}\n", source));
        }
        md.push('\n');
    }

    if !payload.clusters.is_empty() {
        md.push_str("## Clusters\n");
        for cluster in &payload.clusters {
            md.push_str(&format!(
                "- **{}** — {} items, avg sentiment {:.2}\n",
                cluster.label, cluster.size, cluster.avg_sentiment
            ));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResearchCluster, ResearchSummary, SentimentOverview};
    use pretty_assertions::assert_eq;

    fn item(id: &str, text: &str) -> ResearchItem {
        ResearchItem {
            id: id.to_string(),
            text: text.to_string(),
            clean_text: String::new(),
            source: "reddit".into(),
            author: "tester".into(),
            url: None,
            created_at: "2026-08-01T00:00:00Z".into(),
            sentiment: -0.25,
            engagement: None,
            keywords: vec!["payment".into(), "failing".into()],
        }
    }

    fn payload() -> ResearchPayload {
        ResearchPayload {
            run_id: "run-x".into(),
            topic: "payments".into(),
            sources: vec!["reddit".into()],
            query_terms: vec!["payment".into()],
            date_range: None,
            created_at: "2026-08-01T00:00:00Z".into(),
            items: vec![item("1", "Payment fails, with \"errors\"")],
            clusters: vec![ResearchCluster {
                id: "cluster-1".into(),
                label: "payment".into(),
                items: Vec::new(),
                avg_sentiment: -0.25,
                size: 1,
            }],
            summary: ResearchSummary {
                top_pain_points: vec!["Payment fails...".into()],
                recommended_actions: vec!["Address payment issues".into()],
                product_hypotheses: vec!["Opportunity: Improve payment".into()],
                top_sources: vec!["reddit: 1".into()],
                sentiment_overview: SentimentOverview {
                    positive: 0,
                    negative: 1,
                    neutral: 0,
                },
            },
        }
    }

    #[test]
    fn csv_has_header_and_quoted_fields() {
        let csv = render_items_csv(&[item("1", "Payment fails, with \"errors\"")]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,text,source,author,sentiment,createdAt,keywords"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,\"Payment fails, with \"\"errors\"\"\",reddit,tester,-0.25,"));
        assert!(row.ends_with("payment; failing"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_of_no_items_is_header_only() {
        assert_eq!(
            render_items_csv(&[]),
            "id,text,source,author,sentiment,createdAt,keywords\n"
        );
    }

    #[test]
    fn markdown_contains_all_sections() {
        let md = render_summary_markdown(&payload());
        assert!(md.starts_with("# Research Report: payments\n"));
        for heading in [
            "## Sentiment Overview",
            "## Top Pain Points",
            "## Recommended Actions",
            "## Product Hypotheses",
            "## Top Sources",
            "## Clusters",
        ] {
            assert!(md.contains(heading), "missing {heading}");
        }
        assert!(md.contains("- **payment** — 1 items, avg sentiment -0.25"));
    }

    #[test]
    fn outputs_land_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run-x");
        write_run_outputs(&target, &payload()).unwrap();
        for name in ["payload.json", "items.csv", "summary.md"] {
            assert!(target.join(name).is_file(), "missing {name}");
        }
        let parsed: ResearchPayload =
            serde_json::from_slice(&fs::read(target.join("payload.json")).unwrap()).unwrap();
        assert_eq!(parsed.run_id, "run-x");
    }
}
