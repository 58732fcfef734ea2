//! `metrics` command: per-brand dashboard metrics for a month range.

use anyhow::Context;
use monthdash_analysis::{compute_metrics, BrandMetrics, MetricsQuery};
use monthdash_core::AppConfig;
use monthdash_io::FolderLayout;

use crate::run::load_registry;

/// Compute and print metrics, as a table or as JSON.
///
/// # Errors
///
/// Returns an error if the brand registry or an existing output file cannot be read.
pub(crate) fn run_metrics(
    config: &AppConfig,
    query: &MetricsQuery,
    json: bool,
) -> anyhow::Result<()> {
    let registry = load_registry(&config.brands_path)?;
    let layout = FolderLayout::new(config.output_dir.clone());
    let metrics = compute_metrics(&layout, &registry, query)
        .with_context(|| format!("failed to compute metrics for {}..{}", query.from, query.to))?;

    if json {
        let out = serde_json::to_string_pretty(&metrics).context("failed to serialize metrics")?;
        println!("{out}");
        return Ok(());
    }

    if metrics.is_empty() {
        println!(
            "no data for {}..{}; run `monthdash run` for those months first",
            query.from, query.to
        );
        return Ok(());
    }

    println!(
        "{:<9}{:<14}{:<26}{:<20}{:>7}{:>14}{:>10}{:>6}{:>7}  DOMINANT",
        "MONTH", "MEDIA", "BRAND", "CLUSTER", "ITEMS", "REACH", "STRENGTH", "RANK", "SCORE"
    );
    for m in &metrics {
        println!("{}", format_row(m));
    }
    Ok(())
}

fn format_row(m: &BrandMetrics) -> String {
    let dash = || "-".to_string();
    format!(
        "{:<9}{:<14}{:<26}{:<20}{:>7}{:>14.0}{:>10}{:>6}{:>7}  {}",
        m.period,
        m.media.to_string(),
        truncate(&m.brand, 24),
        m.cluster.map_or_else(dash, |c| c.to_string()),
        m.items,
        m.reach,
        m.brand_strength.map_or_else(dash, |s| format!("{s:.2}")),
        m.creativity_rank.map_or_else(dash, |r| r.to_string()),
        m.creativity_score.map_or_else(dash, |s| format!("{s:.1}")),
        m.dominant_archetype.as_deref().unwrap_or("-"),
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max - 3).collect::<String>())
    } else {
        s.to_string()
    }
}
