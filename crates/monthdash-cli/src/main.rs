mod metrics;
mod months;
mod run;

use anyhow::Context;
use clap::{Parser, Subcommand};
use monthdash_core::{AnalysisKind, Cluster, MediaType, YearMonth};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "monthdash")]
#[command(about = "Monthly marketing analysis for ads, social media and PR")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest the month's input files and run the enabled analyses
    Run {
        /// Analysis year (defaults to ANALYSIS_YEAR or the current year)
        #[arg(long)]
        year: Option<i32>,
        /// Analysis month 1-12 (defaults to ANALYSIS_MONTH or the current month)
        #[arg(long)]
        month: Option<u32>,
        /// Limit the run to a media type (repeatable: ads, social_media, pr)
        #[arg(long = "media")]
        media: Vec<MediaType>,
        /// Limit the run to an analysis (repeatable: compos, creativity, key_advantages,
        /// content_pillars, audience_affinity)
        #[arg(long = "analysis")]
        analyses: Vec<AnalysisKind>,
        /// Skip ingestion and analyse the month's existing master data
        #[arg(long)]
        skip_ingest: bool,
        /// Remove abandoned temporary files from the output tree first
        #[arg(long)]
        clean: bool,
    },
    /// List months that have an output folder
    Months,
    /// Create the folder tree for a month
    InitMonth {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Print per-brand dashboard metrics for a month range
    Metrics {
        /// First month, YYYY-MM (defaults to the configured month)
        #[arg(long)]
        from: Option<YearMonth>,
        /// Last month, YYYY-MM (defaults to `--from`)
        #[arg(long)]
        to: Option<YearMonth>,
        /// Only brands in this cluster (repeatable)
        #[arg(long = "cluster")]
        clusters: Vec<Cluster>,
        /// Only this media type (repeatable)
        #[arg(long = "media")]
        media: Vec<MediaType>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("monthdash: pass a command, see --help");
        return Ok(());
    };

    let config = monthdash_core::load_app_config_from_env()
        .context("failed to load configuration from environment")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match command {
        Commands::Run {
            year,
            month,
            media,
            analyses,
            skip_ingest,
            clean,
        } => {
            let period = resolve_period(config.period, year, month)?;
            let options = run::RunOptions {
                period,
                media,
                analyses,
                skip_ingest,
                clean,
            };
            let summary = run::run_month(&config, &options).await?;
            print!("{summary}");
            if summary.has_failures() {
                anyhow::bail!("run {} finished with failures", summary.run_id);
            }
        }
        Commands::Months => months::run_months(&config)?,
        Commands::InitMonth { year, month } => {
            let period = resolve_period(config.period, year, month)?;
            months::run_init_month(&config, period)?;
        }
        Commands::Metrics {
            from,
            to,
            clusters,
            media,
            json,
        } => {
            let from = from.unwrap_or(config.period);
            let to = to.unwrap_or(from);
            if to < from {
                anyhow::bail!("--to {to} is before --from {from}");
            }
            let media = if media.is_empty() {
                MediaType::ALL.to_vec()
            } else {
                media
            };
            let query = monthdash_analysis::MetricsQuery {
                from,
                to,
                media,
                clusters,
            };
            metrics::run_metrics(&config, &query, json)?;
        }
    }

    Ok(())
}

/// Apply `--year`/`--month` overrides to the configured period.
fn resolve_period(
    configured: YearMonth,
    year: Option<i32>,
    month: Option<u32>,
) -> anyhow::Result<YearMonth> {
    let year = year.unwrap_or(configured.year());
    let month = month.unwrap_or(configured.month());
    YearMonth::new(year, month).with_context(|| format!("invalid period {year}-{month:02}"))
}
