//! `run` command: build the text service and pipeline, then run one month.

use std::path::Path;

use anyhow::Context;
use monthdash_analysis::{AnalysisSettings, Pipeline, RunRequest, RunSummary};
use monthdash_core::{AnalysisKind, AppConfig, BrandRegistry, MediaType, YearMonth};
use monthdash_io::FolderLayout;
use monthdash_llm::{ChatClient, ChatSettings, ChatTextService};

#[derive(Debug)]
pub(crate) struct RunOptions {
    pub period: YearMonth,
    /// Empty means every media type.
    pub media: Vec<MediaType>,
    /// Empty means every analysis.
    pub analyses: Vec<AnalysisKind>,
    pub skip_ingest: bool,
    pub clean: bool,
}

/// Load the brand registry, or an empty one when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or fails validation.
pub(crate) fn load_registry(path: &Path) -> anyhow::Result<BrandRegistry> {
    if !path.is_file() {
        tracing::warn!(
            path = %path.display(),
            "brand registry not found, brand names are used as they appear in the input"
        );
        return Ok(BrandRegistry::default());
    }
    let brands = monthdash_core::load_brands(path)
        .with_context(|| format!("failed to load brands from {}", path.display()))?;
    Ok(BrandRegistry::new(&brands))
}

/// Run the enabled analyses for `options.period`.
///
/// # Errors
///
/// Returns an error for setup failures: unreadable control or brand files, a
/// client that cannot be built, or a failed `--clean` sweep. Failures inside
/// the run are reported in the returned summary.
pub(crate) async fn run_month(
    config: &AppConfig,
    options: &RunOptions,
) -> anyhow::Result<RunSummary> {
    let control = monthdash_core::load_analysis_control(&config.analysis_control_path)
        .with_context(|| {
            format!(
                "failed to load analysis control from {}",
                config.analysis_control_path.display()
            )
        })?;
    let control = control.restricted(
        (!options.media.is_empty()).then_some(options.media.as_slice()),
        (!options.analyses.is_empty()).then_some(options.analyses.as_slice()),
    );
    if control.enabled_keys().is_empty() {
        tracing::warn!("no analyses enabled for this selection");
    }

    let registry = load_registry(&config.brands_path)?;
    let layout = FolderLayout::new(config.output_dir.clone());

    if options.clean {
        let removed = layout
            .sweep_temp_files()
            .context("failed to remove temporary files")?;
        println!("removed {} temporary files", removed.len());
    }

    let client = ChatClient::with_base_url(
        &config.openai_api_key,
        ChatSettings {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
            timeout_secs: config.request_timeout_secs,
        },
        &config.openai_base_url,
    )
    .context("failed to build text service client")?;
    let service = ChatTextService::new(client);

    let pipeline = Pipeline::new(
        &service,
        &registry,
        layout,
        AnalysisSettings::from_config(config),
    );
    let request = RunRequest {
        period: options.period,
        control,
        skip_ingest: options.skip_ingest,
        new_data_dir: config.new_data_dir.clone(),
        analysis_date: chrono::Local::now().date_naive(),
    };

    Ok(pipeline.run_month(&request).await)
}
