//! Monthly run orchestration.
//!
//! Media types are processed one after another and isolated from each other: a
//! load failure for one media type marks its analyses as not run and the run
//! moves on. Within a media type each enabled analysis runs to completion and
//! is written atomically before the next starts, so an interrupted run leaves
//! only complete artifacts behind.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use monthdash_core::{AnalysisControl, AnalysisKind, BrandRegistry, MediaType, YearMonth};
use monthdash_io::{
    input_path, read_master_data, update_master_data, write_workbook_atomic, ContentItem,
    DataLoader, FolderLayout,
};
use monthdash_llm::TextService;
use uuid::Uuid;

use crate::advantages::run_key_advantages;
use crate::affinity::run_audience_affinity;
use crate::compos::run_compos;
use crate::creativity::run_creativity;
use crate::error::AnalysisError;
use crate::pillars::run_content_pillars;
use crate::report::{AnalysisReport, WrittenArtifact};
use crate::settings::AnalysisSettings;
use crate::summary::{AnalysisOutcome, AnalysisSummary, IngestionOutcome, MediaSummary, RunSummary};

/// One monthly run's inputs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub period: YearMonth,
    /// Already narrowed to any command-line media/analysis selection.
    pub control: AnalysisControl,
    /// Read items from existing master data instead of the raw input files.
    pub skip_ingest: bool,
    pub new_data_dir: PathBuf,
    /// Stamped into master data rows.
    pub analysis_date: NaiveDate,
}

pub struct Pipeline<'a> {
    service: &'a dyn TextService,
    registry: &'a BrandRegistry,
    layout: FolderLayout,
    settings: AnalysisSettings,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        service: &'a dyn TextService,
        registry: &'a BrandRegistry,
        layout: FolderLayout,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            service,
            registry,
            layout,
            settings,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &FolderLayout {
        &self.layout
    }

    /// Run every enabled analysis for `request.period`. Failures are reported
    /// in the summary, never returned.
    pub async fn run_month(&self, request: &RunRequest) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            run_id = %run_id,
            period = %request.period,
            skip_ingest = request.skip_ingest,
            enabled = ?request.control.enabled_keys(),
            "monthly run started"
        );

        let mut media = Vec::with_capacity(MediaType::ALL.len());
        for m in MediaType::ALL {
            media.push(self.run_media(request, m).await);
        }

        let summary = RunSummary {
            run_id,
            period: request.period,
            started_at,
            finished_at: Utc::now(),
            media,
        };
        tracing::info!(
            run_id = %run_id,
            written = summary.written().count(),
            failures = summary.has_failures(),
            "monthly run finished"
        );
        summary
    }

    async fn run_media(&self, request: &RunRequest, media: MediaType) -> MediaSummary {
        let kinds: Vec<AnalysisKind> = AnalysisKind::ALL
            .into_iter()
            .filter(|k| k.supports(media))
            .collect();
        let enabled = request.control.enabled_for(media);

        if enabled.is_empty() {
            tracing::info!(media = %media, "no analyses enabled, media skipped");
            return MediaSummary {
                media,
                ingestion: IngestionOutcome::NotRequested,
                analyses: kinds
                    .into_iter()
                    .map(|kind| AnalysisSummary {
                        kind,
                        outcome: AnalysisOutcome::Disabled,
                    })
                    .collect(),
            };
        }

        let (ingestion, items) = match self.ingest(request, media) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!(media = %media, error = %e, "media data unavailable, analyses not run");
                let ingestion = IngestionOutcome::Failed {
                    reason: e.to_string(),
                    data_validation: e.is_data_validation(),
                };
                let analyses = kinds
                    .into_iter()
                    .map(|kind| AnalysisSummary {
                        kind,
                        outcome: if enabled.contains(&kind) {
                            AnalysisOutcome::NotRun
                        } else {
                            AnalysisOutcome::Disabled
                        },
                    })
                    .collect();
                return MediaSummary {
                    media,
                    ingestion,
                    analyses,
                };
            }
        };

        let mut analyses = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let outcome = if enabled.contains(&kind) {
                match self.analyze_and_write(request.period, media, kind, &items).await {
                    Ok(written) => AnalysisOutcome::Written(written),
                    Err(e) => {
                        tracing::error!(media = %media, analysis = %kind, error = %e, "analysis failed");
                        AnalysisOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            } else {
                tracing::info!(media = %media, analysis = %kind, "analysis disabled");
                AnalysisOutcome::Disabled
            };
            analyses.push(AnalysisSummary { kind, outcome });
        }

        MediaSummary {
            media,
            ingestion,
            analyses,
        }
    }

    /// Load the month's items for `media`, either from raw input (updating
    /// master data) or from existing master data. With the PR agility switch on,
    /// PR raw input is the merged agility exports.
    fn ingest(
        &self,
        request: &RunRequest,
        media: MediaType,
    ) -> Result<(IngestionOutcome, Vec<ContentItem>), AnalysisError> {
        let loader = DataLoader::new(self.registry);

        if request.skip_ingest {
            let items = read_master_data(&loader, &self.layout, request.period, media)?;
            return Ok((IngestionOutcome::FromMaster { items: items.len() }, items));
        }

        let loaded = if media == MediaType::Pr && request.control.pr_agility() {
            loader.load_agility(&request.new_data_dir, request.period)?
        } else {
            loader.load_month(media, &input_path(&request.new_data_dir, media), request.period)?
        };
        let loaded_count = loaded.items.len();
        let update = update_master_data(
            &loader,
            &self.layout,
            request.period,
            media,
            loaded.items,
            request.analysis_date,
        )?;
        let items = read_master_data(&loader, &self.layout, request.period, media)?;

        Ok((
            IngestionOutcome::Ingested {
                items: loaded_count,
                master_path: update.path,
                master_total: update.total,
            },
            items,
        ))
    }

    /// Run one analysis over `items`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Unsupported`] for a pair such as content pillars on ads.
    pub async fn analyze(
        &self,
        media: MediaType,
        kind: AnalysisKind,
        items: &[ContentItem],
    ) -> Result<AnalysisReport, AnalysisError> {
        if !kind.supports(media) {
            return Err(AnalysisError::Unsupported { media, kind });
        }
        let (service, settings) = (self.service, &self.settings);
        tracing::info!(media = %media, analysis = %kind, items = items.len(), "analysis started");
        let report = match kind {
            AnalysisKind::Compos => {
                AnalysisReport::Compos(run_compos(service, settings, media, items).await)
            }
            AnalysisKind::Creativity => {
                AnalysisReport::Creativity(run_creativity(service, settings, media, items).await)
            }
            AnalysisKind::KeyAdvantages => AnalysisReport::KeyAdvantages(
                run_key_advantages(service, settings, media, items).await,
            ),
            AnalysisKind::ContentPillars => AnalysisReport::ContentPillars(
                run_content_pillars(service, settings, media, items).await,
            ),
            AnalysisKind::AudienceAffinity => AnalysisReport::AudienceAffinity(
                run_audience_affinity(service, settings, media, items).await,
            ),
        };
        Ok(report)
    }

    async fn analyze_and_write(
        &self,
        period: YearMonth,
        media: MediaType,
        kind: AnalysisKind,
        items: &[ContentItem],
    ) -> Result<WrittenArtifact, AnalysisError> {
        let report = self.analyze(media, kind, items).await?;
        let path = self.layout.output_path(period, media, kind);
        write_workbook_atomic(&path, &report.sheets())?;
        tracing::info!(media = %media, analysis = %kind, path = %path.display(), "analysis written");

        Ok(WrittenArtifact {
            path,
            skipped_brands: report.skipped().iter().map(|s| s.brand.clone()).collect(),
            failed_brands: report.failed_brands().iter().map(|f| f.brand.clone()).collect(),
            failed_items: report.failed_items(),
            fallback: report.used_fallback(),
        })
    }
}
