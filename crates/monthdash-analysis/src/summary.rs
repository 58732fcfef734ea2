//! What a monthly run did, per media type and analysis.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use monthdash_core::{AnalysisKind, MediaType, YearMonth};
use uuid::Uuid;

use crate::report::WrittenArtifact;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// Raw input loaded and merged into the month's master data.
    Ingested {
        items: usize,
        master_path: PathBuf,
        master_total: usize,
    },
    /// Ingestion skipped; items read from existing master data.
    FromMaster { items: usize },
    /// No analysis enabled for this media type.
    NotRequested,
    Failed {
        reason: String,
        data_validation: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Written(WrittenArtifact),
    /// Turned off in the analysis control file or by command-line selection.
    Disabled,
    /// Not attempted because the media type's data could not be loaded.
    NotRun,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub kind: AnalysisKind,
    pub outcome: AnalysisOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSummary {
    pub media: MediaType,
    pub ingestion: IngestionOutcome,
    pub analyses: Vec<AnalysisSummary>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub period: YearMonth,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub media: Vec<MediaSummary>,
}

impl RunSummary {
    /// Any ingestion or analysis failure.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.media.iter().any(|m| {
            matches!(m.ingestion, IngestionOutcome::Failed { .. })
                || m
                    .analyses
                    .iter()
                    .any(|a| matches!(a.outcome, AnalysisOutcome::Failed { .. }))
        })
    }

    /// Artifacts written during the run.
    pub fn written(&self) -> impl Iterator<Item = &WrittenArtifact> {
        self.media
            .iter()
            .flat_map(|m| m.analyses.iter())
            .filter_map(|a| match &a.outcome {
                AnalysisOutcome::Written(w) => Some(w),
                _ => None,
            })
    }

    #[must_use]
    pub fn media_summary(&self, media: MediaType) -> Option<&MediaSummary> {
        self.media.iter().find(|m| m.media == media)
    }
}

impl MediaSummary {
    #[must_use]
    pub fn outcome(&self, kind: AnalysisKind) -> Option<&AnalysisOutcome> {
        self.analyses.iter().find(|a| a.kind == kind).map(|a| &a.outcome)
    }
}

impl fmt::Display for IngestionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestionOutcome::Ingested {
                items,
                master_path,
                master_total,
            } => write!(
                f,
                "ingested {items} items (master data {}: {master_total} rows)",
                master_path.display()
            ),
            IngestionOutcome::FromMaster { items } => {
                write!(f, "ingestion skipped, {items} items from master data")
            }
            IngestionOutcome::NotRequested => write!(f, "no analyses enabled"),
            IngestionOutcome::Failed {
                reason,
                data_validation,
            } => {
                if *data_validation {
                    write!(f, "data validation failed: {reason}")
                } else {
                    write!(f, "ingestion failed: {reason}")
                }
            }
        }
    }
}

impl fmt::Display for AnalysisOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisOutcome::Written(w) => {
                write!(f, "written {}", w.path.display())?;
                if w.failed_items > 0 {
                    write!(f, "; {} items failed", w.failed_items)?;
                }
                if !w.skipped_brands.is_empty() {
                    write!(f, "; skipped brands: {}", w.skipped_brands.join(", "))?;
                }
                if !w.failed_brands.is_empty() {
                    write!(f, "; failed brands: {}", w.failed_brands.join(", "))?;
                }
                if w.fallback {
                    write!(f, "; fallback ranking used")?;
                }
                Ok(())
            }
            AnalysisOutcome::Disabled => write!(f, "disabled"),
            AnalysisOutcome::NotRun => write!(f, "not run"),
            AnalysisOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "run {} for {} ({} ms)",
            self.run_id,
            self.period,
            elapsed.num_milliseconds()
        )?;
        for m in &self.media {
            writeln!(f, "{}: {}", m.media, m.ingestion)?;
            for a in &m.analyses {
                writeln!(f, "  {}: {}", a.kind, a.outcome)?;
            }
        }
        Ok(())
    }
}
