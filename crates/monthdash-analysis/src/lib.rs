//! Monthly analyses over loaded content: CompOS archetype classification,
//! creativity ranking, key-advantage extraction, content pillars and audience
//! affinity, plus the
//! run orchestration that writes their workbooks and the dashboard metrics that
//! read them back.

pub mod advantages;
pub mod affinity;
pub mod archetype;
pub mod compos;
pub mod creativity;
pub mod error;
pub mod grouping;
pub mod metrics;
pub mod pillars;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod summary;
pub mod text;

pub use error::AnalysisError;
pub use grouping::{FailedBrand, SkippedBrand};
pub use metrics::{compute_metrics, BrandMetrics, MetricsQuery};
pub use pipeline::{Pipeline, RunRequest};
pub use report::{AnalysisReport, WrittenArtifact};
pub use settings::AnalysisSettings;
pub use summary::{AnalysisOutcome, AnalysisSummary, IngestionOutcome, MediaSummary, RunSummary};
