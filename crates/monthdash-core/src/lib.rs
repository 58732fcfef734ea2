//! Shared configuration and domain vocabulary for the monthly dashboard pipeline.

pub mod app_config;
pub mod brands;
pub mod config;
pub mod control;
pub mod media;
pub mod period;

use thiserror::Error;

pub use app_config::AppConfig;
pub use brands::{load_brands, BrandConfig, BrandRegistry, BrandsFile, Cluster};
pub use config::{load_app_config, load_app_config_from_env};
pub use control::{load_analysis_control, AnalysisControl};
pub use media::{AnalysisKind, MediaSchema, MediaType};
pub use period::YearMonth;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
