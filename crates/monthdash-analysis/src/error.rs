use monthdash_core::{AnalysisKind, ConfigError, MediaType};
use monthdash_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("analysis '{kind}' is not available for media '{media}'")]
    Unsupported {
        media: MediaType,
        kind: AnalysisKind,
    },
}

impl AnalysisError {
    /// Missing or malformed input for a media type, as opposed to a write or setup failure.
    #[must_use]
    pub fn is_data_validation(&self) -> bool {
        matches!(self, AnalysisError::Io(e) if e.is_data_validation())
    }
}
