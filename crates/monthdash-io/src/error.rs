use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("input file not found: {path}")]
    MissingFile { path: String },

    #[error("{media} input {path} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        media: String,
        path: String,
        columns: Vec<String>,
    },

    #[error("failed to read spreadsheet {path}: {reason}")]
    Spreadsheet { path: String, reason: String },

    #[error("spreadsheet {path} has no header row")]
    EmptySheet { path: String },

    #[error("failed to build workbook for {path}: {reason}")]
    Workbook { path: String, reason: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem error at {path}: {source}")]
    Fs {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl IoError {
    /// Input problems that make a media type's data unusable for this run.
    #[must_use]
    pub fn is_data_validation(&self) -> bool {
        matches!(
            self,
            IoError::MissingFile { .. }
                | IoError::MissingColumns { .. }
                | IoError::EmptySheet { .. }
        )
    }
}
