//! Month-keyed output tree:
//! `<root>/<YYYY-MM>/<media>/analysis/<kind>/<kind>_analysis_<media>.xlsx`.

use std::path::{Path, PathBuf};

use monthdash_core::{AnalysisKind, MediaType, YearMonth};

use crate::error::IoError;
use crate::writer::TEMP_PREFIX;

/// Input spreadsheet for `media` under the new-data directory.
#[must_use]
pub fn input_path(new_data_dir: &Path, media: MediaType) -> PathBuf {
    new_data_dir
        .join(media.as_str())
        .join(media.schema().master_file)
}

/// Path resolution for the output tree. Directories are created lazily by writers,
/// except through [`FolderLayout::create_month_tree`].
#[derive(Debug, Clone)]
pub struct FolderLayout {
    root: PathBuf,
}

impl FolderLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn month_dir(&self, period: YearMonth) -> PathBuf {
        self.root.join(period.folder_name())
    }

    #[must_use]
    pub fn media_dir(&self, period: YearMonth, media: MediaType) -> PathBuf {
        self.month_dir(period).join(media.as_str())
    }

    #[must_use]
    pub fn analysis_dir(&self, period: YearMonth, media: MediaType, kind: AnalysisKind) -> PathBuf {
        self.media_dir(period, media)
            .join("analysis")
            .join(kind.as_str())
    }

    #[must_use]
    pub fn output_path(&self, period: YearMonth, media: MediaType, kind: AnalysisKind) -> PathBuf {
        self.analysis_dir(period, media, kind)
            .join(format!("{}_analysis_{}.xlsx", kind.as_str(), media.as_str()))
    }

    /// Month-filtered, cleaned input rows persisted by ingestion.
    #[must_use]
    pub fn master_data_path(&self, period: YearMonth, media: MediaType) -> PathBuf {
        self.media_dir(period, media)
            .join(format!("{}_master_data.xlsx", media.as_str()))
    }

    /// Months with a `YYYY-MM` directory under the root, ascending. A missing root
    /// yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Fs`] if the root exists but cannot be listed.
    pub fn list_months(&self) -> Result<Vec<YearMonth>, IoError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(fs_err(&self.root, e)),
        };

        let mut months: Vec<YearMonth> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|e| e.file_name().to_str()?.parse::<YearMonth>().ok())
            .collect();
        months.sort_unstable();
        Ok(months)
    }

    /// Create every media and analysis directory for `period`. Returns the
    /// analysis directories in media, then analysis order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Fs`] if a directory cannot be created.
    pub fn create_month_tree(&self, period: YearMonth) -> Result<Vec<PathBuf>, IoError> {
        let mut created = Vec::new();
        for media in MediaType::ALL {
            for kind in AnalysisKind::ALL.into_iter().filter(|k| k.supports(media)) {
                let dir = self.analysis_dir(period, media, kind);
                std::fs::create_dir_all(&dir).map_err(|e| fs_err(&dir, e))?;
                created.push(dir);
            }
        }
        Ok(created)
    }

    /// Remove temporary files abandoned by interrupted writes anywhere under the root.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Fs`] if a directory cannot be read or a file removed.
    pub fn sweep_temp_files(&self) -> Result<Vec<PathBuf>, IoError> {
        let mut removed = Vec::new();
        if self.root.is_dir() {
            Self::sweep_dir(&self.root, &mut removed)?;
        }
        for path in &removed {
            tracing::info!(path = %path.display(), "removed abandoned temporary file");
        }
        Ok(removed)
    }

    fn sweep_dir(dir: &Path, removed: &mut Vec<PathBuf>) -> Result<(), IoError> {
        let entries = std::fs::read_dir(dir).map_err(|e| fs_err(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| fs_err(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| fs_err(&path, e))?;
            if file_type.is_dir() {
                Self::sweep_dir(&path, removed)?;
            } else if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                std::fs::remove_file(&path).map_err(|e| fs_err(&path, e))?;
                removed.push(path);
            }
        }
        Ok(())
    }
}

fn fs_err(path: &Path, source: std::io::Error) -> IoError {
    IoError::Fs {
        path: path.display().to_string(),
        source,
    }
}
