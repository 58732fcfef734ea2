//! All-or-nothing workbook output.
//!
//! Workbooks are rendered fully in memory, written to a temporary file beside the
//! target, and renamed over it. Readers see either the previous artifact or the
//! complete new one.

use std::collections::HashSet;
use std::io::Write as _;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::IoError;
use crate::table::Cell;

/// File-name prefix of in-flight temporary outputs. Leftovers are removed by
/// [`crate::FolderLayout::sweep_temp_files`].
pub const TEMP_PREFIX: &str = ".monthdash-";

/// Excel's sheet-name limit.
const MAX_SHEET_NAME: usize = 31;
/// Excel's per-cell text limit.
const MAX_CELL_CHARS: usize = 32_767;

/// One worksheet to be written: a header row followed by data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetData {
    #[must_use]
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Render `sheets` into xlsx bytes. Sheet names are sanitized and made unique.
///
/// # Errors
///
/// Returns the underlying [`XlsxError`] if the workbook cannot be assembled.
pub fn render_workbook(sheets: &[SheetData]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let mut used_names = HashSet::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sanitize_sheet_name(&sheet.name, &mut used_names))?;

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col_u16(col), header, &header_format)?;
        }
        for (row_index, row) in sheet.rows.iter().enumerate() {
            let row_num = u32::try_from(row_index + 1).unwrap_or(u32::MAX);
            for (col, cell) in row.iter().enumerate() {
                let col = col_u16(col);
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row_num, col, clamp_text(s))?;
                    }
                    Cell::Number(n) | Cell::DateSerial(n) => {
                        worksheet.write_number(row_num, col, *n)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row_num, col, *b)?;
                    }
                }
            }
        }
    }

    workbook.save_to_buffer()
}

/// Write `sheets` to `path` atomically, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`IoError::Workbook`] if rendering fails and [`IoError::Write`] if the
/// temporary file cannot be written or moved into place. On error no file is
/// left at `path` beyond whatever was there before.
pub fn write_workbook_atomic(path: &Path, sheets: &[SheetData]) -> Result<(), IoError> {
    let shown = path.display().to_string();
    let bytes = render_workbook(sheets).map_err(|e| IoError::Workbook {
        path: shown.clone(),
        reason: e.to_string(),
    })?;
    write_bytes_atomic(path, &bytes)?;
    tracing::debug!(path = %shown, sheets = sheets.len(), bytes = bytes.len(), "workbook written");
    Ok(())
}

/// Write `bytes` to `path` through a temporary sibling file and a rename.
///
/// # Errors
///
/// Returns [`IoError::Write`] on any filesystem failure.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let write_err = |source: std::io::Error| IoError::Write {
        path: path.display().to_string(),
        source,
    };
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Excel-safe, unique sheet name: forbidden characters replaced, at most 31
/// characters, suffixed with ` (n)` on collision (case-insensitive).
#[must_use]
pub fn sanitize_sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base: String = if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        candidate = format!("{}{suffix}", base.chars().take(keep).collect::<String>());
        n += 1;
    }
    candidate
}

fn col_u16(col: usize) -> u16 {
    u16::try_from(col).unwrap_or(u16::MAX)
}

fn clamp_text(s: &str) -> &str {
    match s.char_indices().nth(MAX_CELL_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::read_sheet;

    #[test]
    fn sheet_names_are_sanitized_and_truncated() {
        let mut used = HashSet::new();
        assert_eq!(sanitize_sheet_name("IKI / Rimi: [Top]", &mut used), "IKI _ Rimi_ _Top_");
        let long = "A".repeat(40);
        assert_eq!(sanitize_sheet_name(&long, &mut used).chars().count(), 31);
        assert_eq!(sanitize_sheet_name("   ", &mut used), "Sheet");
    }

    #[test]
    fn duplicate_sheet_names_get_suffix() {
        let mut used = HashSet::new();
        assert_eq!(sanitize_sheet_name("Rimi", &mut used), "Rimi");
        assert_eq!(sanitize_sheet_name("RIMI", &mut used), "RIMI (2)");
        assert_eq!(sanitize_sheet_name("rimi", &mut used), "rimi (3)");
    }

    #[test]
    fn clamp_text_respects_char_boundaries() {
        let s = "ą".repeat(MAX_CELL_CHARS + 5);
        assert_eq!(clamp_text(&s).chars().count(), MAX_CELL_CHARS);
        assert_eq!(clamp_text("short"), "short");
    }

    #[test]
    fn atomic_write_round_trips_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2025-08/ads/analysis/compos/compos_analysis_ads.xlsx");

        let mut sheet = SheetData::new("Items", &["brand", "reach"]);
        sheet.push_row(vec![Cell::text("Rimi"), Cell::Number(12.0)]);
        sheet.push_row(vec![Cell::text("IKI"), Cell::Empty]);
        write_workbook_atomic(&path, &[sheet]).unwrap();

        let table = read_sheet(&path, Some("Items")).unwrap();
        assert_eq!(table.headers, vec!["brand", "reach"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][1].as_number(), Some(12.0));

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn rewrite_replaces_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut first = SheetData::new("Skipped Brands", &["brand"]);
        first.push_row(vec![Cell::text("Old")]);
        write_workbook_atomic(&path, &[first]).unwrap();

        let second = SheetData::new("Skipped Brands", &["brand"]);
        write_workbook_atomic(&path, &[second]).unwrap();

        let table = read_sheet(&path, Some("Skipped Brands")).unwrap();
        assert!(table.rows.is_empty());
    }

    fn temp_files_in(dir: &Path) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .map(|e| e.path())
            .collect()
    }

    #[test]
    fn uncreatable_parent_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("2025-08");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("ads/analysis/compos/compos_analysis_ads.xlsx");

        let err = write_workbook_atomic(&path, &[SheetData::new("Items", &["brand"])]).unwrap_err();
        assert!(matches!(err, IoError::Write { .. }), "got {err:?}");
        assert!(!err.is_data_validation());
        assert!(temp_files_in(dir.path()).is_empty());
    }

    #[test]
    fn directory_at_target_fails_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creativity_analysis_ads.xlsx");
        std::fs::create_dir(&path).unwrap();

        let err = write_workbook_atomic(&path, &[SheetData::new("Items", &["brand"])]).unwrap_err();
        assert!(matches!(err, IoError::Write { .. }), "got {err:?}");
        assert!(path.is_dir());
        assert!(temp_files_in(dir.path()).is_empty());
    }

    #[test]
    fn failed_render_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut previous = SheetData::new("Items", &["brand"]);
        previous.push_row(vec![Cell::text("Rimi")]);
        write_workbook_atomic(&path, &[previous]).unwrap();

        // More columns than a worksheet can hold.
        let wide: Vec<String> = (0..20_000).map(|i| format!("c{i}")).collect();
        let broken = SheetData {
            name: "Items".into(),
            headers: wide,
            rows: Vec::new(),
        };
        let err = write_workbook_atomic(&path, &[broken]).unwrap_err();
        assert!(matches!(err, IoError::Workbook { .. }), "got {err:?}");

        let table = read_sheet(&path, Some("Items")).unwrap();
        assert_eq!(table.headers, vec!["brand"]);
        assert_eq!(table.rows[0][0].as_text(), "Rimi");
        assert!(temp_files_in(dir.path()).is_empty());
    }
}
