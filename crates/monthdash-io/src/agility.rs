//! PR monitoring exports. When enabled, PR items come from every
//! `<new_data>/agility/*.xlsx` file's `Raw Data` sheet instead of the PR master
//! file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use monthdash_core::{MediaType, YearMonth};

use crate::error::IoError;
use crate::loader::{DataLoader, LoadedMonth};
use crate::table::{read_sheet, Cell, SheetTable};

pub const AGILITY_DIR: &str = "agility";
pub const RAW_DATA_SHEET: &str = "Raw Data";
/// Column added to merged rows naming the export they came from.
pub const SOURCE_FILE_COLUMN: &str = "source_file";

#[must_use]
pub fn agility_dir(new_data_dir: &Path) -> PathBuf {
    new_data_dir.join(AGILITY_DIR)
}

/// `.xlsx` exports in `dir`, by file name, without Office lock files (`~$...`).
///
/// # Errors
///
/// Returns [`IoError::MissingFile`] if `dir` does not exist and [`IoError::Fs`]
/// if it cannot be listed.
pub fn agility_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IoError::MissingFile {
                path: dir.display().to_string(),
            })
        }
        Err(e) => {
            return Err(IoError::Fs {
                path: dir.display().to_string(),
                source: e,
            })
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.ends_with(".xlsx") && !name.starts_with("~$")
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    Ok(files)
}

/// Concatenate the `Raw Data` sheets of every export in `dir`.
///
/// Columns are the union of all headers in first-seen order, plus
/// [`SOURCE_FILE_COLUMN`]. Files without a readable `Raw Data` sheet are
/// skipped with a warning. Rows repeating an earlier row's PR text are dropped.
///
/// # Errors
///
/// Returns [`IoError::MissingFile`] when there are no exports and
/// [`IoError::EmptySheet`] when none of them has usable data.
pub fn merge_agility_exports(dir: &Path) -> Result<SheetTable, IoError> {
    let files = agility_files(dir)?;
    if files.is_empty() {
        return Err(IoError::MissingFile {
            path: dir.join("*.xlsx").display().to_string(),
        });
    }

    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Vec<(usize, Cell)>> = Vec::new();
    let mut used_files = 0;

    for path in &files {
        let table = match read_sheet(path, Some(RAW_DATA_SHEET)) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "agility export skipped");
                continue;
            }
        };
        if table.rows.is_empty() {
            tracing::warn!(path = %path.display(), "agility export has no rows");
            continue;
        }
        used_files += 1;

        let mut column_of = |name: &str| -> usize {
            let name = name.trim().to_owned();
            *positions.entry(name.clone()).or_insert_with(|| {
                headers.push(name);
                headers.len() - 1
            })
        };
        let mapping: Vec<usize> = table.headers.iter().map(|h| column_of(h)).collect();
        let source_col = column_of(SOURCE_FILE_COLUMN);
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::info!(path = %path.display(), rows = table.rows.len(), "agility export read");
        for row in table.rows {
            let mut cells: Vec<(usize, Cell)> = mapping.iter().copied().zip(row).collect();
            cells.push((source_col, Cell::text(source_name.clone())));
            merged.push(cells);
        }
    }

    if used_files == 0 {
        return Err(IoError::EmptySheet {
            path: dir.display().to_string(),
        });
    }

    let width = headers.len();
    let text_col = positions.get(MediaType::Pr.schema().text_column).copied();
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mut rows = Vec::with_capacity(merged.len());
    for cells in merged {
        let mut row = vec![Cell::Empty; width];
        for (col, cell) in cells {
            row[col] = cell;
        }
        if let Some(col) = text_col {
            let key = row[col].as_text();
            if !key.is_empty() && !seen.insert(key) {
                duplicates += 1;
                continue;
            }
        }
        rows.push(row);
    }

    tracing::info!(
        dir = %dir.display(),
        files = used_files,
        rows = rows.len(),
        duplicates,
        "agility exports merged"
    );
    Ok(SheetTable { headers, rows })
}

impl DataLoader<'_> {
    /// Load PR items for `period` from the merged agility exports under
    /// `new_data_dir`, with the same validation, month filter and cleaning as
    /// [`DataLoader::load_month`].
    ///
    /// # Errors
    ///
    /// See [`merge_agility_exports`] and [`DataLoader::load_table`].
    pub fn load_agility(
        &self,
        new_data_dir: &Path,
        period: YearMonth,
    ) -> Result<LoadedMonth, IoError> {
        let dir = agility_dir(new_data_dir);
        let table = merge_agility_exports(&dir)?;
        let loaded = self.load_table(MediaType::Pr, &table, period, &dir)?;
        tracing::info!(
            period = %period,
            dir = %dir.display(),
            rows = loaded.stats.rows_read,
            kept = loaded.stats.kept,
            out_of_period = loaded.stats.out_of_period,
            "loaded PR input from agility exports"
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use monthdash_core::BrandRegistry;

    use super::*;
    use crate::writer::{write_workbook_atomic, SheetData};

    fn aug() -> YearMonth {
        YearMonth::new(2025, 8).unwrap()
    }

    fn export(dir: &Path, name: &str, sheet: &str, headers: &[&str], rows: Vec<Vec<Cell>>) {
        let mut data = SheetData::new(sheet, headers);
        for row in rows {
            data.push_row(row);
        }
        write_workbook_atomic(&dir.join(name), &[data]).unwrap();
    }

    fn row(company: &str, content: &str, reach: f64, date: &str) -> Vec<Cell> {
        vec![
            Cell::text(company),
            Cell::text(content),
            Cell::Number(reach),
            Cell::text(date),
        ]
    }

    #[test]
    fn merges_raw_data_sheets_and_drops_repeated_content() {
        let data = tempfile::tempdir().unwrap();
        let dir = agility_dir(data.path());
        export(
            &dir,
            "a_week1.xlsx",
            RAW_DATA_SHEET,
            &["company", "content", "Impressions", "date"],
            vec![
                row("Ozas", "Ozas opens a new wing", 100.0, "2025-08-02"),
                row("Akropolis", "Akropolis hosts a fair", 50.0, "2025-08-03"),
            ],
        );
        // Different column order, one repeated article, one extra column.
        export(
            &dir,
            "b_week2.xlsx",
            RAW_DATA_SHEET,
            &["content", "company", "date", "Impressions", "url"],
            vec![
                vec![
                    Cell::text("Ozas opens a new wing"),
                    Cell::text("Ozas"),
                    Cell::text("2025-08-05"),
                    Cell::Number(900.0),
                    Cell::text("https://news/1"),
                ],
                vec![
                    Cell::text("Panorama renovates parking"),
                    Cell::text("Panorama"),
                    Cell::text("2025-08-06"),
                    Cell::Number(70.0),
                    Cell::text("https://news/2"),
                ],
            ],
        );
        export(&dir, "c_summary.xlsx", "Summary", &["content", "company"], Vec::new());
        std::fs::write(dir.join("~$a_week1.xlsx"), b"lock").unwrap();
        std::fs::write(dir.join("notes.csv"), b"x").unwrap();

        let table = merge_agility_exports(&dir).unwrap();
        assert_eq!(
            table.headers,
            vec!["company", "content", "Impressions", "date", SOURCE_FILE_COLUMN, "url"]
        );
        assert_eq!(table.rows.len(), 3);
        let content = table.column_index("content").unwrap();
        let source = table.column_index(SOURCE_FILE_COLUMN).unwrap();
        assert_eq!(table.cell(0, content).as_text(), "Ozas opens a new wing");
        assert_eq!(table.cell(0, source).as_text(), "a_week1.xlsx");
        assert_eq!(table.cell(2, content).as_text(), "Panorama renovates parking");
        assert_eq!(table.cell(2, source).as_text(), "b_week2.xlsx");
        assert_eq!(table.cell(0, table.column_index("url").unwrap()), &Cell::Empty);
    }

    #[test]
    fn load_agility_filters_month_and_validates_columns() {
        let data = tempfile::tempdir().unwrap();
        let dir = agility_dir(data.path());
        export(
            &dir,
            "export.xlsx",
            RAW_DATA_SHEET,
            &["company", "content", "Impressions", "date"],
            vec![
                row("Ozas", "August story", 10.0, "2025-08-15"),
                row("Ozas", "July story", 10.0, "2025-07-30"),
            ],
        );

        let registry = BrandRegistry::default();
        let loaded = DataLoader::new(&registry).load_agility(data.path(), aug()).unwrap();
        assert_eq!(loaded.media, MediaType::Pr);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].text, "August story");
        assert_eq!(loaded.stats.out_of_period, 1);
    }

    #[test]
    fn missing_directory_or_exports_is_a_validation_error() {
        let data = tempfile::tempdir().unwrap();
        let registry = BrandRegistry::default();
        let loader = DataLoader::new(&registry);

        let err = loader.load_agility(data.path(), aug()).unwrap_err();
        assert!(matches!(err, IoError::MissingFile { .. }), "got {err:?}");

        let dir = agility_dir(data.path());
        std::fs::create_dir_all(&dir).unwrap();
        let err = loader.load_agility(data.path(), aug()).unwrap_err();
        assert!(matches!(err, IoError::MissingFile { .. }), "got {err:?}");

        export(&dir, "wrong.xlsx", "Sheet1", &["content"], Vec::new());
        let err = loader.load_agility(data.path(), aug()).unwrap_err();
        assert!(matches!(err, IoError::EmptySheet { .. }), "got {err:?}");
        assert!(err.is_data_validation());
    }

    #[test]
    fn export_without_pr_columns_is_rejected() {
        let data = tempfile::tempdir().unwrap();
        let dir = agility_dir(data.path());
        export(
            &dir,
            "export.xlsx",
            RAW_DATA_SHEET,
            &["headline", "outlet"],
            vec![vec![Cell::text("Story"), Cell::text("LRT")]],
        );
        let registry = BrandRegistry::default();
        let err = DataLoader::new(&registry)
            .load_agility(data.path(), aug())
            .unwrap_err();
        assert!(matches!(err, IoError::MissingColumns { .. }), "got {err:?}");
    }
}
