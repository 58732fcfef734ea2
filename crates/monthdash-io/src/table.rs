//! In-memory spreadsheet tables read through calamine.

use std::path::Path;

use calamine::{open_workbook_auto, DataType, Reader};

use crate::error::IoError;

/// A single spreadsheet cell, reduced to the shapes the pipeline cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel date serial (days since 1899-12-30).
    DateSerial(f64),
}

impl Cell {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Trimmed textual rendering; numbers without a fractional part print as integers.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) | Cell::DateSerial(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
        }
    }

    /// Numeric value, parsing text such as `"1 234"` or `"1,5"` when needed.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| !c.is_whitespace()).collect();
                if cleaned.is_empty() {
                    return None;
                }
                let normalized = if is_thousands_grouped(&cleaned) {
                    cleaned.replace(',', "")
                } else {
                    cleaned.replace(',', ".")
                };
                normalized.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            Cell::Empty | Cell::Bool(_) | Cell::DateSerial(_) => None,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// `1,234` or `12,345,678`: comma-separated groups of three digits.
fn is_thousands_grouped(s: &str) -> bool {
    let mut groups = s.split(',');
    let head_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.chars().all(|c| c.is_ascii_digit()));
    let mut rest = groups.peekable();
    head_ok
        && rest.peek().is_some()
        && rest.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&DataType> for Cell {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: &DataType) -> Self {
        match value {
            DataType::Int(i) => Cell::Number(*i as f64),
            DataType::Float(f) => Cell::Number(*f),
            DataType::String(s) | DataType::DateTimeIso(s) | DataType::DurationIso(s) => {
                Cell::Text(s.clone())
            }
            DataType::Bool(b) => Cell::Bool(*b),
            DataType::DateTime(f) => Cell::DateSerial(*f),
            DataType::Duration(f) => Cell::Number(*f),
            DataType::Error(_) | DataType::Empty => Cell::Empty,
        }
    }
}

/// Header row plus data rows of one worksheet. Rows are padded to the header width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    /// Position of the column named `name` (exact match after trimming).
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `(row, col)`, `Cell::Empty` when out of range.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

/// Read the first worksheet of the workbook at `path`.
///
/// # Errors
///
/// Returns [`IoError::MissingFile`] if `path` does not exist, [`IoError::EmptySheet`]
/// if the sheet has no header row, and [`IoError::Spreadsheet`] for unreadable files.
pub fn read_first_sheet(path: &Path) -> Result<SheetTable, IoError> {
    read_sheet(path, None)
}

/// Read the worksheet named `sheet` (or the first one when `None`).
///
/// # Errors
///
/// See [`read_first_sheet`]; a missing named sheet is an [`IoError::Spreadsheet`].
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<SheetTable, IoError> {
    let display = path.display().to_string();
    if !path.is_file() {
        return Err(IoError::MissingFile { path: display });
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| IoError::Spreadsheet {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IoError::EmptySheet {
                path: display.clone(),
            })?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| IoError::Spreadsheet {
            path: display.clone(),
            reason: format!("worksheet '{sheet_name}' not found"),
        })?
        .map_err(|e| IoError::Spreadsheet {
            path: display.clone(),
            reason: e.to_string(),
        })?;

    let mut rows_iter = range.rows();
    let header_row = rows_iter
        .next()
        .ok_or_else(|| IoError::EmptySheet { path: display })?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| Cell::from(c).as_text())
        .collect();

    let width = headers.len();
    let rows = rows_iter
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().map(Cell::from).collect();
            cells.resize(width, Cell::Empty);
            cells
        })
        .filter(|cells| !cells.iter().all(Cell::is_blank))
        .collect();

    Ok(SheetTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_text_parsing_accepts_spaces_and_decimal_comma() {
        assert_eq!(Cell::text("1 234").as_number(), Some(1234.0));
        assert_eq!(Cell::text("2,5").as_number(), Some(2.5));
        assert_eq!(Cell::text("12,345").as_number(), Some(12345.0));
        assert_eq!(Cell::text("n/a").as_number(), None);
        assert_eq!(Cell::text("  ").as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(1_234_567_890.0).as_text(), "1234567890");
        assert_eq!(Cell::Number(2.5).as_text(), "2.5");
    }

    #[test]
    fn blank_detection() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::text(" \n").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn column_lookup_trims_headers() {
        let table = SheetTable {
            headers: vec![" content ".into(), "brand".into()],
            rows: vec![],
        };
        assert_eq!(table.column_index("content"), Some(0));
        assert!(!table.has_column("company"));
        assert_eq!(table.cell(5, 0), &Cell::Empty);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_first_sheet(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, IoError::MissingFile { .. }));
    }
}
