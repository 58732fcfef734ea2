//! Data Loader: reads a media type's spreadsheet, validates its columns, filters
//! rows to the target month, cleans them, and normalizes brand names.

use std::path::Path;

use monthdash_core::{BrandRegistry, MediaType, YearMonth};

use crate::dates;
use crate::error::IoError;
use crate::item::{content_id, ContentItem};
use crate::table::{read_first_sheet, SheetTable};

/// Row accounting for one load. `kept` equals the number of returned items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows_read: usize,
    pub out_of_period: usize,
    /// Rows dropped because none of their date cells could be parsed.
    pub undated_excluded: usize,
    /// True when the sheet has no candidate date column, so no month filter applied.
    pub unfiltered: bool,
    pub empty_text: usize,
    pub empty_brand: usize,
    pub invalid_reach: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedMonth {
    pub media: MediaType,
    pub period: YearMonth,
    pub items: Vec<ContentItem>,
    pub stats: LoadStats,
}

struct Columns {
    text: usize,
    brand: usize,
    reach: usize,
    id: Option<usize>,
    dates: Vec<usize>,
}

pub struct DataLoader<'a> {
    registry: &'a BrandRegistry,
}

impl<'a> DataLoader<'a> {
    #[must_use]
    pub fn new(registry: &'a BrandRegistry) -> Self {
        Self { registry }
    }

    /// Load `media` items for `period` from the spreadsheet at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingFile`] or [`IoError::MissingColumns`] when the input
    /// is unusable, and [`IoError::Spreadsheet`] when it cannot be parsed.
    pub fn load_month(
        &self,
        media: MediaType,
        path: &Path,
        period: YearMonth,
    ) -> Result<LoadedMonth, IoError> {
        let table = read_first_sheet(path)?;
        let loaded = self.load_table(media, &table, period, path)?;

        let s = &loaded.stats;
        tracing::info!(
            media = %media,
            period = %period,
            path = %path.display(),
            rows = s.rows_read,
            kept = s.kept,
            out_of_period = s.out_of_period,
            undated = s.undated_excluded,
            empty_text = s.empty_text,
            empty_brand = s.empty_brand,
            invalid_reach = s.invalid_reach,
            "loaded input"
        );
        if s.unfiltered {
            tracing::warn!(
                media = %media,
                path = %path.display(),
                "no date column present; all rows included without month filtering"
            );
        }

        Ok(loaded)
    }

    /// Load a month's persisted master data. Rows were filtered at ingestion, so
    /// no date filter is applied; cleaning and brand resolution still are.
    ///
    /// # Errors
    ///
    /// Same as [`DataLoader::load_month`].
    pub fn load_master(
        &self,
        media: MediaType,
        path: &Path,
        period: YearMonth,
    ) -> Result<LoadedMonth, IoError> {
        let table = read_first_sheet(path)?;
        let loaded = self.collect(media, &table, period, path, false)?;
        tracing::info!(
            media = %media,
            period = %period,
            path = %path.display(),
            kept = loaded.stats.kept,
            "loaded master data"
        );
        Ok(loaded)
    }

    /// Same as [`DataLoader::load_month`] over an already-read table.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingColumns`] when a required column is absent.
    pub fn load_table(
        &self,
        media: MediaType,
        table: &SheetTable,
        period: YearMonth,
        path: &Path,
    ) -> Result<LoadedMonth, IoError> {
        self.collect(media, table, period, path, true)
    }

    fn collect(
        &self,
        media: MediaType,
        table: &SheetTable,
        period: YearMonth,
        path: &Path,
        filter_by_date: bool,
    ) -> Result<LoadedMonth, IoError> {
        let columns = resolve_columns(media, table, path)?;
        let mut stats = LoadStats {
            rows_read: table.rows.len(),
            unfiltered: columns.dates.is_empty(),
            ..LoadStats::default()
        };
        let mut items = Vec::new();

        for row in 0..table.rows.len() {
            let published = dates::first_date(columns.dates.iter().map(|&c| table.cell(row, c)));
            if filter_by_date && !stats.unfiltered {
                match published {
                    None => {
                        stats.undated_excluded += 1;
                        continue;
                    }
                    Some(date) if !period.contains(date) => {
                        stats.out_of_period += 1;
                        continue;
                    }
                    Some(_) => {}
                }
            }

            let text = table.cell(row, columns.text).as_text();
            if text.is_empty() {
                stats.empty_text += 1;
                continue;
            }
            let raw_brand = table.cell(row, columns.brand).as_text();
            if raw_brand.is_empty() {
                stats.empty_brand += 1;
                continue;
            }
            let Some(reach) = table.cell(row, columns.reach).as_number() else {
                stats.invalid_reach += 1;
                continue;
            };

            let brand = self.registry.resolve(media, &raw_brand);
            let source_id = columns
                .id
                .map(|c| table.cell(row, c).as_text())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| content_id(media, &brand, &text));

            items.push(ContentItem {
                media,
                source_id,
                raw_brand,
                brand,
                text,
                reach,
                published,
                position: items.len(),
            });
        }

        stats.kept = items.len();
        Ok(LoadedMonth {
            media,
            period,
            items,
            stats,
        })
    }
}

fn resolve_columns(media: MediaType, table: &SheetTable, path: &Path) -> Result<Columns, IoError> {
    let schema = media.schema();
    let missing: Vec<String> = schema
        .required_columns()
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| (*c).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IoError::MissingColumns {
            media: media.to_string(),
            path: path.display().to_string(),
            columns: missing,
        });
    }

    // Required columns were checked above.
    let index = |name: &str| table.column_index(name).unwrap_or_default();
    Ok(Columns {
        text: index(schema.text_column),
        brand: index(schema.brand_column),
        reach: index(schema.reach_column),
        id: table.column_index(schema.id_column),
        dates: schema
            .date_columns
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect(),
    })
}
