//! Monthly master data: the cleaned, month-filtered rows of one media type,
//! persisted under the month folder so later runs can skip ingestion.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use monthdash_core::{MediaType, YearMonth};

use crate::error::IoError;
use crate::folders::FolderLayout;
use crate::item::ContentItem;
use crate::loader::DataLoader;
use crate::table::Cell;
use crate::writer::{write_workbook_atomic, SheetData};

pub const MASTER_SHEET: &str = "Master Data";

/// Outcome of a master-data update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterUpdate {
    pub path: PathBuf,
    /// Rows in the file after the merge.
    pub total: usize,
    /// Rows present before the merge.
    pub previous: usize,
}

/// Merge `incoming` into `existing`, de-duplicating on item text. A later row
/// replaces an earlier one with the same text in place. Positions are renumbered.
#[must_use]
pub fn merge_items(existing: Vec<ContentItem>, incoming: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut merged: Vec<ContentItem> = Vec::with_capacity(existing.len() + incoming.len());
    let mut by_text: HashMap<String, usize> = HashMap::new();

    for item in existing.into_iter().chain(incoming) {
        match by_text.get(&item.text) {
            Some(&idx) => merged[idx] = item,
            None => {
                by_text.insert(item.text.clone(), merged.len());
                merged.push(item);
            }
        }
    }
    for (position, item) in merged.iter_mut().enumerate() {
        item.position = position;
    }
    merged
}

/// Build the master-data sheet. Columns use the media schema's names so the file
/// reads back through [`DataLoader::load_master`].
#[must_use]
pub fn master_sheet(
    media: MediaType,
    period: YearMonth,
    items: &[ContentItem],
    analysis_date: NaiveDate,
) -> SheetData {
    let schema = media.schema();
    let date_column = schema.date_columns.first().copied().unwrap_or("date");
    let mut sheet = SheetData::new(
        MASTER_SHEET,
        &[
            schema.id_column,
            schema.brand_column,
            schema.text_column,
            schema.reach_column,
            date_column,
            "year",
            "month",
            "analysis_date",
        ],
    );
    let analysis_date = analysis_date.format("%Y-%m-%d").to_string();
    for item in items {
        sheet.push_row(vec![
            Cell::text(item.source_id.clone()),
            Cell::text(item.brand.clone()),
            Cell::text(item.text.clone()),
            Cell::Number(item.reach),
            item.published
                .map_or(Cell::Empty, |d| Cell::text(d.format("%Y-%m-%d").to_string())),
            Cell::Number(f64::from(period.year())),
            Cell::Number(f64::from(period.month())),
            Cell::text(analysis_date.clone()),
        ]);
    }
    sheet
}

/// Read the month's master data for `media`.
///
/// # Errors
///
/// Returns [`IoError::MissingFile`] when ingestion has not run for this month.
pub fn read_master_data(
    loader: &DataLoader<'_>,
    layout: &FolderLayout,
    period: YearMonth,
    media: MediaType,
) -> Result<Vec<ContentItem>, IoError> {
    let path = layout.master_data_path(period, media);
    Ok(loader.load_master(media, &path, period)?.items)
}

/// Merge `incoming` into the month's master data and rewrite it atomically.
///
/// # Errors
///
/// Returns [`IoError`] if the existing file is unreadable or the write fails.
pub fn update_master_data(
    loader: &DataLoader<'_>,
    layout: &FolderLayout,
    period: YearMonth,
    media: MediaType,
    incoming: Vec<ContentItem>,
    analysis_date: NaiveDate,
) -> Result<MasterUpdate, IoError> {
    let path = layout.master_data_path(period, media);
    let existing = if path.is_file() {
        loader.load_master(media, &path, period)?.items
    } else {
        Vec::new()
    };
    let previous = existing.len();
    let merged = merge_items(existing, incoming);

    write_workbook_atomic(&path, &[master_sheet(media, period, &merged, analysis_date)])?;
    tracing::info!(
        media = %media,
        period = %period,
        path = %path.display(),
        previous,
        total = merged.len(),
        "master data updated"
    );

    Ok(MasterUpdate {
        path,
        total: merged.len(),
        previous,
    })
}

#[cfg(test)]
mod tests {
    use monthdash_core::BrandRegistry;

    use super::*;

    fn item(text: &str, brand: &str, reach: f64) -> ContentItem {
        ContentItem {
            media: MediaType::SocialMedia,
            source_id: format!("id-{text}"),
            raw_brand: brand.to_string(),
            brand: brand.to_string(),
            text: text.to_string(),
            reach,
            published: NaiveDate::from_ymd_opt(2025, 8, 12),
            position: 0,
        }
    }

    #[test]
    fn merge_dedups_by_text_with_last_winning() {
        let merged = merge_items(
            vec![item("a", "Ozas", 1.0), item("b", "Ozas", 2.0)],
            vec![item("b", "Ozas", 20.0), item("c", "Rimi", 3.0)],
        );
        let texts: Vec<&str> = merged.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert!((merged[1].reach - 20.0).abs() < f64::EPSILON);
        let positions: Vec<usize> = merged.iter().map(|i| i.position).collect();
        assert_eq!(positions, [0, 1, 2]);
    }

    #[test]
    fn update_then_read_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FolderLayout::new(dir.path());
        let registry = BrandRegistry::default();
        let loader = DataLoader::new(&registry);
        let period = YearMonth::new(2025, 8).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();

        let first = update_master_data(
            &loader,
            &layout,
            period,
            MediaType::SocialMedia,
            vec![item("hello", "Ozas", 5.0)],
            today,
        )
        .unwrap();
        assert_eq!(first.previous, 0);
        assert_eq!(first.total, 1);

        let second = update_master_data(
            &loader,
            &layout,
            period,
            MediaType::SocialMedia,
            vec![item("hello", "Ozas", 7.0), item("world", "Rimi", 1.0)],
            today,
        )
        .unwrap();
        assert_eq!(second.previous, 1);
        assert_eq!(second.total, 2);

        let items = read_master_data(&loader, &layout, period, MediaType::SocialMedia).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_id, "id-hello");
        assert!((items[0].reach - 7.0).abs() < f64::EPSILON);
        assert_eq!(items[1].brand, "Rimi");
        assert_eq!(items[1].published, NaiveDate::from_ymd_opt(2025, 8, 12));
    }

    #[test]
    fn reading_without_ingestion_is_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FolderLayout::new(dir.path());
        let registry = BrandRegistry::default();
        let loader = DataLoader::new(&registry);
        let period = YearMonth::new(2025, 8).unwrap();
        let err = read_master_data(&loader, &layout, period, MediaType::Pr).unwrap_err();
        assert!(matches!(err, IoError::MissingFile { .. }));
    }
}
