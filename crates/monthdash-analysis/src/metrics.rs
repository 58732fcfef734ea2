//! Dashboard metrics: per brand, per month, per media type, computed from the
//! month folders for display. Nothing is written back.

use std::collections::BTreeMap;
use std::path::Path;

use monthdash_core::{AnalysisKind, BrandRegistry, Cluster, MediaType, YearMonth};
use monthdash_io::{read_sheet, DataLoader, FolderLayout, IoError, SheetTable};
use serde::Serialize;

use crate::error::AnalysisError;
use crate::report::{
    BRAND_STRENGTH_SHEET, COL_BRAND, COL_DOMINANT, COL_RANK, COL_SCORE, COL_STRENGTH,
    OVERALL_RANKING_SHEET,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandMetrics {
    pub period: String,
    pub media: MediaType,
    pub brand: String,
    pub cluster: Option<Cluster>,
    /// Items in the month's master data.
    pub items: usize,
    /// Summed reach of those items.
    pub reach: f64,
    pub brand_strength: Option<f64>,
    pub dominant_archetype: Option<String>,
    pub creativity_rank: Option<usize>,
    pub creativity_score: Option<f64>,
}

/// Which months, media types and clusters to include. Empty `clusters` means all.
#[derive(Debug, Clone)]
pub struct MetricsQuery {
    pub from: YearMonth,
    pub to: YearMonth,
    pub media: Vec<MediaType>,
    pub clusters: Vec<Cluster>,
}

type MetricsKey = (YearMonth, MediaType, String);

/// Collect metrics for every month in the query range that has a folder.
/// Months or files that do not exist contribute nothing.
///
/// # Errors
///
/// Returns [`AnalysisError::Io`] if an existing file cannot be read.
pub fn compute_metrics(
    layout: &FolderLayout,
    registry: &BrandRegistry,
    query: &MetricsQuery,
) -> Result<Vec<BrandMetrics>, AnalysisError> {
    let loader = DataLoader::new(registry);
    let mut rows: BTreeMap<MetricsKey, BrandMetrics> = BTreeMap::new();

    for period in YearMonth::range_inclusive(query.from, query.to) {
        if !layout.month_dir(period).is_dir() {
            tracing::debug!(period = %period, "no folder for month");
            continue;
        }
        for &media in &query.media {
            let master = layout.master_data_path(period, media);
            match loader.load_master(media, &master, period) {
                Ok(loaded) => {
                    for item in loaded.items {
                        let row = entry(&mut rows, registry, period, media, &item.brand);
                        row.items += 1;
                        row.reach += item.reach;
                    }
                }
                Err(IoError::MissingFile { .. }) => {}
                Err(e) => return Err(e.into()),
            }

            let compos = layout.output_path(period, media, AnalysisKind::Compos);
            if let Some(table) = optional_sheet(&compos, BRAND_STRENGTH_SHEET)? {
                read_strength(&table, &mut rows, registry, period, media);
            }
            let creativity = layout.output_path(period, media, AnalysisKind::Creativity);
            if let Some(table) = optional_sheet(&creativity, OVERALL_RANKING_SHEET)? {
                read_ranking(&table, &mut rows, registry, period, media);
            }
        }
    }

    Ok(rows
        .into_values()
        .filter(|m| registry.in_clusters(&m.brand, &query.clusters))
        .collect())
}

fn optional_sheet(path: &Path, sheet: &str) -> Result<Option<SheetTable>, IoError> {
    match read_sheet(path, Some(sheet)) {
        Ok(table) => Ok(Some(table)),
        Err(IoError::MissingFile { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn entry<'a>(
    rows: &'a mut BTreeMap<MetricsKey, BrandMetrics>,
    registry: &BrandRegistry,
    period: YearMonth,
    media: MediaType,
    raw_brand: &str,
) -> &'a mut BrandMetrics {
    let brand = registry.resolve(media, raw_brand);
    rows.entry((period, media, brand.clone()))
        .or_insert_with(|| BrandMetrics {
            period: period.to_string(),
            media,
            cluster: registry.cluster_of(&brand),
            brand,
            items: 0,
            reach: 0.0,
            brand_strength: None,
            dominant_archetype: None,
            creativity_rank: None,
            creativity_score: None,
        })
}

fn read_strength(
    table: &SheetTable,
    rows: &mut BTreeMap<MetricsKey, BrandMetrics>,
    registry: &BrandRegistry,
    period: YearMonth,
    media: MediaType,
) {
    let (Some(brand_col), Some(strength_col)) =
        (table.column_index(COL_BRAND), table.column_index(COL_STRENGTH))
    else {
        tracing::warn!(period = %period, media = %media, "brand strength sheet lacks expected columns");
        return;
    };
    let dominant_col = table.column_index(COL_DOMINANT);

    for r in 0..table.rows.len() {
        let brand = table.cell(r, brand_col).as_text();
        if brand.is_empty() {
            continue;
        }
        let row = entry(rows, registry, period, media, &brand);
        row.brand_strength = table.cell(r, strength_col).as_number();
        row.dominant_archetype = dominant_col
            .map(|c| table.cell(r, c).as_text())
            .filter(|s| !s.is_empty());
    }
}

fn read_ranking(
    table: &SheetTable,
    rows: &mut BTreeMap<MetricsKey, BrandMetrics>,
    registry: &BrandRegistry,
    period: YearMonth,
    media: MediaType,
) {
    let (Some(brand_col), Some(rank_col)) =
        (table.column_index(COL_BRAND), table.column_index(COL_RANK))
    else {
        tracing::warn!(period = %period, media = %media, "ranking sheet lacks expected columns");
        return;
    };
    let score_col = table.column_index(COL_SCORE);

    for r in 0..table.rows.len() {
        let brand = table.cell(r, brand_col).as_text();
        if brand.is_empty() {
            continue;
        }
        let row = entry(rows, registry, period, media, &brand);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rank = table
            .cell(r, rank_col)
            .as_number()
            .filter(|n| *n >= 1.0)
            .map(|n| n as usize);
        row.creativity_rank = rank;
        row.creativity_score = score_col.and_then(|c| table.cell(r, c).as_number());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use monthdash_core::{BrandConfig, BrandsFile};
    use monthdash_io::{update_master_data, write_workbook_atomic};

    use super::*;
    use crate::compos::{BrandArchetypeProfile, ComposReport};
    use crate::creativity::{CreativityReport, RankedBrand};
    use crate::grouping::fixtures::items_for;
    use crate::report::{compos_sheets, creativity_sheets};

    fn period() -> YearMonth {
        YearMonth::new(2025, 8).unwrap()
    }

    fn registry() -> BrandRegistry {
        let brand = |name: &str, cluster| BrandConfig {
            name: name.to_owned(),
            cluster,
            aliases: BTreeMap::new(),
        };
        BrandRegistry::new(&BrandsFile {
            brands: vec![
                brand("Rimi", Cluster::BigPlayer),
                brand("Ozas", Cluster::AkropolisLocation),
            ],
        })
    }

    fn seed(layout: &FolderLayout, registry: &BrandRegistry) {
        let mut items = items_for("Rimi", 3, 0);
        items.extend(items_for("Ozas", 2, 3));
        let loader = DataLoader::new(registry);
        let today = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        update_master_data(&loader, layout, period(), MediaType::Ads, items, today).unwrap();

        let compos = ComposReport {
            media: MediaType::Ads,
            items: Vec::new(),
            profiles: vec![BrandArchetypeProfile {
                brand: "Rimi".into(),
                counts: BTreeMap::from([("The Guardian".to_owned(), 3), ("The Expert".to_owned(), 1)]),
                unclassified: 0,
            }],
        };
        let path = layout.output_path(period(), MediaType::Ads, AnalysisKind::Compos);
        write_workbook_atomic(&path, &compos_sheets(&compos)).unwrap();

        let creativity = CreativityReport {
            media: MediaType::Ads,
            ranked: vec![RankedBrand {
                rank: 1,
                brand: "Ozas".into(),
                score: 8.5,
                justification: String::new(),
                examples: Vec::new(),
                eligible_items: 2,
                selected: Vec::new(),
            }],
            skipped: Vec::new(),
            failed: Vec::new(),
            fallback: false,
        };
        let path = layout.output_path(period(), MediaType::Ads, AnalysisKind::Creativity);
        write_workbook_atomic(&path, &creativity_sheets(&creativity)).unwrap();
    }

    fn query(clusters: Vec<Cluster>) -> MetricsQuery {
        MetricsQuery {
            from: YearMonth::new(2025, 7).unwrap(),
            to: period(),
            media: MediaType::ALL.to_vec(),
            clusters,
        }
    }

    #[test]
    fn combines_master_compos_and_creativity() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FolderLayout::new(dir.path());
        let registry = registry();
        seed(&layout, &registry);

        let metrics = compute_metrics(&layout, &registry, &query(Vec::new())).unwrap();
        assert_eq!(metrics.len(), 2);

        let ozas = &metrics[0];
        assert_eq!(ozas.brand, "Ozas");
        assert_eq!(ozas.period, "2025-08");
        assert_eq!(ozas.items, 2);
        assert!((ozas.reach - 300.0).abs() < 1e-9);
        assert_eq!(ozas.creativity_rank, Some(1));
        assert_eq!(ozas.creativity_score, Some(8.5));
        assert_eq!(ozas.cluster, Some(Cluster::AkropolisLocation));

        let rimi = &metrics[1];
        assert_eq!(rimi.items, 3);
        assert_eq!(rimi.brand_strength, Some(0.75));
        assert_eq!(rimi.dominant_archetype.as_deref(), Some("The Guardian"));
        assert_eq!(rimi.creativity_rank, None);
    }

    #[test]
    fn cluster_filter_limits_brands() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FolderLayout::new(dir.path());
        let registry = registry();
        seed(&layout, &registry);

        let metrics = compute_metrics(&layout, &registry, &query(vec![Cluster::BigPlayer])).unwrap();
        let brands: Vec<&str> = metrics.iter().map(|m| m.brand.as_str()).collect();
        assert_eq!(brands, vec!["Rimi"]);
    }

    #[test]
    fn empty_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FolderLayout::new(dir.path().join("missing"));
        let metrics = compute_metrics(&layout, &registry(), &query(Vec::new())).unwrap();
        assert!(metrics.is_empty());
    }
}
