//! Conversion of analysis reports into output workbooks.
//!
//! Sheet and column names here are also what [`crate::metrics`] reads back.

use std::collections::HashSet;
use std::path::PathBuf;

use monthdash_core::{AnalysisKind, MediaType};
use monthdash_io::{sanitize_sheet_name, Cell, SheetData};

use crate::advantages::AdvantagesReport;
use crate::affinity::{score_columns, AffinityReport, PERSONAS};
use crate::archetype::ARCHETYPES;
use crate::compos::ComposReport;
use crate::creativity::CreativityReport;
use crate::grouping::{FailedBrand, SkippedBrand};
use crate::pillars::PillarsReport;

pub const ITEMS_SHEET: &str = "Items";
pub const BRAND_STRENGTH_SHEET: &str = "Brand Strength";
pub const OVERALL_RANKING_SHEET: &str = "Overall Ranking";
pub const SUMMARY_SHEET: &str = "Summary";
pub const PILLARS_SHEET: &str = "Pillars";
pub const SKIPPED_SHEET: &str = "Skipped Brands";
pub const FAILED_SHEET: &str = "Failed Brands";
pub const POSTS_SHEET: &str = "Individual Posts";

pub const COL_BRAND: &str = "Brand";
pub const COL_STRENGTH: &str = "Brand Strength";
pub const COL_DOMINANT: &str = "Dominant Archetype";
pub const COL_RANK: &str = "Rank";
pub const COL_SCORE: &str = "Originality Score";
pub const COL_TOP_ARCHETYPE: &str = "Top Archetype";

/// The result of one analysis over one media type.
#[derive(Debug, Clone)]
pub enum AnalysisReport {
    Compos(ComposReport),
    Creativity(CreativityReport),
    KeyAdvantages(AdvantagesReport),
    ContentPillars(PillarsReport),
    AudienceAffinity(AffinityReport),
}

impl AnalysisReport {
    #[must_use]
    pub fn kind(&self) -> AnalysisKind {
        match self {
            AnalysisReport::Compos(_) => AnalysisKind::Compos,
            AnalysisReport::Creativity(_) => AnalysisKind::Creativity,
            AnalysisReport::KeyAdvantages(_) => AnalysisKind::KeyAdvantages,
            AnalysisReport::ContentPillars(_) => AnalysisKind::ContentPillars,
            AnalysisReport::AudienceAffinity(_) => AnalysisKind::AudienceAffinity,
        }
    }

    #[must_use]
    pub fn media(&self) -> MediaType {
        match self {
            AnalysisReport::Compos(r) => r.media,
            AnalysisReport::Creativity(r) => r.media,
            AnalysisReport::KeyAdvantages(r) => r.media,
            AnalysisReport::ContentPillars(r) => r.media,
            AnalysisReport::AudienceAffinity(r) => r.media,
        }
    }

    /// Brands excluded by the minimum-sample threshold.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedBrand] {
        match self {
            AnalysisReport::Compos(_) => &[],
            AnalysisReport::Creativity(r) => &r.skipped,
            AnalysisReport::KeyAdvantages(r) => &r.skipped,
            AnalysisReport::ContentPillars(r) => &r.skipped,
            AnalysisReport::AudienceAffinity(r) => &r.skipped,
        }
    }

    /// Brands whose requests failed after retries.
    #[must_use]
    pub fn failed_brands(&self) -> &[FailedBrand] {
        match self {
            AnalysisReport::Compos(_)
            | AnalysisReport::KeyAdvantages(_)
            | AnalysisReport::AudienceAffinity(_) => &[],
            AnalysisReport::Creativity(r) => &r.failed,
            AnalysisReport::ContentPillars(r) => &r.failed,
        }
    }

    /// Items whose requests failed after retries.
    #[must_use]
    pub fn failed_items(&self) -> usize {
        match self {
            AnalysisReport::Compos(r) => r.failed_items().count(),
            AnalysisReport::KeyAdvantages(r) => r.failed_items(),
            AnalysisReport::AudienceAffinity(r) => r.failed_items(),
            AnalysisReport::Creativity(_) | AnalysisReport::ContentPillars(_) => 0,
        }
    }

    /// Whether the creativity ranking fell back to alphabetical order.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        matches!(self, AnalysisReport::Creativity(r) if r.fallback)
    }

    #[must_use]
    pub fn sheets(&self) -> Vec<SheetData> {
        match self {
            AnalysisReport::Compos(r) => compos_sheets(r),
            AnalysisReport::Creativity(r) => creativity_sheets(r),
            AnalysisReport::KeyAdvantages(r) => advantages_sheets(r),
            AnalysisReport::ContentPillars(r) => pillars_sheets(r),
            AnalysisReport::AudienceAffinity(r) => affinity_sheets(r),
        }
    }
}

/// Where an analysis artifact was written, plus what it left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub skipped_brands: Vec<String>,
    pub failed_brands: Vec<String>,
    pub failed_items: usize,
    pub fallback: bool,
}

fn text(value: impl Into<String>) -> Cell {
    Cell::text(value)
}

#[allow(clippy::cast_precision_loss)]
fn count(value: usize) -> Cell {
    Cell::Number(value as f64)
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[must_use]
pub fn skipped_sheet(skipped: &[SkippedBrand]) -> SheetData {
    let mut sheet = SheetData::new(SKIPPED_SHEET, &[COL_BRAND, "Items", "Minimum Required"]);
    for s in skipped {
        sheet.push_row(vec![text(s.brand.clone()), count(s.item_count), count(s.threshold)]);
    }
    sheet
}

/// Sheet names for per-brand sheets that never take one of the `reserved` names.
fn brand_sheet_names<'a>(
    brands: impl Iterator<Item = &'a str>,
    reserved: &[&str],
) -> Vec<String> {
    let mut used: HashSet<String> = reserved.iter().map(|r| r.to_lowercase()).collect();
    brands.map(|b| sanitize_sheet_name(b, &mut used)).collect()
}

fn failed_sheet(failed: &[FailedBrand]) -> SheetData {
    let mut sheet = SheetData::new(FAILED_SHEET, &[COL_BRAND, "Reason"]);
    for f in failed {
        sheet.push_row(vec![text(f.brand.clone()), text(f.reason.clone())]);
    }
    sheet
}

#[must_use]
pub fn compos_sheets(report: &ComposReport) -> Vec<SheetData> {
    let schema = report.media.schema();
    let mut items = SheetData::new(
        ITEMS_SHEET,
        &[schema.id_column, COL_BRAND, schema.reach_column, "Text", COL_TOP_ARCHETYPE],
    );
    for c in &report.items {
        items.push_row(vec![
            text(c.item.source_id.clone()),
            text(c.item.brand.clone()),
            Cell::Number(c.item.reach),
            text(c.item.text.clone()),
            text(c.outcome.label()),
        ]);
    }

    let mut headers = vec![COL_BRAND, "Classified", "Unclassified", COL_DOMINANT, COL_STRENGTH];
    headers.extend(ARCHETYPES.iter().map(|(label, _)| *label));
    let mut strength = SheetData::new(BRAND_STRENGTH_SHEET, &headers);
    for p in &report.profiles {
        let dominant = p.dominant();
        let mut row = vec![
            text(p.brand.clone()),
            count(p.classified()),
            count(p.unclassified),
            dominant.map_or(Cell::Empty, |(label, _)| text(label)),
            p.strength().map_or(Cell::Empty, |s| Cell::Number(round(s, 4))),
        ];
        row.extend(
            ARCHETYPES
                .iter()
                .map(|(label, _)| count(p.counts.get(*label).copied().unwrap_or(0))),
        );
        strength.push_row(row);
    }

    vec![items, strength]
}

#[must_use]
pub fn creativity_sheets(report: &CreativityReport) -> Vec<SheetData> {
    let mut overall = SheetData::new(
        OVERALL_RANKING_SHEET,
        &[COL_RANK, COL_BRAND, COL_SCORE, "Justification", "Examples", "Eligible Items", "Selected"],
    );
    for r in &report.ranked {
        overall.push_row(vec![
            count(r.rank),
            text(r.brand.clone()),
            Cell::Number(round(r.score, 2)),
            text(r.justification.clone()),
            text(r.examples.join(" | ")),
            count(r.eligible_items),
            count(r.selected.len()),
        ]);
    }

    let schema = report.media.schema();
    let names = brand_sheet_names(
        report.ranked.iter().map(|r| r.brand.as_str()),
        &[OVERALL_RANKING_SHEET, SKIPPED_SHEET, FAILED_SHEET],
    );
    let mut sheets = vec![overall];
    for (r, name) in report.ranked.iter().zip(names) {
        let mut sheet = SheetData::new(
            name,
            &["Pick", schema.id_column, schema.reach_column, "Title", "Reason", "Themes", "Text"],
        );
        for (i, s) in r.selected.iter().enumerate() {
            sheet.push_row(vec![
                count(i + 1),
                text(s.item.source_id.clone()),
                Cell::Number(s.item.reach),
                s.title.clone().map_or(Cell::Empty, Cell::text),
                text(s.reason.clone()),
                text(s.themes.join(", ")),
                text(s.item.text.clone()),
            ]);
        }
        sheets.push(sheet);
    }

    sheets.push(skipped_sheet(&report.skipped));
    if !report.failed.is_empty() {
        sheets.push(failed_sheet(&report.failed));
    }
    sheets
}

#[must_use]
pub fn advantages_sheets(report: &AdvantagesReport) -> Vec<SheetData> {
    let mut summary = SheetData::new(SUMMARY_SHEET, &["Category", COL_BRAND, "Evidence Count"]);
    for b in &report.brands {
        for c in &b.categories {
            summary.push_row(vec![
                text(c.category.clone()),
                text(b.brand.clone()),
                count(c.evidence.len()),
            ]);
        }
    }

    let names = brand_sheet_names(
        report.brands.iter().map(|b| b.brand.as_str()),
        &[SUMMARY_SHEET, SKIPPED_SHEET],
    );
    let mut sheets = vec![summary];
    for (b, name) in report.brands.iter().zip(names) {
        let mut sheet = SheetData::new(name, &["Category", "Evidence", "Source ID"]);
        for c in &b.categories {
            for e in &c.evidence {
                sheet.push_row(vec![
                    text(c.category.clone()),
                    text(e.quote.clone()),
                    text(e.source_id.clone()),
                ]);
            }
        }
        sheets.push(sheet);
    }
    sheets.push(skipped_sheet(&report.skipped));
    sheets
}

#[must_use]
pub fn pillars_sheets(report: &PillarsReport) -> Vec<SheetData> {
    let mut pillars = SheetData::new(
        PILLARS_SHEET,
        &[COL_BRAND, "Theme", "Description", "Share (%)", "Posts", "Subtopics", "Examples", "Posts Analyzed"],
    );
    for b in &report.brands {
        for p in &b.pillars {
            pillars.push_row(vec![
                text(b.brand.clone()),
                text(p.theme.clone()),
                text(p.description.clone()),
                p.share.map_or(Cell::Empty, Cell::Number),
                p.posts_count.map_or(Cell::Empty, count),
                text(p.subtopics.join("\n")),
                text(p.examples.join("\n")),
                count(b.posts_analyzed),
            ]);
        }
    }

    let mut sheets = vec![pillars, skipped_sheet(&report.skipped)];
    if !report.failed.is_empty() {
        sheets.push(failed_sheet(&report.failed));
    }
    sheets
}

#[must_use]
pub fn affinity_sheets(report: &AffinityReport) -> Vec<SheetData> {
    let high_headers: Vec<String> = PERSONAS.iter().map(|p| format!("{} %High", p.name)).collect();
    let mut headers = vec![COL_BRAND, "Posts"];
    headers.extend(high_headers.iter().map(String::as_str));
    headers.extend(score_columns().map(|c| -> &str { c }));
    let mut summary = SheetData::new(SUMMARY_SHEET, &headers);
    for b in &report.brands {
        let mut row = vec![text(b.brand.clone()), count(b.posts.len())];
        row.extend((0..PERSONAS.len()).map(|p| Cell::Number(b.persona_high(p))));
        row.extend(b.top_box.iter().map(|v| Cell::Number(*v)));
        summary.push_row(row);
    }

    let schema = report.media.schema();
    let mut headers = vec![COL_BRAND, schema.id_column, "Post Content"];
    headers.extend(score_columns());
    let mut posts = SheetData::new(POSTS_SHEET, &headers);
    for b in &report.brands {
        for post in &b.posts {
            let mut row = vec![
                text(b.brand.clone()),
                text(post.item.source_id.clone()),
                text(post.item.text.clone()),
            ];
            row.extend(post.scores.iter().map(|s| Cell::Number(f64::from(*s))));
            posts.push_row(row);
        }
    }

    vec![summary, posts, skipped_sheet(&report.skipped)]
}
