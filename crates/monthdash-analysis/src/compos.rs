//! Classification Engine (CompOS): one archetype per item and per-brand
//! archetype profiles.
//!
//! Items are classified concurrently with at most `max_workers` requests in
//! flight. Each request is retried on transient errors; an item that still
//! fails is recorded as unclassified and the run continues.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use monthdash_core::MediaType;
use monthdash_io::ContentItem;
use monthdash_llm::{retry_with_backoff, TaxonomyEntry, TextService};

use crate::archetype::{self, NO_CONTENT, UNCLASSIFIED};
use crate::settings::AnalysisSettings;
use crate::text::prepare;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Archetype(String),
    /// Empty text, labelled without a service call.
    NoContent,
    /// The service failed after every retry.
    Unclassified { reason: String },
}

impl Classification {
    /// Label written to the output sheet.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Classification::Archetype(label) => label,
            Classification::NoContent => NO_CONTENT,
            Classification::Unclassified { .. } => UNCLASSIFIED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifiedItem {
    pub item: ContentItem,
    pub outcome: Classification,
}

/// Archetype distribution for one brand in one month.
///
/// `counts` covers classified items only, so it sums to [`Self::classified`].
/// Items labelled `No Content` or left unclassified are counted in
/// `unclassified` and are outside the strength denominator.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandArchetypeProfile {
    pub brand: String,
    pub counts: BTreeMap<String, usize>,
    pub unclassified: usize,
}

impl BrandArchetypeProfile {
    #[must_use]
    pub fn classified(&self) -> usize {
        self.counts.values().sum()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.classified() + self.unclassified
    }

    /// Most frequent archetype; ties go to the earlier archetype in the taxonomy.
    #[must_use]
    pub fn dominant(&self) -> Option<(&str, usize)> {
        self.counts
            .iter()
            .max_by(|(la, ca), (lb, cb)| {
                ca.cmp(cb).then_with(|| {
                    let pa = archetype::position(la).unwrap_or(usize::MAX);
                    let pb = archetype::position(lb).unwrap_or(usize::MAX);
                    pb.cmp(&pa)
                })
            })
            .map(|(label, count)| (label.as_str(), *count))
    }

    /// Share of classified items in the dominant archetype, `None` when nothing
    /// was classified.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn strength(&self) -> Option<f64> {
        let classified = self.classified();
        self.dominant()
            .map(|(_, count)| count as f64 / classified as f64)
    }
}

#[derive(Debug, Clone)]
pub struct ComposReport {
    pub media: MediaType,
    /// In input order.
    pub items: Vec<ClassifiedItem>,
    /// In brand-name order.
    pub profiles: Vec<BrandArchetypeProfile>,
}

impl ComposReport {
    /// Items whose classification failed after retries.
    pub fn failed_items(&self) -> impl Iterator<Item = &ClassifiedItem> {
        self.items
            .iter()
            .filter(|c| matches!(c.outcome, Classification::Unclassified { .. }))
    }
}

/// Classify every item and build per-brand profiles.
pub async fn run_compos(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    items: &[ContentItem],
) -> ComposReport {
    let taxonomy = archetype::taxonomy();
    let taxonomy = taxonomy.as_slice();

    let mut outcomes: Vec<(usize, Classification)> = stream::iter(items.iter().enumerate())
        .map(|(idx, item)| async move {
            let outcome = classify_item(service, settings, taxonomy, item).await;
            (idx, outcome)
        })
        .buffer_unordered(settings.workers())
        .collect()
        .await;
    outcomes.sort_by_key(|(idx, _)| *idx);

    let classified: Vec<ClassifiedItem> = outcomes
        .into_iter()
        .map(|(idx, outcome)| ClassifiedItem {
            item: items[idx].clone(),
            outcome,
        })
        .collect();
    let profiles = build_profiles(&classified);

    let failed = classified
        .iter()
        .filter(|c| matches!(c.outcome, Classification::Unclassified { .. }))
        .count();
    tracing::info!(
        media = %media,
        items = classified.len(),
        brands = profiles.len(),
        unclassified = failed,
        "compos classification complete"
    );

    ComposReport {
        media,
        items: classified,
        profiles,
    }
}

async fn classify_item(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    taxonomy: &[TaxonomyEntry],
    item: &ContentItem,
) -> Classification {
    let text = prepare(&item.text, settings.max_chars_per_item);
    if text.is_empty() {
        return Classification::NoContent;
    }

    match retry_with_backoff(settings.retry, "classify", || service.classify(&text, taxonomy)).await {
        Ok(label) => Classification::Archetype(label),
        Err(e) => {
            tracing::warn!(
                brand = %item.brand,
                source_id = %item.source_id,
                error = %e,
                "item left unclassified"
            );
            Classification::Unclassified {
                reason: e.to_string(),
            }
        }
    }
}

fn build_profiles(items: &[ClassifiedItem]) -> Vec<BrandArchetypeProfile> {
    let mut by_brand: BTreeMap<&str, BrandArchetypeProfile> = BTreeMap::new();
    for c in items {
        let profile = by_brand
            .entry(c.item.brand.as_str())
            .or_insert_with(|| BrandArchetypeProfile {
                brand: c.item.brand.clone(),
                counts: BTreeMap::new(),
                unclassified: 0,
            });
        match &c.outcome {
            Classification::Archetype(label) => *profile.counts.entry(label.clone()).or_default() += 1,
            Classification::NoContent | Classification::Unclassified { .. } => {
                profile.unclassified += 1;
            }
        }
    }
    by_brand.into_values().collect()
}
