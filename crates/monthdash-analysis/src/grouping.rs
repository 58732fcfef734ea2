//! Per-brand grouping and the minimum-sample threshold shared by the
//! creativity, key-advantages, and content-pillars engines.

use std::collections::{BTreeMap, HashSet};

use monthdash_io::ContentItem;
use serde::Serialize;

use crate::text::dedup_key;

/// A brand left out of an analysis because it had too few items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBrand {
    pub brand: String,
    pub item_count: usize,
    pub threshold: usize,
}

/// A brand whose analysis failed after retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBrand {
    pub brand: String,
    pub reason: String,
}

/// Items grouped by canonical brand name, in brand-name order. Items keep their
/// input order within a brand.
#[must_use]
pub fn group_by_brand(items: &[ContentItem]) -> BTreeMap<String, Vec<&ContentItem>> {
    let mut groups: BTreeMap<String, Vec<&ContentItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.brand.clone()).or_default().push(item);
    }
    groups
}

/// Highest reach first. The sort is stable, so equal reach keeps input order.
pub fn sort_by_reach(items: &mut [&ContentItem]) {
    items.sort_by(|a, b| b.reach.total_cmp(&a.reach));
}

/// Drop repeated texts, keeping the highest-reach copy. Expects reach-sorted input.
#[must_use]
pub fn dedup_texts<'a>(items: Vec<&'a ContentItem>) -> Vec<&'a ContentItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(dedup_key(&item.text)))
        .collect()
}

/// Brands at or above the threshold, and the rest as [`SkippedBrand`] records.
#[derive(Debug)]
pub struct Partition<'a> {
    pub eligible: Vec<(String, Vec<&'a ContentItem>)>,
    pub skipped: Vec<SkippedBrand>,
}

/// Split `groups` on `threshold`. Both halves stay in brand-name order, so the
/// skipped list is identical across runs over the same input.
#[must_use]
pub fn partition<'a>(groups: BTreeMap<String, Vec<&'a ContentItem>>, threshold: usize) -> Partition<'a> {
    let mut eligible = Vec::new();
    let mut skipped = Vec::new();
    for (brand, items) in groups {
        if items.len() < threshold {
            tracing::info!(
                brand = %brand,
                items = items.len(),
                threshold,
                "brand below minimum sample, skipped"
            );
            skipped.push(SkippedBrand {
                brand,
                item_count: items.len(),
                threshold,
            });
        } else {
            eligible.push((brand, items));
        }
    }
    Partition { eligible, skipped }
}
