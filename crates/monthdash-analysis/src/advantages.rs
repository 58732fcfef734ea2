//! Extraction Engine (Key Advantages): claimed benefits with supporting quotes,
//! grouped by category per brand.

use futures::stream::{self, StreamExt};
use monthdash_core::{AnalysisKind, MediaType};
use monthdash_io::ContentItem;
use monthdash_llm::{retry_with_backoff, Advantage, TextService};

use crate::grouping::{group_by_brand, partition, sort_by_reach, Partition, SkippedBrand};
use crate::settings::AnalysisSettings;
use crate::text::{normalize_whitespace, prepare};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub quote: String,
    pub source_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    /// Spelling of the first occurrence.
    pub category: String,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandAdvantages {
    pub brand: String,
    pub items_analyzed: usize,
    /// Items whose extraction failed after retries.
    pub failed_items: usize,
    /// Most evidence first, ties in first-seen order.
    pub categories: Vec<CategoryGroup>,
}

#[derive(Debug, Clone)]
pub struct AdvantagesReport {
    pub media: MediaType,
    /// In brand-name order.
    pub brands: Vec<BrandAdvantages>,
    pub skipped: Vec<SkippedBrand>,
}

impl AdvantagesReport {
    #[must_use]
    pub fn failed_items(&self) -> usize {
        self.brands.iter().map(|b| b.failed_items).sum()
    }
}

/// Extract advantages for every eligible brand, one request per item.
pub async fn run_key_advantages(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    items: &[ContentItem],
) -> AdvantagesReport {
    let groups = group_by_brand(items)
        .into_iter()
        .map(|(brand, mut brand_items)| {
            sort_by_reach(&mut brand_items);
            brand_items.truncate(settings.max_items_per_brand);
            (brand, brand_items)
        })
        .collect();
    let Partition { eligible, skipped } =
        partition(groups, settings.min_items_for(AnalysisKind::KeyAdvantages));

    // One flat work queue across brands keeps the worker pool full.
    let jobs: Vec<(usize, usize, &ContentItem)> = eligible
        .iter()
        .enumerate()
        .flat_map(|(b, (_, brand_items))| {
            brand_items.iter().enumerate().map(move |(i, item)| (b, i, *item))
        })
        .collect();

    let mut results: Vec<(usize, usize, Option<Vec<Advantage>>)> = stream::iter(jobs)
        .map(|(b, i, item)| async move {
            let extracted = extract_item(service, settings, media, item).await;
            (b, i, extracted)
        })
        .buffer_unordered(settings.workers())
        .collect()
        .await;
    results.sort_by_key(|(b, i, _)| (*b, *i));

    let mut brands: Vec<BrandAdvantages> = eligible
        .iter()
        .map(|(brand, brand_items)| BrandAdvantages {
            brand: brand.clone(),
            items_analyzed: brand_items.len(),
            failed_items: 0,
            categories: Vec::new(),
        })
        .collect();
    for (b, i, extracted) in results {
        let target = &mut brands[b];
        match extracted {
            Some(advantages) => {
                let source_id = &eligible[b].1[i].source_id;
                merge_advantages(&mut target.categories, source_id, advantages);
            }
            None => target.failed_items += 1,
        }
    }
    for brand in &mut brands {
        // Stable, so equal counts keep first-seen order.
        brand.categories.sort_by(|a, b| b.evidence.len().cmp(&a.evidence.len()));
    }

    tracing::info!(
        media = %media,
        brands = brands.len(),
        skipped = skipped.len(),
        failed_items = brands.iter().map(|b| b.failed_items).sum::<usize>(),
        "key advantages extraction complete"
    );

    AdvantagesReport {
        media,
        brands,
        skipped,
    }
}

async fn extract_item(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    item: &ContentItem,
) -> Option<Vec<Advantage>> {
    let text = prepare(&item.text, settings.max_chars_per_item);
    if text.is_empty() {
        return Some(Vec::new());
    }
    match retry_with_backoff(settings.retry, "extract_advantages", || {
        service.extract_advantages(media, &item.brand, &text)
    })
    .await
    {
        Ok(advantages) => Some(advantages),
        Err(e) => {
            tracing::warn!(
                media = %media,
                brand = %item.brand,
                source_id = %item.source_id,
                error = %e,
                "advantage extraction failed for item"
            );
            None
        }
    }
}

/// Fold one item's advantages into the brand's categories. Categories match
/// case- and spacing-insensitively; blank entries and repeated quotes from the
/// same item are dropped.
fn merge_advantages(
    categories: &mut Vec<CategoryGroup>,
    source_id: &str,
    advantages: Vec<Advantage>,
) {
    for advantage in advantages {
        let category = normalize_whitespace(&advantage.category);
        let quote = normalize_whitespace(&advantage.evidence);
        if category.is_empty() || quote.is_empty() {
            continue;
        }
        let key = category.to_lowercase();
        let index = match categories.iter().position(|g| g.category.to_lowercase() == key) {
            Some(index) => index,
            None => {
                categories.push(CategoryGroup {
                    category,
                    evidence: Vec::new(),
                });
                categories.len() - 1
            }
        };
        let group = &mut categories[index];
        let repeated = group
            .evidence
            .iter()
            .any(|e| e.quote == quote && e.source_id == source_id);
        if !repeated {
            group.evidence.push(Evidence {
                quote,
                source_id: source_id.to_owned(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use monthdash_llm::{RetryPolicy, StubTextService};

    use super::*;
    use crate::grouping::fixtures::items_for;

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            min_items_for_analysis: 5,
            retry: RetryPolicy {
                max_retries: 0,
                backoff_base_ms: 0,
            },
            ..AnalysisSettings::default()
        }
    }

    fn adv(category: &str, evidence: &str) -> Advantage {
        Advantage {
            category: category.to_owned(),
            evidence: evidence.to_owned(),
        }
    }

    #[tokio::test]
    async fn small_brand_is_skipped_and_absent() {
        let mut items = items_for("Brand X", 3, 0);
        items.extend(items_for("Brand Y", 10, 3));

        let stub = StubTextService::new();
        let report = run_key_advantages(&stub, &settings(), MediaType::Ads, &items).await;
        assert_eq!(report.brands.len(), 1);
        assert_eq!(report.brands[0].brand, "Brand Y");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].brand, "Brand X");
    }

    #[tokio::test]
    async fn categories_merge_across_items() {
        let items = items_for("Rimi", 5, 0);
        let stub = StubTextService::new()
            .with_advantages(
                items[0].text.clone(),
                vec![adv("Price", "lowest prices"), adv("Delivery", "free delivery")],
            )
            .with_advantages(items[1].text.clone(), vec![adv(" price ", "half price")])
            .with_advantages(items[2].text.clone(), vec![adv("", "ignored")])
            .with_advantages(items[3].text.clone(), Vec::new())
            .with_advantages(
                items[4].text.clone(),
                vec![adv("PRICE", "lowest  prices"), adv("PRICE", "lowest prices")],
            );

        let report = run_key_advantages(&stub, &settings(), MediaType::Ads, &items).await;
        let brand = &report.brands[0];
        let names: Vec<&str> = brand.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Price", "Delivery"]);
        assert_eq!(brand.categories[0].evidence.len(), 3);
        assert_eq!(brand.categories[0].evidence[2].source_id, items[4].source_id);
    }

    #[tokio::test]
    async fn failed_items_are_counted() {
        let items = items_for("Rimi", 6, 0);
        let stub = StubTextService::new().with_failing_text(items[2].text.clone());

        let report = run_key_advantages(&stub, &settings(), MediaType::Pr, &items).await;
        assert_eq!(report.brands[0].items_analyzed, 6);
        assert_eq!(report.failed_items(), 1);
    }

    #[tokio::test]
    async fn cap_limits_items_per_brand() {
        let items = items_for("Rimi", 12, 0);
        let settings = AnalysisSettings {
            max_items_per_brand: 8,
            ..settings()
        };
        let stub = StubTextService::new();
        let report = run_key_advantages(&stub, &settings, MediaType::Ads, &items).await;
        assert_eq!(report.brands[0].items_analyzed, 8);
        assert_eq!(stub.call_count(), 8);
    }
}
