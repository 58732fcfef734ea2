//! Content pillars: recurring themes in a brand's social-media posts.

use futures::stream::{self, StreamExt};
use monthdash_core::{AnalysisKind, MediaType};
use monthdash_io::ContentItem;
use monthdash_llm::{retry_with_backoff, Candidate, Pillar, TextService};

use crate::grouping::{
    group_by_brand, partition, sort_by_reach, FailedBrand, Partition, SkippedBrand,
};
use crate::settings::AnalysisSettings;
use crate::text::prepare;

#[derive(Debug, Clone, PartialEq)]
pub struct BrandPillars {
    pub brand: String,
    pub posts_analyzed: usize,
    pub pillars: Vec<Pillar>,
}

#[derive(Debug, Clone)]
pub struct PillarsReport {
    pub media: MediaType,
    pub brands: Vec<BrandPillars>,
    pub skipped: Vec<SkippedBrand>,
    pub failed: Vec<FailedBrand>,
}

/// One pillars request per eligible brand.
pub async fn run_content_pillars(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    items: &[ContentItem],
) -> PillarsReport {
    let groups = group_by_brand(items)
        .into_iter()
        .map(|(brand, mut posts)| {
            sort_by_reach(&mut posts);
            posts.truncate(settings.max_items_per_brand);
            (brand, posts)
        })
        .collect();
    let Partition { eligible, skipped } =
        partition(groups, settings.min_items_for(AnalysisKind::ContentPillars));

    let mut results: Vec<(String, usize, Result<Vec<Pillar>, String>)> = stream::iter(eligible)
        .map(|(brand, posts)| async move {
            let candidates: Vec<Candidate> = posts
                .iter()
                .enumerate()
                .map(|(index, post)| Candidate {
                    index,
                    text: prepare(&post.text, settings.max_chars_per_item),
                    reach: post.reach,
                })
                .collect();
            let result = retry_with_backoff(settings.retry, "content_pillars", || {
                service.content_pillars(&brand, &candidates)
            })
            .await
            .map_err(|e| {
                tracing::warn!(brand = %brand, error = %e, "content pillars failed for brand");
                e.to_string()
            });
            (brand, posts.len(), result)
        })
        .buffer_unordered(settings.workers())
        .collect()
        .await;
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let mut brands = Vec::new();
    let mut failed = Vec::new();
    for (brand, posts_analyzed, result) in results {
        match result {
            Ok(pillars) => brands.push(BrandPillars {
                brand,
                posts_analyzed,
                pillars,
            }),
            Err(reason) => failed.push(FailedBrand { brand, reason }),
        }
    }

    tracing::info!(
        media = %media,
        brands = brands.len(),
        skipped = skipped.len(),
        failed = failed.len(),
        "content pillars complete"
    );

    PillarsReport {
        media,
        brands,
        skipped,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use monthdash_llm::{RetryPolicy, StubTextService};

    use super::*;
    use crate::grouping::fixtures::items_for;

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            min_posts_for_analysis: 4,
            retry: RetryPolicy {
                max_retries: 0,
                backoff_base_ms: 0,
            },
            ..AnalysisSettings::default()
        }
    }

    #[tokio::test]
    async fn threshold_uses_post_minimum() {
        let mut items = items_for("Quiet", 3, 0);
        items.extend(items_for("Busy", 4, 3));

        let stub = StubTextService::new();
        let report = run_content_pillars(&stub, &settings(), MediaType::SocialMedia, &items).await;
        assert_eq!(report.brands.len(), 1);
        assert_eq!(report.brands[0].brand, "Busy");
        assert_eq!(report.brands[0].posts_analyzed, 4);
        assert_eq!(report.brands[0].pillars[0].posts_count, Some(4));
        assert_eq!(report.skipped[0].brand, "Quiet");
        assert_eq!(report.skipped[0].threshold, 4);
    }

    #[tokio::test]
    async fn failing_brand_is_recorded() {
        let mut items = items_for("Alpha", 5, 0);
        items.extend(items_for("Beta", 5, 5));
        let stub = StubTextService::new().with_failing_brand("Alpha");

        let report = run_content_pillars(&stub, &settings(), MediaType::SocialMedia, &items).await;
        assert_eq!(report.brands.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].brand, "Alpha");
    }
}
