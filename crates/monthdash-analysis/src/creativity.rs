//! Ranking Engine (Creativity).
//!
//! Stage (a) asks the text service, once per eligible brand, for that brand's
//! most original items. Stage (b) starts only after every stage-(a) request has
//! finished and ranks the brands against each other from their winners.

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::stream::{self, StreamExt};
use monthdash_core::{AnalysisKind, MediaType};
use monthdash_io::ContentItem;
use monthdash_llm::prompts::truncate_chars;
use monthdash_llm::{
    retry_with_backoff, BrandRank, BrandShortlist, Candidate, Pick, ShortlistEntry, TextService,
};

use crate::grouping::{
    dedup_texts, group_by_brand, partition, sort_by_reach, FailedBrand, Partition, SkippedBrand,
};
use crate::settings::AnalysisSettings;
use crate::text::prepare;

/// Score given to every brand when the cross-brand ranking is unavailable.
pub const FALLBACK_SCORE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    pub item: ContentItem,
    pub reason: String,
    pub title: Option<String>,
    pub themes: Vec<String>,
}

/// A brand's stage-(a) result.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandSelection {
    pub brand: String,
    /// Items considered after de-duplication and the per-brand cap.
    pub eligible_items: usize,
    pub selected: Vec<SelectedItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedBrand {
    /// 1 is most original.
    pub rank: usize,
    pub brand: String,
    /// 0 to 10.
    pub score: f64,
    pub justification: String,
    pub examples: Vec<String>,
    pub eligible_items: usize,
    pub selected: Vec<SelectedItem>,
}

#[derive(Debug, Clone)]
pub struct CreativityReport {
    pub media: MediaType,
    /// In rank order.
    pub ranked: Vec<RankedBrand>,
    pub skipped: Vec<SkippedBrand>,
    pub failed: Vec<FailedBrand>,
    /// True when stage (b) failed and [`FALLBACK_SCORE`] ordering was used.
    pub fallback: bool,
}

/// Run both ranking stages over one media type's items.
pub async fn run_creativity(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    items: &[ContentItem],
) -> CreativityReport {
    let prepared: BTreeMap<String, Vec<&ContentItem>> = group_by_brand(items)
        .into_iter()
        .map(|(brand, mut brand_items)| {
            sort_by_reach(&mut brand_items);
            let mut unique = dedup_texts(brand_items);
            unique.truncate(settings.max_items_per_brand);
            (brand, unique)
        })
        .collect();
    let Partition { eligible, skipped } =
        partition(prepared, settings.min_items_for(AnalysisKind::Creativity));

    let mut stage_a: Vec<(String, Result<BrandSelection, String>)> = stream::iter(eligible)
        .map(|(brand, brand_items)| async move {
            let result = select_for_brand(service, settings, media, &brand, &brand_items).await;
            (brand, result)
        })
        .buffer_unordered(settings.workers())
        .collect()
        .await;
    stage_a.sort_by(|a, b| a.0.cmp(&b.0));

    let mut selections = Vec::new();
    let mut failed = Vec::new();
    for (brand, result) in stage_a {
        match result {
            Ok(selection) => selections.push(selection),
            Err(reason) => failed.push(FailedBrand { brand, reason }),
        }
    }

    let (ranked, fallback) = if selections.is_empty() {
        (Vec::new(), false)
    } else {
        rank_across_brands(service, settings, media, selections).await
    };

    tracing::info!(
        media = %media,
        ranked = ranked.len(),
        skipped = skipped.len(),
        failed = failed.len(),
        fallback,
        "creativity ranking complete"
    );

    CreativityReport {
        media,
        ranked,
        skipped,
        failed,
        fallback,
    }
}

async fn select_for_brand(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    brand: &str,
    items: &[&ContentItem],
) -> Result<BrandSelection, String> {
    let candidates: Vec<Candidate> = items
        .iter()
        .enumerate()
        .map(|(index, item)| Candidate {
            index,
            text: prepare(&item.text, settings.max_chars_per_item),
            reach: item.reach,
        })
        .collect();
    let top_k = settings.top_k_per_brand.min(items.len());

    let picks = retry_with_backoff(settings.retry, "select_top", || {
        service.select_top(media, brand, &candidates, top_k)
    })
    .await
    .map_err(|e| {
        tracing::warn!(media = %media, brand = %brand, error = %e, "within-brand selection failed");
        e.to_string()
    })?;

    let selected = valid_picks(picks, items, top_k);
    if selected.is_empty() {
        tracing::warn!(media = %media, brand = %brand, "selection reply named no valid items");
        return Err("selection reply named no valid items".to_owned());
    }
    Ok(BrandSelection {
        brand: brand.to_owned(),
        eligible_items: items.len(),
        selected,
    })
}

/// Keep picks that name an offered item, first mention only, at most `top_k`.
fn valid_picks(picks: Vec<Pick>, items: &[&ContentItem], top_k: usize) -> Vec<SelectedItem> {
    let mut seen = HashSet::new();
    picks
        .into_iter()
        .filter(|p| p.index < items.len() && seen.insert(p.index))
        .take(top_k)
        .map(|p| SelectedItem {
            item: items[p.index].clone(),
            reason: p.reason,
            title: p.title.filter(|t| !t.trim().is_empty()),
            themes: p.themes,
        })
        .collect()
}

async fn rank_across_brands(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    selections: Vec<BrandSelection>,
) -> (Vec<RankedBrand>, bool) {
    let shortlists: Vec<BrandShortlist> = selections
        .iter()
        .map(|s| BrandShortlist {
            brand: s.brand.clone(),
            entries: s
                .selected
                .iter()
                .map(|sel| ShortlistEntry {
                    text: prepare(&sel.item.text, settings.max_chars_per_item),
                    reason: sel.reason.clone(),
                })
                .collect(),
        })
        .collect();

    match retry_with_backoff(settings.retry, "rank_brands", || {
        service.rank_brands(media, &shortlists)
    })
    .await
    {
        Ok(ranks) => (reconcile(selections, ranks), false),
        Err(e) => {
            tracing::warn!(media = %media, error = %e, "cross-brand ranking failed, using fallback order");
            (fallback_ranking(selections, &e.to_string()), true)
        }
    }
}

/// Merge the service's ranking with the stage-(a) selections.
///
/// Reply names match a brand exactly first and case-insensitively otherwise.
/// Unknown or repeated brand names in the reply are ignored. Order is by the
/// reply's rank, then higher score, then brand-name order. Brands the reply
/// left out follow in brand-name order with score 0. Ranks are renumbered
/// from 1.
#[must_use]
pub fn reconcile(selections: Vec<BrandSelection>, ranks: Vec<BrandRank>) -> Vec<RankedBrand> {
    let exact: HashMap<String, usize> = selections
        .iter()
        .enumerate()
        .map(|(i, s)| (s.brand.trim().to_owned(), i))
        .collect();
    let mut folded: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, s) in selections.iter().enumerate() {
        folded.entry(s.brand.trim().to_lowercase()).or_default().push(i);
    }
    let mut pending: Vec<Option<BrandSelection>> = selections.into_iter().map(Some).collect();

    let mut placed: Vec<(usize, BrandRank, BrandSelection)> = Vec::new();
    for rank in ranks {
        let name = rank.brand.trim();
        let index = match exact.get(name) {
            Some(&i) => Some(i),
            // Case-insensitive only when no brand has this exact name.
            None => folded
                .get(&name.to_lowercase())
                .and_then(|candidates| candidates.iter().copied().find(|&i| pending[i].is_some())),
        };
        match index.and_then(|i| pending[i].take().map(|s| (i, s))) {
            Some((i, selection)) => placed.push((i, rank, selection)),
            None => tracing::debug!(brand = %rank.brand, "ignoring unknown or repeated brand in ranking"),
        }
    }
    placed.sort_by(|(ia, ra, _), (ib, rb, _)| {
        ra.rank
            .cmp(&rb.rank)
            .then_with(|| rb.score.total_cmp(&ra.score))
            .then_with(|| ia.cmp(ib))
    });

    let ranked = placed.into_iter().map(|(_, rank, selection)| {
        ranked_brand(
            selection,
            rank.score.clamp(0.0, 10.0),
            rank.justification,
            rank.examples,
        )
    });
    let unranked = pending.into_iter().flatten().map(|selection| {
        tracing::warn!(brand = %selection.brand, "brand missing from cross-brand ranking");
        ranked_brand(selection, 0.0, "Not ranked by the text service.".to_owned(), Vec::new())
    });

    ranked
        .chain(unranked)
        .enumerate()
        .map(|(i, mut brand)| {
            brand.rank = i + 1;
            brand
        })
        .collect()
}

/// Brand-name order with [`FALLBACK_SCORE`] for every brand.
#[must_use]
pub fn fallback_ranking(selections: Vec<BrandSelection>, reason: &str) -> Vec<RankedBrand> {
    selections
        .into_iter()
        .enumerate()
        .map(|(i, selection)| {
            let examples = selection
                .selected
                .iter()
                .take(2)
                .map(|s| truncate_chars(&s.item.text, 100))
                .collect();
            let mut brand = ranked_brand(
                selection,
                FALLBACK_SCORE,
                format!("Fallback ranking: cross-brand comparison unavailable ({reason})."),
                examples,
            );
            brand.rank = i + 1;
            brand
        })
        .collect()
}

fn ranked_brand(
    selection: BrandSelection,
    score: f64,
    justification: String,
    examples: Vec<String>,
) -> RankedBrand {
    RankedBrand {
        rank: 0,
        brand: selection.brand,
        score,
        justification,
        examples,
        eligible_items: selection.eligible_items,
        selected: selection.selected,
    }
}

#[cfg(test)]
mod tests {
    use monthdash_llm::{RetryPolicy, StubTextService};

    use super::*;
    use crate::grouping::fixtures::{item, items_for};

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            top_k_per_brand: 3,
            min_items_for_analysis: 5,
            retry: RetryPolicy {
                max_retries: 1,
                backoff_base_ms: 0,
            },
            ..AnalysisSettings::default()
        }
    }

    fn selection(brand: &str) -> BrandSelection {
        BrandSelection {
            brand: brand.to_owned(),
            eligible_items: 5,
            selected: vec![SelectedItem {
                item: item(brand, "text", 1.0, 0),
                reason: "fresh".into(),
                title: None,
                themes: Vec::new(),
            }],
        }
    }

    fn rank(brand: &str, rank: usize, score: f64) -> BrandRank {
        BrandRank {
            brand: brand.to_owned(),
            rank,
            score,
            justification: String::new(),
            examples: Vec::new(),
        }
    }

    #[tokio::test]
    async fn brand_below_threshold_is_skipped_not_ranked() {
        let mut items = items_for("Brand X", 3, 0);
        items.extend(items_for("Brand Y", 10, 3));

        let report = run_creativity(&StubTextService::new(), &settings(), MediaType::Ads, &items)
            .await;

        assert_eq!(report.ranked.len(), 1);
        assert_eq!(report.ranked[0].brand, "Brand Y");
        assert_eq!(report.ranked[0].selected.len(), 3);
        assert_eq!(
            report.skipped,
            vec![SkippedBrand {
                brand: "Brand X".into(),
                item_count: 3,
                threshold: 5
            }]
        );
        assert!(!report.fallback);
    }

    #[tokio::test]
    async fn skipped_list_is_stable_across_runs() {
        let mut items = items_for("Zeta", 2, 0);
        items.extend(items_for("Alpha", 4, 2));
        items.extend(items_for("Mid", 6, 6));

        let first = run_creativity(&StubTextService::new(), &settings(), MediaType::Ads, &items)
            .await;
        let second = run_creativity(&StubTextService::new(), &settings(), MediaType::Ads, &items)
            .await;
        assert_eq!(first.skipped, second.skipped);
        let names: Vec<&str> = first.skipped.iter().map(|s| s.brand.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn duplicates_collapse_before_threshold() {
        let mut items: Vec<ContentItem> = (0..6)
            .map(|i| item("Echo", "Same ad copy", f64::from(i), i as usize))
            .collect();
        items.extend(items_for("Fresh", 5, 6));

        let report = run_creativity(&StubTextService::new(), &settings(), MediaType::Ads, &items)
            .await;
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].brand, "Echo");
        assert_eq!(report.skipped[0].item_count, 1);
    }

    #[tokio::test]
    async fn selection_prefers_reach_order_within_brand() {
        let items = items_for("Brand Y", 10, 0);
        let report = run_creativity(&StubTextService::new(), &settings(), MediaType::Ads, &items)
            .await;
        let reaches: Vec<f64> = report.ranked[0].selected.iter().map(|s| s.item.reach).collect();
        assert_eq!(reaches, vec![1000.0, 900.0, 800.0]);
    }

    #[tokio::test]
    async fn ranking_failure_uses_fallback() {
        let mut items = items_for("Beta", 5, 0);
        items.extend(items_for("Alpha", 5, 5));
        let stub = StubTextService::new().with_failing_ranking();

        let report = run_creativity(&stub, &settings(), MediaType::Ads, &items).await;
        assert!(report.fallback);
        let order: Vec<(&str, usize)> = report.ranked.iter().map(|r| (r.brand.as_str(), r.rank)).collect();
        assert_eq!(order, vec![("Alpha", 1), ("Beta", 2)]);
        assert!(report.ranked.iter().all(|r| (r.score - FALLBACK_SCORE).abs() < f64::EPSILON));
    }

    #[tokio::test]
    async fn failed_selection_is_reported() {
        let mut items = items_for("Beta", 5, 0);
        items.extend(items_for("Alpha", 5, 5));
        let stub = StubTextService::new().with_failing_brand("Beta");

        let report = run_creativity(&stub, &settings(), MediaType::Ads, &items).await;
        assert_eq!(report.ranked.len(), 1);
        assert_eq!(report.ranked[0].brand, "Alpha");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].brand, "Beta");
    }

    #[test]
    fn reconcile_orders_and_fills_gaps() {
        let selections = vec![selection("Alpha"), selection("Beta"), selection("Gamma")];
        let ranks = vec![
            rank("gamma", 1, 9.0),
            rank("Unknown", 2, 8.0),
            rank("Alpha", 2, 7.5),
            rank("Gamma", 3, 1.0),
        ];
        let ranked = reconcile(selections, ranks);
        let order: Vec<(&str, usize)> = ranked.iter().map(|r| (r.brand.as_str(), r.rank)).collect();
        assert_eq!(order, vec![("Gamma", 1), ("Alpha", 2), ("Beta", 3)]);
        assert!(ranked[2].score.abs() < f64::EPSILON);
    }

    #[test]
    fn reconcile_breaks_rank_ties_by_score_then_name() {
        let selections = vec![selection("Alpha"), selection("Beta"), selection("Gamma")];
        let ranks = vec![rank("Gamma", 1, 6.0), rank("Beta", 1, 6.0), rank("Alpha", 1, 8.0)];
        let ranked = reconcile(selections, ranks);
        let order: Vec<&str> = ranked.iter().map(|r| r.brand.as_str()).collect();
        assert_eq!(order, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn reconcile_keeps_brands_differing_only_by_case_apart() {
        let selections = vec![selection("IKI"), selection("Iki")];
        let ranks = vec![rank("IKI", 1, 9.0), rank("Iki", 2, 7.0)];
        let ranked = reconcile(selections, ranks);
        let got: Vec<(&str, usize, f64)> = ranked
            .iter()
            .map(|r| (r.brand.as_str(), r.rank, r.score))
            .collect();
        assert_eq!(got, vec![("IKI", 1, 9.0), ("Iki", 2, 7.0)]);

        // Reversed reply order must not swap the scores.
        let ranks = vec![rank("Iki", 1, 7.0), rank("IKI", 2, 9.0)];
        let ranked = reconcile(vec![selection("IKI"), selection("Iki")], ranks);
        let got: Vec<(&str, f64)> = ranked.iter().map(|r| (r.brand.as_str(), r.score)).collect();
        assert_eq!(got, vec![("Iki", 7.0), ("IKI", 9.0)]);
    }

    #[test]
    fn scores_are_clamped() {
        let ranked = reconcile(vec![selection("Alpha")], vec![rank("Alpha", 1, 42.0)]);
        assert!((ranked[0].score - 10.0).abs() < f64::EPSILON);
    }
}
