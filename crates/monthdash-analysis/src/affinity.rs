//! Audience affinity: how relevant each brand's social-media posts are to four
//! shopper personas.
//!
//! Every post is scored from 1 to 7 on each persona criterion, one request per
//! (post, persona) pair with at most `max_workers` in flight. A brand's result
//! per criterion is the top-2-box share, the percentage of its posts scoring 6
//! or 7. Scores the service never delivers count as neutral.

use futures::stream::{self, StreamExt};
use monthdash_core::{AnalysisKind, MediaType};
use monthdash_io::ContentItem;
use monthdash_llm::{
    retry_with_backoff, AffinityCriterion, Persona, TextService, MAX_AFFINITY_SCORE,
    NEUTRAL_AFFINITY_SCORE,
};

use crate::grouping::{group_by_brand, partition, Partition, SkippedBrand};
use crate::settings::AnalysisSettings;
use crate::text::prepare;

/// Lowest score counted in the top-2 box.
pub const TOP_BOX_MIN: u8 = MAX_AFFINITY_SCORE - 1;

/// One persona: name, who it covers, and `(column, criterion, question)` rows.
pub struct PersonaSpec {
    pub name: &'static str,
    pub audience: &'static str,
    pub criteria: [(&'static str, &'static str, &'static str); 3],
}

pub const PERSONAS: [PersonaSpec; 4] = [
    PersonaSpec {
        name: "Families & Household Shoppers",
        audience: "parents, caregivers, people shopping for a household",
        criteria: [
            (
                "Family_Kids_Products",
                "Kids\u{2019} Products Relevance",
                "Does it feature toys, clothing, food, or other products specifically for children?",
            ),
            (
                "Family_Kids_Events",
                "Kids\u{2019} Events & Activities",
                "Does it promote events, workshops, or entertainment designed for children or families?",
            ),
            (
                "Family_Household_Discounts",
                "Household Savings & Discounts",
                "Does it clearly highlight discounts, bundle deals, or cost-saving opportunities aimed at household shopping?",
            ),
        ],
    },
    PersonaSpec {
        name: "Young Adults \u{2013} Tech & Fashion",
        audience: "students, young professionals, and early-career adults",
        criteria: [
            (
                "Young_Tech_Gaming",
                "Technology & Gaming Relevance",
                "Does it feature electronics, gaming, or other digital lifestyle products?",
            ),
            (
                "Young_Fashion_Style",
                "Fashion & Style for Young Adults",
                "Does it highlight clothing, footwear, or accessories appealing to a youthful and trend-aware audience?",
            ),
            (
                "Young_Social_Events",
                "Social & Youth-Oriented Events",
                "Does it promote live music, product launches, or gatherings tailored to young adults?",
            ),
        ],
    },
    PersonaSpec {
        name: "Store Owners & Business Partners",
        audience: "current or potential tenants, brand partners",
        criteria: [
            (
                "Store_Business_Growth",
                "Business Growth Opportunities",
                "Does it communicate how the mall drives traffic, supports marketing campaigns, or expands customer reach?",
            ),
            (
                "Store_Partnership_CoMarketing",
                "Partnership & Co-Marketing Potential",
                "Does it highlight collaborative promotions, cross-store events, or shared advertising initiatives?",
            ),
            (
                "Store_Market_Insights",
                "Market Insights & Strategic Positioning",
                "Does it offer useful information on customer trends, competitive positioning, or investment value?",
            ),
        ],
    },
    PersonaSpec {
        name: "Shopping Experience & Mall Environment",
        audience: "visitors focused on comfort, accessibility, and the overall atmosphere of the mall",
        criteria: [
            (
                "Experience_Accessibility_Comfort",
                "Accessibility & Comfort",
                "Does it emphasize parking, navigation, seating, or family-friendly services like elevators and rest areas?",
            ),
            (
                "Experience_Ambience_Design",
                "Ambience & Design Quality",
                "Does it convey a pleasant, clean, or distinctive shopping atmosphere?",
            ),
            (
                "Experience_Mallwide_Events",
                "Mall-Wide Events & Services",
                "Does it highlight seasonal festivals, center-wide promotions, or customer-service improvements that enhance the overall trip?",
            ),
        ],
    },
];

const CRITERIA_PER_PERSONA: usize = 3;

#[must_use]
pub fn personas() -> Vec<Persona> {
    PERSONAS
        .iter()
        .map(|p| Persona {
            name: p.name.to_owned(),
            audience: p.audience.to_owned(),
            criteria: p
                .criteria
                .iter()
                .map(|(_, name, question)| AffinityCriterion {
                    name: (*name).to_owned(),
                    question: (*question).to_owned(),
                })
                .collect(),
        })
        .collect()
}

/// Output column names in persona order, one per criterion.
pub fn score_columns() -> impl Iterator<Item = &'static str> {
    PERSONAS
        .iter()
        .flat_map(|p| p.criteria.iter().map(|(column, _, _)| *column))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPost {
    pub item: ContentItem,
    /// One score per criterion, in [`score_columns`] order.
    pub scores: Vec<u8>,
    /// Personas whose request failed after retries and were scored neutral.
    pub failed_personas: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrandAffinity {
    pub brand: String,
    /// In input order.
    pub posts: Vec<ScoredPost>,
    /// Top-2-box percentage per criterion, in [`score_columns`] order, one decimal.
    pub top_box: Vec<f64>,
}

impl BrandAffinity {
    /// Mean of the persona's criterion percentages, one decimal.
    #[must_use]
    pub fn persona_high(&self, persona: usize) -> f64 {
        let start = persona * CRITERIA_PER_PERSONA;
        let Some(values) = self.top_box.get(start..start + CRITERIA_PER_PERSONA) else {
            return 0.0;
        };
        #[allow(clippy::cast_precision_loss)]
        let mean = values.iter().sum::<f64>() / CRITERIA_PER_PERSONA as f64;
        round1(mean)
    }

    /// Posts with at least one persona scored neutral after a failure.
    #[must_use]
    pub fn failed_posts(&self) -> usize {
        self.posts.iter().filter(|p| p.failed_personas > 0).count()
    }
}

#[derive(Debug, Clone)]
pub struct AffinityReport {
    pub media: MediaType,
    /// In brand-name order.
    pub brands: Vec<BrandAffinity>,
    pub skipped: Vec<SkippedBrand>,
}

impl AffinityReport {
    #[must_use]
    pub fn failed_items(&self) -> usize {
        self.brands.iter().map(BrandAffinity::failed_posts).sum()
    }
}

/// Score every post of every eligible brand against every persona.
pub async fn run_audience_affinity(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    media: MediaType,
    items: &[ContentItem],
) -> AffinityReport {
    let Partition { eligible, skipped } = partition(
        group_by_brand(items),
        settings.min_items_for(AnalysisKind::AudienceAffinity),
    );
    let personas = personas();
    let personas = personas.as_slice();

    let jobs: Vec<(usize, usize, usize, &ContentItem)> = eligible
        .iter()
        .enumerate()
        .flat_map(|(b, (_, posts))| {
            posts.iter().enumerate().flat_map(move |(p, post)| {
                (0..personas.len()).map(move |persona| (b, p, persona, *post))
            })
        })
        .collect();

    let results: Vec<(usize, usize, usize, Option<Vec<u8>>)> = stream::iter(jobs)
        .map(|(b, p, persona, post)| async move {
            let scores = score_post(service, settings, &personas[persona], post).await;
            (b, p, persona, scores)
        })
        .buffer_unordered(settings.workers())
        .collect()
        .await;

    let mut grid: Vec<Vec<ScoredPost>> = eligible
        .iter()
        .map(|(_, posts)| {
            posts
                .iter()
                .map(|post| ScoredPost {
                    item: (*post).clone(),
                    scores: vec![NEUTRAL_AFFINITY_SCORE; PERSONAS.len() * CRITERIA_PER_PERSONA],
                    failed_personas: 0,
                })
                .collect()
        })
        .collect();
    for (b, p, persona, scores) in results {
        let post = &mut grid[b][p];
        match scores {
            Some(scores) => {
                let start = persona * CRITERIA_PER_PERSONA;
                post.scores[start..start + CRITERIA_PER_PERSONA].copy_from_slice(&scores);
            }
            None => post.failed_personas += 1,
        }
    }

    let brands: Vec<BrandAffinity> = eligible
        .into_iter()
        .zip(grid)
        .map(|((brand, _), posts)| {
            let top_box = top_box_shares(&posts);
            BrandAffinity {
                brand,
                posts,
                top_box,
            }
        })
        .collect();

    let report = AffinityReport {
        media,
        brands,
        skipped,
    };
    tracing::info!(
        media = %media,
        brands = report.brands.len(),
        skipped = report.skipped.len(),
        failed_posts = report.failed_items(),
        "audience affinity complete"
    );
    report
}

/// Exactly [`CRITERIA_PER_PERSONA`] scores on the 1–7 scale, or `None` when the
/// request failed after retries. Empty posts score neutral without a request.
async fn score_post(
    service: &dyn TextService,
    settings: &AnalysisSettings,
    persona: &Persona,
    post: &ContentItem,
) -> Option<Vec<u8>> {
    let text = prepare(&post.text, settings.max_chars_per_item);
    if text.is_empty() {
        return Some(vec![NEUTRAL_AFFINITY_SCORE; CRITERIA_PER_PERSONA]);
    }

    match retry_with_backoff(settings.retry, "score_affinity", || {
        service.score_affinity(&text, persona)
    })
    .await
    {
        Ok(mut scores) => {
            scores.resize(CRITERIA_PER_PERSONA, NEUTRAL_AFFINITY_SCORE);
            for s in &mut scores {
                *s = (*s).clamp(1, MAX_AFFINITY_SCORE);
            }
            Some(scores)
        }
        Err(e) => {
            tracing::warn!(
                brand = %post.brand,
                source_id = %post.source_id,
                persona = %persona.name,
                error = %e,
                "affinity scoring failed, using neutral scores"
            );
            None
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn top_box_shares(posts: &[ScoredPost]) -> Vec<f64> {
    let columns = PERSONAS.len() * CRITERIA_PER_PERSONA;
    if posts.is_empty() {
        return vec![0.0; columns];
    }
    (0..columns)
        .map(|c| {
            let high = posts.iter().filter(|p| p.scores[c] >= TOP_BOX_MIN).count();
            round1(high as f64 / posts.len() as f64 * 100.0)
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use monthdash_llm::{RetryPolicy, StubTextService};

    use super::*;
    use crate::grouping::fixtures::{item, items_for};

    fn settings() -> AnalysisSettings {
        AnalysisSettings {
            min_posts_for_analysis: 3,
            retry: RetryPolicy {
                max_retries: 0,
                backoff_base_ms: 0,
            },
            ..AnalysisSettings::default()
        }
    }

    #[test]
    fn twelve_distinct_columns() {
        let columns: Vec<&str> = score_columns().collect();
        assert_eq!(columns.len(), 12);
        let unique: std::collections::HashSet<&str> = columns.iter().copied().collect();
        assert_eq!(unique.len(), 12);
        assert_eq!(columns[0], "Family_Kids_Products");
        assert_eq!(columns[11], "Experience_Mallwide_Events");
        assert!(personas().iter().all(|p| p.criteria.len() == CRITERIA_PER_PERSONA));
    }

    #[tokio::test]
    async fn top_box_counts_sixes_and_sevens() {
        let items = vec![
            item("Ozas", "Kids festival", 1.0, 0),
            item("Ozas", "Lego workshop", 1.0, 1),
            item("Ozas", "Parking update", 1.0, 2),
            item("Ozas", "Opening hours", 1.0, 3),
        ];
        let stub = StubTextService::new()
            .with_affinity("Kids festival", 7)
            .with_affinity("Lego workshop", 6)
            .with_affinity("Parking update", 5)
            .with_affinity("Opening hours", 1);

        let report = run_audience_affinity(&stub, &settings(), MediaType::SocialMedia, &items).await;
        assert_eq!(report.brands.len(), 1);
        let ozas = &report.brands[0];
        assert!(ozas.top_box.iter().all(|v| (v - 50.0).abs() < f64::EPSILON));
        assert!((ozas.persona_high(3) - 50.0).abs() < f64::EPSILON);
        assert_eq!(ozas.posts[0].scores, vec![7; 12]);
        assert_eq!(stub.call_count(), 4 * PERSONAS.len());
        assert_eq!(report.failed_items(), 0);
    }

    #[tokio::test]
    async fn brand_below_post_minimum_is_skipped() {
        let mut items = items_for("Quiet", 2, 0);
        items.extend(items_for("Busy", 3, 2));

        let stub = StubTextService::new();
        let report = run_audience_affinity(&stub, &settings(), MediaType::SocialMedia, &items).await;
        assert_eq!(report.brands.len(), 1);
        assert_eq!(report.brands[0].brand, "Busy");
        assert_eq!(
            report.skipped,
            vec![SkippedBrand {
                brand: "Quiet".into(),
                item_count: 2,
                threshold: 3
            }]
        );
        assert_eq!(stub.call_count(), 3 * PERSONAS.len());
    }

    #[tokio::test]
    async fn failed_requests_score_neutral_and_are_counted() {
        let items = vec![
            item("Akropolis", "Broken post", 1.0, 0),
            item("Akropolis", "Great sale", 1.0, 1),
            item("Akropolis", "Fashion week", 1.0, 2),
        ];
        let stub = StubTextService::new()
            .with_failing_text("Broken post")
            .with_affinity("Great sale", 7)
            .with_affinity("Fashion week", 7);

        let report = run_audience_affinity(&stub, &settings(), MediaType::SocialMedia, &items).await;
        let brand = &report.brands[0];
        assert_eq!(brand.posts[0].scores, vec![NEUTRAL_AFFINITY_SCORE; 12]);
        assert_eq!(brand.posts[0].failed_personas, PERSONAS.len());
        assert_eq!(report.failed_items(), 1);
        // Two of three posts in the top box.
        assert!((brand.top_box[0] - 66.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_posts_are_neutral_without_requests() {
        let items = vec![
            item("Panorama", "  ", 1.0, 0),
            item("Panorama", "Movie night", 1.0, 1),
            item("Panorama", "Book fair", 1.0, 2),
        ];
        let stub = StubTextService::new();
        let report = run_audience_affinity(&stub, &settings(), MediaType::SocialMedia, &items).await;
        assert_eq!(report.brands[0].posts[0].scores, vec![NEUTRAL_AFFINITY_SCORE; 12]);
        assert_eq!(report.brands[0].posts[0].failed_personas, 0);
        assert_eq!(stub.call_count(), 2 * PERSONAS.len());
    }
}
