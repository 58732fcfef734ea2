use monthdash_core::{AnalysisKind, AppConfig};
use monthdash_llm::RetryPolicy;

/// Immutable tuning for one run, handed to every engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Items considered per brand after ordering by reach.
    pub max_items_per_brand: usize,
    pub top_k_per_brand: usize,
    /// Text is truncated to this many characters before submission.
    pub max_chars_per_item: usize,
    pub min_items_for_analysis: usize,
    pub min_posts_for_analysis: usize,
    /// Concurrent text-service requests.
    pub max_workers: usize,
    pub retry: RetryPolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_items_per_brand: 50,
            top_k_per_brand: 10,
            max_chars_per_item: 1_000,
            min_items_for_analysis: 5,
            min_posts_for_analysis: 5,
            max_workers: 20,
            retry: RetryPolicy::default(),
        }
    }
}

impl AnalysisSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_items_per_brand: config.max_items_per_brand,
            top_k_per_brand: config.top_k_per_brand,
            max_chars_per_item: config.max_chars_per_item,
            min_items_for_analysis: config.min_items_for_analysis,
            min_posts_for_analysis: config.min_posts_for_analysis,
            max_workers: config.max_workers,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base_ms: config.retry_backoff_base_ms,
            },
        }
    }

    /// Minimum items a brand needs for `kind`. CompOS has no threshold.
    #[must_use]
    pub fn min_items_for(&self, kind: AnalysisKind) -> usize {
        match kind {
            AnalysisKind::Compos => 0,
            AnalysisKind::Creativity | AnalysisKind::KeyAdvantages => self.min_items_for_analysis,
            AnalysisKind::ContentPillars | AnalysisKind::AudienceAffinity => {
                self.min_posts_for_analysis
            }
        }
    }

    pub(crate) fn workers(&self) -> usize {
        self.max_workers.max(1)
    }
}
