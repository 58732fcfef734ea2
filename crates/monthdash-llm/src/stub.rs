//! Deterministic [`TextService`] for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use monthdash_core::MediaType;

use crate::error::LlmError;
use crate::prompts::truncate_chars;
use crate::service::TextService;
use crate::types::{
    Advantage, BrandRank, BrandShortlist, Candidate, Persona, Pick, Pillar, TaxonomyEntry,
    MAX_AFFINITY_SCORE,
};

/// Answers every request from fixed rules:
///
/// - `classify`: the configured label for the text, otherwise a label chosen by a
///   byte-sum hash of the text.
/// - `select_top`: the first `top_k` candidates in request order.
/// - `rank_brands`: brands with more shortlisted items first, then by name.
/// - `extract_advantages`: configured pairs, otherwise one `General` pair quoting
///   the first sentence.
/// - `content_pillars`: a single pillar containing every post.
/// - `score_affinity`: the configured score for the text on every criterion,
///   otherwise scores derived from a byte-sum hash of the text.
///
/// Texts and brands registered as failing return a 503 on every attempt.
#[derive(Debug, Default)]
pub struct StubTextService {
    failing_texts: HashSet<String>,
    failing_brands: HashSet<String>,
    fail_ranking: bool,
    labels: HashMap<String, String>,
    advantages: HashMap<String, Vec<Advantage>>,
    affinity: HashMap<String, u8>,
    calls: AtomicUsize,
}

impl StubTextService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests about `text` always fail with a transient error.
    #[must_use]
    pub fn with_failing_text(mut self, text: impl Into<String>) -> Self {
        self.failing_texts.insert(text.into());
        self
    }

    /// Per-brand requests (selection, pillars) for `brand` always fail.
    #[must_use]
    pub fn with_failing_brand(mut self, brand: impl Into<String>) -> Self {
        self.failing_brands.insert(brand.into());
        self
    }

    /// Cross-brand ranking always fails.
    #[must_use]
    pub fn with_failing_ranking(mut self) -> Self {
        self.fail_ranking = true;
        self
    }

    #[must_use]
    pub fn with_label(mut self, text: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(text.into(), label.into());
        self
    }

    #[must_use]
    pub fn with_advantages(mut self, text: impl Into<String>, advantages: Vec<Advantage>) -> Self {
        self.advantages.insert(text.into(), advantages);
        self
    }

    /// Every criterion of every persona scores `score` for `text`.
    #[must_use]
    pub fn with_affinity(mut self, text: impl Into<String>, score: u8) -> Self {
        self.affinity.insert(text.into(), score);
        self
    }

    /// Total requests received, including failed ones.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn unavailable(what: &str) -> LlmError {
        LlmError::Status {
            status: 503,
            body: format!("stub: {what} unavailable"),
        }
    }
}

#[async_trait]
impl TextService for StubTextService {
    async fn classify(&self, text: &str, taxonomy: &[TaxonomyEntry]) -> Result<String, LlmError> {
        self.record();
        if self.failing_texts.contains(text) {
            return Err(Self::unavailable("classify"));
        }
        if let Some(label) = self.labels.get(text) {
            return Ok(label.clone());
        }
        if taxonomy.is_empty() {
            return Err(LlmError::Config("empty taxonomy".to_owned()));
        }
        let hash: usize = text.bytes().map(usize::from).sum();
        Ok(taxonomy[hash % taxonomy.len()].label.clone())
    }

    async fn select_top(
        &self,
        _media: MediaType,
        brand: &str,
        candidates: &[Candidate],
        top_k: usize,
    ) -> Result<Vec<Pick>, LlmError> {
        self.record();
        if self.failing_brands.contains(brand) {
            return Err(Self::unavailable("select_top"));
        }
        Ok(candidates
            .iter()
            .take(top_k)
            .map(|c| Pick {
                index: c.index,
                reason: "distinct wording".to_owned(),
                title: Some(truncate_chars(&c.text, 30)),
                themes: Vec::new(),
            })
            .collect())
    }

    async fn rank_brands(
        &self,
        _media: MediaType,
        shortlists: &[BrandShortlist],
    ) -> Result<Vec<BrandRank>, LlmError> {
        self.record();
        if self.fail_ranking {
            return Err(Self::unavailable("rank_brands"));
        }
        let mut ordered: Vec<&BrandShortlist> = shortlists.iter().collect();
        ordered.sort_by(|a, b| {
            b.entries
                .len()
                .cmp(&a.entries.len())
                .then_with(|| a.brand.cmp(&b.brand))
        });
        #[allow(clippy::cast_precision_loss)]
        let ranks = ordered
            .into_iter()
            .enumerate()
            .map(|(i, s)| BrandRank {
                brand: s.brand.clone(),
                rank: i + 1,
                score: (10.0 - i as f64 * 0.5).max(0.0),
                justification: format!("{} shortlisted items", s.entries.len()),
                examples: s
                    .entries
                    .first()
                    .map(|e| vec![truncate_chars(&e.text, 50)])
                    .unwrap_or_default(),
            })
            .collect();
        Ok(ranks)
    }

    async fn extract_advantages(
        &self,
        _media: MediaType,
        _brand: &str,
        text: &str,
    ) -> Result<Vec<Advantage>, LlmError> {
        self.record();
        if self.failing_texts.contains(text) {
            return Err(Self::unavailable("extract_advantages"));
        }
        if let Some(advantages) = self.advantages.get(text) {
            return Ok(advantages.clone());
        }
        let first_sentence = text.split(['.', '!', '?']).next().unwrap_or(text).trim();
        Ok(vec![Advantage {
            category: "General".to_owned(),
            evidence: first_sentence.to_owned(),
        }])
    }

    async fn content_pillars(
        &self,
        brand: &str,
        posts: &[Candidate],
    ) -> Result<Vec<Pillar>, LlmError> {
        self.record();
        if self.failing_brands.contains(brand) {
            return Err(Self::unavailable("content_pillars"));
        }
        Ok(vec![Pillar {
            theme: "Everyday Updates".to_owned(),
            description: format!("All posts by {brand}"),
            share: Some(100.0),
            posts_count: Some(posts.len()),
            subtopics: Vec::new(),
            examples: posts.iter().take(2).map(|p| p.text.clone()).collect(),
        }])
    }
    async fn score_affinity(&self, text: &str, persona: &Persona) -> Result<Vec<u8>, LlmError> {
        self.record();
        if self.failing_texts.contains(text) {
            return Err(Self::unavailable("score_affinity"));
        }
        if let Some(score) = self.affinity.get(text) {
            return Ok(vec![*score; persona.criteria.len()]);
        }
        let hash: usize = text.bytes().map(usize::from).sum();
        let scale = usize::from(MAX_AFFINITY_SCORE);
        Ok((0..persona.criteria.len())
            .map(|i| u8::try_from(1 + (hash + i) % scale).unwrap_or(1))
            .collect())
    }
}
