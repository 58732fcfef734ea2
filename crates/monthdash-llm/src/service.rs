//! The text-service capability used by every analysis, and its chat-API implementation.

use async_trait::async_trait;
use monthdash_core::MediaType;
use serde::Deserialize;

use crate::client::ChatClient;
use crate::error::LlmError;
use crate::parse::{match_label, parse_affinity_scores, parse_json, parse_pillars};
use crate::prompts;
use crate::types::{
    Advantage, BrandRank, BrandShortlist, Candidate, Persona, Pick, Pillar, TaxonomyEntry,
    NEUTRAL_AFFINITY_SCORE,
};

/// External text classification, ranking and extraction.
///
/// Implementations make one request per call and do not retry; callers wrap
/// calls in [`crate::retry::retry_with_backoff`].
#[async_trait]
pub trait TextService: Send + Sync {
    /// Assign `text` exactly one label from `taxonomy`, returned verbatim.
    async fn classify(&self, text: &str, taxonomy: &[TaxonomyEntry]) -> Result<String, LlmError>;

    /// Choose up to `top_k` of `candidates` (one brand) as most original.
    async fn select_top(
        &self,
        media: MediaType,
        brand: &str,
        candidates: &[Candidate],
        top_k: usize,
    ) -> Result<Vec<Pick>, LlmError>;

    /// Rank brands against each other from their shortlists.
    async fn rank_brands(
        &self,
        media: MediaType,
        shortlists: &[BrandShortlist],
    ) -> Result<Vec<BrandRank>, LlmError>;

    /// Extract (category, evidence) pairs claimed by one item.
    async fn extract_advantages(
        &self,
        media: MediaType,
        brand: &str,
        text: &str,
    ) -> Result<Vec<Advantage>, LlmError>;

    /// Group a brand's posts into content pillars.
    async fn content_pillars(
        &self,
        brand: &str,
        posts: &[Candidate],
    ) -> Result<Vec<Pillar>, LlmError>;

    /// Rate `text` from 1 to 7 on each of `persona`'s criteria, in order.
    async fn score_affinity(&self, text: &str, persona: &Persona) -> Result<Vec<u8>, LlmError>;
}

#[derive(Deserialize)]
struct SelectionReply {
    #[serde(default)]
    selected_details: Vec<Pick>,
    #[serde(default)]
    selected_topk: Vec<usize>,
}

#[derive(Deserialize)]
struct RankingReply {
    rankings: Vec<BrandRank>,
}

#[derive(Deserialize)]
struct AdvantagesReply {
    #[serde(default)]
    advantages: Vec<Advantage>,
}

/// [`TextService`] backed by a chat-completions model.
#[derive(Debug)]
pub struct ChatTextService {
    client: ChatClient,
}

impl ChatTextService {
    #[must_use]
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextService for ChatTextService {
    async fn classify(&self, text: &str, taxonomy: &[TaxonomyEntry]) -> Result<String, LlmError> {
        let (system, user) = prompts::classify_prompt(taxonomy, text);
        let reply = self.client.complete("classify", &system, &user).await?;

        let labels: Vec<String> = taxonomy.iter().map(|t| t.label.clone()).collect();
        match_label(&reply, prompts::ARCHETYPE_MARKER, &labels)
            .map(str::to_owned)
            .ok_or_else(|| LlmError::Unparseable {
                context: "classify".to_owned(),
                reason: format!("no known label in '{}'", prompts::truncate_chars(&reply, 120)),
            })
    }

    async fn select_top(
        &self,
        media: MediaType,
        brand: &str,
        candidates: &[Candidate],
        top_k: usize,
    ) -> Result<Vec<Pick>, LlmError> {
        let (system, user) = prompts::selection_prompt(media, brand, candidates, top_k);
        let reply = self.client.complete("select_top", &system, &user).await?;
        let parsed: SelectionReply = parse_json(&reply, "select_top")?;

        // Older answers list bare indices without details.
        let picks = if parsed.selected_details.is_empty() {
            parsed
                .selected_topk
                .into_iter()
                .map(|index| Pick {
                    index,
                    reason: String::new(),
                    title: None,
                    themes: Vec::new(),
                })
                .collect()
        } else {
            parsed.selected_details
        };
        Ok(picks)
    }

    async fn rank_brands(
        &self,
        media: MediaType,
        shortlists: &[BrandShortlist],
    ) -> Result<Vec<BrandRank>, LlmError> {
        let (system, user) = prompts::ranking_prompt(media, shortlists);
        let reply = self.client.complete("rank_brands", &system, &user).await?;
        let parsed: RankingReply = parse_json(&reply, "rank_brands")?;
        if parsed.rankings.is_empty() {
            return Err(LlmError::Unparseable {
                context: "rank_brands".to_owned(),
                reason: "empty rankings".to_owned(),
            });
        }
        Ok(parsed.rankings)
    }

    async fn extract_advantages(
        &self,
        media: MediaType,
        brand: &str,
        text: &str,
    ) -> Result<Vec<Advantage>, LlmError> {
        let (system, user) = prompts::advantages_prompt(media, brand, text);
        let reply = self
            .client
            .complete("extract_advantages", &system, &user)
            .await?;
        let parsed: AdvantagesReply = parse_json(&reply, "extract_advantages")?;
        Ok(parsed.advantages)
    }

    async fn content_pillars(
        &self,
        brand: &str,
        posts: &[Candidate],
    ) -> Result<Vec<Pillar>, LlmError> {
        let (system, user) = prompts::pillars_prompt(brand, posts);
        let reply = self.client.complete("content_pillars", &system, &user).await?;
        let pillars = parse_pillars(&reply);
        if pillars.is_empty() {
            return Err(LlmError::Unparseable {
                context: "content_pillars".to_owned(),
                reason: "no THEME blocks".to_owned(),
            });
        }
        Ok(pillars)
    }

    async fn score_affinity(&self, text: &str, persona: &Persona) -> Result<Vec<u8>, LlmError> {
        let (system, user) = prompts::affinity_prompt(persona, text);
        let reply = self.client.complete("score_affinity", &system, &user).await?;
        let scores = parse_affinity_scores(&reply, &persona.criteria);
        if scores.iter().all(Option::is_none) {
            return Err(LlmError::Unparseable {
                context: "score_affinity".to_owned(),
                reason: format!("no scores in '{}'", prompts::truncate_chars(&reply, 120)),
            });
        }
        let missing = scores.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            tracing::debug!(persona = %persona.name, missing, "affinity criteria defaulted to neutral");
        }
        Ok(scores
            .into_iter()
            .map(|s| s.unwrap_or(NEUTRAL_AFFINITY_SCORE))
            .collect())
    }
}
