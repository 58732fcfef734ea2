use serde::{Deserialize, Serialize};

/// One label of a closed classification taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyEntry {
    pub label: String,
    pub description: String,
}

impl TaxonomyEntry {
    #[must_use]
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// An item offered to the service, addressed by its position in the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub text: String,
    pub reach: f64,
}

/// A within-brand selection (ranking stage a).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    #[serde(alias = "idx")]
    pub index: usize,
    #[serde(default, alias = "originality_reason")]
    pub reason: String,
    #[serde(default, alias = "short_title")]
    pub title: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

/// A brand's stage-(a) winners, submitted for cross-brand ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandShortlist {
    pub brand: String,
    pub entries: Vec<ShortlistEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortlistEntry {
    pub text: String,
    pub reason: String,
}

/// Cross-brand ranking result for one brand (ranking stage b).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandRank {
    pub brand: String,
    pub rank: usize,
    /// Originality score on a 0–10 scale.
    #[serde(alias = "originality_score")]
    pub score: f64,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// One extracted (category, evidence span) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advantage {
    pub category: String,
    pub evidence: String,
}

/// A recurring content theme for a brand's posts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pillar {
    pub theme: String,
    pub description: String,
    /// Share of posts, in percent.
    pub share: Option<f64>,
    pub posts_count: Option<usize>,
    /// `name: description` lines.
    pub subtopics: Vec<String>,
    /// Quoted example posts.
    pub examples: Vec<String>,
}

/// Score given to a criterion the reply leaves out.
pub const NEUTRAL_AFFINITY_SCORE: u8 = 4;

/// Highest score on the 1–7 affinity scale.
pub const MAX_AFFINITY_SCORE: u8 = 7;

/// An audience whose interest in a post is rated on a few criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    /// Who belongs to the audience, e.g. "parents, caregivers".
    pub audience: String,
    pub criteria: Vec<AffinityCriterion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityCriterion {
    /// Name the reply must repeat before the score.
    pub name: String,
    pub question: String,
}
