//! Media types, their input spreadsheet schemas, and the analysis kinds run per media.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Ads,
    SocialMedia,
    Pr,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Ads, MediaType::SocialMedia, MediaType::Pr];

    /// Folder and config-key name: `ads`, `social_media`, or `pr`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Ads => "ads",
            MediaType::SocialMedia => "social_media",
            MediaType::Pr => "pr",
        }
    }

    /// Column layout of this media type's master input file.
    #[must_use]
    pub fn schema(self) -> &'static MediaSchema {
        match self {
            MediaType::Ads => &ADS_SCHEMA,
            MediaType::SocialMedia => &SOCIAL_MEDIA_SCHEMA,
            MediaType::Pr => &PR_SCHEMA,
        }
    }

    /// Word used in prompts and reports for one content item.
    #[must_use]
    pub fn item_noun(self) -> &'static str {
        match self {
            MediaType::Ads => "ads",
            MediaType::SocialMedia => "posts",
            MediaType::Pr => "articles",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ads" => Ok(MediaType::Ads),
            "social_media" | "social" => Ok(MediaType::SocialMedia),
            "pr" => Ok(MediaType::Pr),
            other => Err(ConfigError::Validation(format!("unknown media type '{other}'"))),
        }
    }
}

/// Fixed column names for one media type's master spreadsheet.
#[derive(Debug)]
pub struct MediaSchema {
    pub master_file: &'static str,
    pub text_column: &'static str,
    pub brand_column: &'static str,
    pub reach_column: &'static str,
    /// Source identifier column; a content hash is used when the column is absent.
    pub id_column: &'static str,
    /// Candidate publication-date columns, in priority order.
    pub date_columns: &'static [&'static str],
}

impl MediaSchema {
    /// Columns whose absence makes the input unusable.
    #[must_use]
    pub fn required_columns(&self) -> [&'static str; 3] {
        [self.text_column, self.brand_column, self.reach_column]
    }
}

static ADS_SCHEMA: MediaSchema = MediaSchema {
    master_file: "ads_master_file.xlsx",
    text_column: "snapshot/body/text",
    brand_column: "ad_details/advertiser/ad_library_page_info/page_info/page_name",
    reach_column: "ad_details/aaa_info/eu_total_reach",
    id_column: "ad_archive_id",
    date_columns: &["startDateFormatted"],
};

static SOCIAL_MEDIA_SCHEMA: MediaSchema = MediaSchema {
    master_file: "facebook_master_file.xlsx",
    text_column: "content",
    brand_column: "brand",
    reach_column: "likes",
    id_column: "post_id",
    date_columns: &[
        "created_date",
        "date",
        "created_at",
        "published_date",
        "timestamp",
    ],
};

static PR_SCHEMA: MediaSchema = MediaSchema {
    master_file: "pr_master_file.xlsx",
    text_column: "content",
    brand_column: "company",
    reach_column: "Impressions",
    id_column: "url",
    date_columns: &["date", "published_date", "created_at", "timestamp"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Archetype classification (CompOS).
    Compos,
    Creativity,
    KeyAdvantages,
    ContentPillars,
    /// Persona relevance scoring (top-2-box).
    AudienceAffinity,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 5] = [
        AnalysisKind::Compos,
        AnalysisKind::Creativity,
        AnalysisKind::KeyAdvantages,
        AnalysisKind::ContentPillars,
        AnalysisKind::AudienceAffinity,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Compos => "compos",
            AnalysisKind::Creativity => "creativity",
            AnalysisKind::KeyAdvantages => "key_advantages",
            AnalysisKind::ContentPillars => "content_pillars",
            AnalysisKind::AudienceAffinity => "audience_affinity",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            AnalysisKind::Compos => "CompOS Analysis",
            AnalysisKind::Creativity => "Creativity Analysis",
            AnalysisKind::KeyAdvantages => "Key Advantages",
            AnalysisKind::ContentPillars => "Content Pillars",
            AnalysisKind::AudienceAffinity => "Audience Affinity",
        }
    }

    /// Whether this analysis is defined for `media`. Content pillars and
    /// audience affinity are social-only.
    #[must_use]
    pub fn supports(self, media: MediaType) -> bool {
        match self {
            AnalysisKind::ContentPillars | AnalysisKind::AudienceAffinity => {
                media == MediaType::SocialMedia
            }
            AnalysisKind::Compos | AnalysisKind::Creativity | AnalysisKind::KeyAdvantages => true,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compos" => Ok(AnalysisKind::Compos),
            "creativity" => Ok(AnalysisKind::Creativity),
            "key_advantages" => Ok(AnalysisKind::KeyAdvantages),
            "content_pillars" => Ok(AnalysisKind::ContentPillars),
            "audience_affinity" => Ok(AnalysisKind::AudienceAffinity),
            other => Err(ConfigError::Validation(format!(
                "unknown analysis type '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_round_trips_through_str() {
        for media in MediaType::ALL {
            assert_eq!(media.as_str().parse::<MediaType>().unwrap(), media);
        }
    }

    #[test]
    fn social_alias_is_accepted() {
        assert_eq!("social".parse::<MediaType>().unwrap(), MediaType::SocialMedia);
    }

    #[test]
    fn unknown_media_is_rejected() {
        assert!("tv".parse::<MediaType>().is_err());
    }

    #[test]
    fn content_pillars_only_supported_for_social() {
        assert!(AnalysisKind::ContentPillars.supports(MediaType::SocialMedia));
        assert!(!AnalysisKind::ContentPillars.supports(MediaType::Ads));
        assert!(!AnalysisKind::ContentPillars.supports(MediaType::Pr));
        assert!(AnalysisKind::Compos.supports(MediaType::Pr));
    }

    #[test]
    fn audience_affinity_is_social_only() {
        assert!(AnalysisKind::AudienceAffinity.supports(MediaType::SocialMedia));
        assert!(!AnalysisKind::AudienceAffinity.supports(MediaType::Ads));
        assert!(!AnalysisKind::AudienceAffinity.supports(MediaType::Pr));
        assert_eq!(
            "audience_affinity".parse::<AnalysisKind>().unwrap(),
            AnalysisKind::AudienceAffinity
        );
    }

    #[test]
    fn pr_schema_requires_content_column() {
        assert!(MediaType::Pr
            .schema()
            .required_columns()
            .contains(&"content"));
    }
}
