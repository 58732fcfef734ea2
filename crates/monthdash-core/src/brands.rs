use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::media::MediaType;
use crate::ConfigError;

/// Competitive grouping used by the dashboard brand selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    AkropolisLocation,
    BigPlayer,
    SmallerPlayer,
    OtherCity,
    Retail,
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cluster::AkropolisLocation => write!(f, "akropolis_location"),
            Cluster::BigPlayer => write!(f, "big_player"),
            Cluster::SmallerPlayer => write!(f, "smaller_player"),
            Cluster::OtherCity => write!(f, "other_city"),
            Cluster::Retail => write!(f, "retail"),
        }
    }
}

impl std::str::FromStr for Cluster {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "akropolis_location" | "akropolis" => Ok(Cluster::AkropolisLocation),
            "big_player" => Ok(Cluster::BigPlayer),
            "smaller_player" => Ok(Cluster::SmallerPlayer),
            "other_city" => Ok(Cluster::OtherCity),
            "retail" => Ok(Cluster::Retail),
            other => Err(ConfigError::Validation(format!("unknown cluster '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Canonical display name.
    pub name: String,
    pub cluster: Cluster,
    /// Raw brand strings, per media type, that resolve to this brand.
    #[serde(default)]
    pub aliases: BTreeMap<MediaType, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BrandsFile {
    pub brands: Vec<BrandConfig>,
}

/// Load and validate the brands configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brands(path: &Path) -> Result<BrandsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let brands_file: BrandsFile = serde_yaml::from_str(&content)?;

    validate_brands(&brands_file)?;

    Ok(brands_file)
}

fn validate_brands(brands_file: &BrandsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_aliases: HashMap<(MediaType, String), &str> = HashMap::new();

    for brand in &brands_file.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        let lower_name = brand.name.to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand name: '{}'",
                brand.name
            )));
        }

        for (media, aliases) in &brand.aliases {
            for alias in aliases {
                let key = (*media, alias.trim().to_string());
                if let Some(previous) = seen_aliases.insert(key, &brand.name) {
                    if previous != brand.name {
                        return Err(ConfigError::Validation(format!(
                            "{media} alias '{alias}' maps to both '{previous}' and '{}'",
                            brand.name
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Many-to-one raw brand string → canonical brand resolution, shared by
/// ingestion and dashboard metrics so both sides name brands identically.
#[derive(Debug, Clone, Default)]
pub struct BrandRegistry {
    aliases: HashMap<(MediaType, String), String>,
    clusters: HashMap<String, Cluster>,
}

impl BrandRegistry {
    #[must_use]
    pub fn new(file: &BrandsFile) -> Self {
        let mut aliases = HashMap::new();
        let mut clusters = HashMap::new();
        for brand in &file.brands {
            clusters.insert(brand.name.clone(), brand.cluster);
            for (media, raw) in &brand.aliases {
                for alias in raw {
                    aliases.insert((*media, alias.trim().to_string()), brand.name.clone());
                }
            }
        }
        Self { aliases, clusters }
    }

    /// Canonical name for `raw` as seen in `media` data.
    ///
    /// Unmapped strings resolve to themselves, trimmed. Canonical names resolve
    /// to themselves, so resolving twice is harmless.
    #[must_use]
    pub fn resolve(&self, media: MediaType, raw: &str) -> String {
        let cleaned = raw.trim();
        self.aliases
            .get(&(media, cleaned.to_string()))
            .cloned()
            .unwrap_or_else(|| cleaned.to_string())
    }

    #[must_use]
    pub fn cluster_of(&self, brand: &str) -> Option<Cluster> {
        self.clusters.get(brand).copied()
    }

    /// Whether `brand` belongs to any of `clusters`. An empty selection matches every brand.
    #[must_use]
    pub fn in_clusters(&self, brand: &str, clusters: &[Cluster]) -> bool {
        clusters.is_empty()
            || self
                .cluster_of(brand)
                .is_some_and(|c| clusters.contains(&c))
    }
}
