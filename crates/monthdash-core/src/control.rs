//! Per-(media, analysis) enable switches, loaded from YAML.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::media::{AnalysisKind, MediaType};
use crate::ConfigError;

#[derive(Debug, Deserialize)]
struct ControlFile {
    #[serde(default)]
    control: BTreeMap<String, bool>,
}

/// Control-file key that switches PR ingestion to the agility monitoring exports.
pub const PR_AGILITY_KEY: &str = "pr_agility";

/// Immutable map of which analyses are enabled. Missing entries are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisControl {
    switches: BTreeMap<(MediaType, AnalysisKind), bool>,
    pr_agility: bool,
}

impl AnalysisControl {
    /// Build from `(media, kind, enabled)` triples.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if a pair is not supported
    /// (e.g. content pillars for ads).
    pub fn from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (MediaType, AnalysisKind, bool)>,
    {
        let mut switches = BTreeMap::new();
        for (media, kind, enabled) in entries {
            if !kind.supports(media) {
                return Err(ConfigError::Validation(format!(
                    "analysis '{kind}' is not available for media '{media}'"
                )));
            }
            switches.insert((media, kind), enabled);
        }
        Ok(Self {
            switches,
            pr_agility: false,
        })
    }

    /// Same switches, with PR ingestion reading the agility exports when `on`.
    #[must_use]
    pub fn with_pr_agility(mut self, on: bool) -> Self {
        self.pr_agility = on;
        self
    }

    /// Whether PR items come from `agility/*.xlsx` instead of the PR master file.
    #[must_use]
    pub fn pr_agility(&self) -> bool {
        self.pr_agility
    }

    /// Every supported pair enabled.
    #[must_use]
    pub fn all_enabled() -> Self {
        let switches = MediaType::ALL
            .into_iter()
            .flat_map(|m| AnalysisKind::ALL.into_iter().map(move |k| (m, k)))
            .filter(|(m, k)| k.supports(*m))
            .map(|pair| (pair, true))
            .collect();
        Self {
            switches,
            pr_agility: false,
        }
    }

    #[must_use]
    pub fn is_enabled(&self, media: MediaType, kind: AnalysisKind) -> bool {
        self.switches.get(&(media, kind)).copied().unwrap_or(false)
    }

    /// Enabled analyses for `media`, in [`AnalysisKind::ALL`] order.
    #[must_use]
    pub fn enabled_for(&self, media: MediaType) -> Vec<AnalysisKind> {
        AnalysisKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(media, *k))
            .collect()
    }

    /// Media types with at least one enabled analysis.
    #[must_use]
    pub fn active_media(&self) -> BTreeSet<MediaType> {
        self.switches
            .iter()
            .filter(|(_, on)| **on)
            .map(|((m, _), _)| *m)
            .collect()
    }

    /// Config keys of enabled analyses, e.g. `ads_compos`.
    #[must_use]
    pub fn enabled_keys(&self) -> Vec<String> {
        self.switches
            .iter()
            .filter(|(_, on)| **on)
            .map(|((m, k), _)| control_key(*m, *k))
            .collect()
    }

    /// Narrow to the given media/analysis subsets. `None` keeps everything.
    #[must_use]
    pub fn restricted(
        &self,
        media: Option<&[MediaType]>,
        kinds: Option<&[AnalysisKind]>,
    ) -> Self {
        let switches = self
            .switches
            .iter()
            .map(|(&(m, k), &on)| {
                let keep = media.is_none_or(|ms| ms.contains(&m))
                    && kinds.is_none_or(|ks| ks.contains(&k));
                ((m, k), on && keep)
            })
            .collect();
        Self {
            switches,
            pr_agility: self.pr_agility,
        }
    }
}

/// Config key for a pair, e.g. `social_media_content_pillars`.
#[must_use]
pub fn control_key(media: MediaType, kind: AnalysisKind) -> String {
    format!("{}_{}", media.as_str(), kind.as_str())
}

fn parse_control_key(key: &str) -> Result<(MediaType, AnalysisKind), ConfigError> {
    // `social_media` contains an underscore, so match media prefixes explicitly.
    for media in MediaType::ALL {
        if let Some(rest) = key
            .strip_prefix(media.as_str())
            .and_then(|r| r.strip_prefix('_'))
        {
            let kind = rest.parse::<AnalysisKind>().map_err(|_| {
                ConfigError::Validation(format!("unknown analysis in control key '{key}'"))
            })?;
            return Ok((media, kind));
        }
    }
    Err(ConfigError::Validation(format!(
        "unknown media in control key '{key}'"
    )))
}

/// Parse analysis control from a YAML string.
///
/// # Errors
///
/// Returns [`ConfigError`] on malformed YAML, unknown keys, or unsupported pairs.
pub fn parse_analysis_control(yaml: &str) -> Result<AnalysisControl, ConfigError> {
    let file: ControlFile = serde_yaml::from_str(yaml)?;
    let entries = file
        .control
        .iter()
        .filter(|(key, _)| key.as_str() != PR_AGILITY_KEY)
        .map(|(key, on)| parse_control_key(key).map(|(m, k)| (m, k, *on)))
        .collect::<Result<Vec<_>, _>>()?;
    let agility = file.control.get(PR_AGILITY_KEY).copied().unwrap_or(false);
    Ok(AnalysisControl::from_entries(entries)?.with_pr_agility(agility))
}

/// Load analysis control from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or fails validation.
pub fn load_analysis_control(path: &Path) -> Result<AnalysisControl, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_analysis_control(&content)
}
