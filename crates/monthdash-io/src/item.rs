use chrono::NaiveDate;
use monthdash_core::MediaType;
use sha2::{Digest, Sha256};

/// One ad, post, or article after loading, cleaning, and brand normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub media: MediaType,
    /// Source identifier, or `sha:<hex>` of the text when the source has none.
    pub source_id: String,
    /// Brand string as it appeared in the input.
    pub raw_brand: String,
    /// Canonical brand name.
    pub brand: String,
    pub text: String,
    /// Reach or engagement figure; meaning depends on `media`.
    pub reach: f64,
    pub published: Option<NaiveDate>,
    /// Zero-based position in the loaded input, used as a stable tiebreaker.
    pub position: usize,
}

/// Content-derived identifier for items whose source row carries no id.
#[must_use]
pub fn content_id(media: MediaType, brand: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(media.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(brand.as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!("sha:{hex}")
}
