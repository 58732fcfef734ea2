use monthdash_llm::prompts::truncate_chars;

/// Newlines and tabs become spaces; runs of whitespace collapse to one; ends trimmed.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text as submitted to the text service: normalized, then cut to `max_chars`.
#[must_use]
pub fn prepare(text: &str, max_chars: usize) -> String {
    truncate_chars(&normalize_whitespace(text), max_chars)
}

/// Key for within-brand duplicate detection.
#[must_use]
pub fn dedup_key(text: &str) -> String {
    normalize_whitespace(text).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_newlines_and_runs() {
        assert_eq!(normalize_whitespace("  Big\n\nsale\t today  "), "Big sale today");
    }

    #[test]
    fn prepare_truncates_after_normalizing() {
        assert_eq!(prepare("a  b\nc d", 5), "a b c…");
        assert_eq!(prepare("short", 100), "short");
    }

    #[test]
    fn dedup_key_ignores_case_and_spacing() {
        assert_eq!(dedup_key("Summer  SALE"), dedup_key("summer sale\n"));
    }
}
