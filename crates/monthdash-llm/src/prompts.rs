//! Prompt text for each text-service task. Every builder returns `(system, user)`.

use std::fmt::Write as _;

use monthdash_core::MediaType;
use serde_json::json;

use crate::types::{BrandShortlist, Candidate, Persona, TaxonomyEntry, MAX_AFFINITY_SCORE};

/// Marker line the classifier must answer with.
pub const ARCHETYPE_MARKER: &str = "Top Archetype:";

/// Characters of each shortlisted text sent to the cross-brand ranking.
pub const CROSS_BRAND_TEXT_CHARS: usize = 300;

struct MediaVoice {
    analyst: &'static str,
    items: &'static str,
    item: &'static str,
    owner: &'static str,
}

fn voice(media: MediaType) -> MediaVoice {
    match media {
        MediaType::Ads => MediaVoice {
            analyst: "an advertising creativity analyst",
            items: "ads",
            item: "ad",
            owner: "brand",
        },
        MediaType::SocialMedia => MediaVoice {
            analyst: "a social media communications analyst",
            items: "posts",
            item: "post",
            owner: "company",
        },
        MediaType::Pr => MediaVoice {
            analyst: "a PR creativity analyst",
            items: "PR materials",
            item: "article",
            owner: "company",
        },
    }
}

#[must_use]
pub fn classify_prompt(taxonomy: &[TaxonomyEntry], text: &str) -> (String, String) {
    let mut system = String::from(
        "As a senior Public Relations and Branding Communication expert you are interested in \
         how companies are positioned by their content.\nYour task will be to analyze content \
         and assign the best-fitting archetype, based on the following framework:\n\n",
    );
    for (i, entry) in taxonomy.iter().enumerate() {
        let _ = writeln!(system, "{}. {} ({})", i + 1, entry.label, entry.description);
    }
    let _ = write!(
        system,
        "\nPlease make sure to always respond in the following format:\n\n{ARCHETYPE_MARKER} [Top Archetype]\n"
    );
    (system, text.to_owned())
}

#[must_use]
pub fn selection_prompt(
    media: MediaType,
    brand: &str,
    candidates: &[Candidate],
    top_k: usize,
) -> (String, String) {
    let v = voice(media);
    let system = format!(
        "You are {}. Given a SET of {} for one {}, pick the top K {} that are most original \
         RELATIVE to the rest of that set.",
        v.analyst, v.items, v.owner, v.items
    );

    let payload: Vec<_> = candidates
        .iter()
        .map(|c| json!({ "idx": c.index, "reach": c.reach, "text": c.text }))
        .collect();
    let user = format!(
        "Task: From the following {items} ({owner} \"{brand}\" only), choose the {top_k} most \
         ORIGINAL {items} relative to others in this set.\n\
         Originality definition: novel angle, unexpected framing, fresh creative device, or \
         distinct voice vs typical {items} AND vs peers in this set.\n\
         Rules:\n\
         - Judge ONLY on originality/creativity, not performance or reach.\n\
         - Avoid near-duplicates: if several {items} share one idea, pick at most one.\n\
         - Prefer diversity of creative ideas among the selected set.\n\
         - Indices MUST refer to the provided idx values.\n\n\
         Return STRICT JSON ONLY (no markdown) with key \"selected_details\": an array of \
         objects with idx (int), originality_reason (string), and optionally short_title \
         (string) and themes (array of strings).\n\n\
         {items} (JSON array):\n{payload}",
        items = v.items,
        owner = v.owner,
        payload = serde_json::Value::Array(payload),
    );
    (system, user)
}

#[must_use]
pub fn ranking_prompt(media: MediaType, shortlists: &[BrandShortlist]) -> (String, String) {
    let v = voice(media);
    let system = format!(
        "You are {}. Compare {}s by the originality of their best {}.",
        v.analyst, v.owner, v.items
    );

    let payload: Vec<_> = shortlists
        .iter()
        .map(|s| {
            let entries: Vec<_> = s
                .entries
                .iter()
                .map(|e| {
                    json!({
                        "text": truncate_chars(&e.text, CROSS_BRAND_TEXT_CHARS),
                        "reason": truncate_chars(&e.reason, CROSS_BRAND_TEXT_CHARS),
                    })
                })
                .collect();
            json!({ "brand": s.brand, "top_items": entries })
        })
        .collect();

    let user = format!(
        "You are given multiple {owner}s, each with a set of their top selected {items} \
         (already filtered for within-{owner} originality).\n\
         Rank {owner}s by overall originality/creativity compared to each other, considering:\n\
         - Depth of originality across the set\n\
         - Diversity of creative ideas\n\
         - Boldness/novelty vs typical category norms (based on text alone)\n\
         For each {owner} also include 2-3 short example snippets (max 100 characters each) \
         that illustrate the originality you describe.\n\
         Return STRICT JSON ONLY (no markdown) with key \"rankings\" = array of objects with \
         fields: brand (string, exactly as given), rank (int, 1 = most original), \
         originality_score (0-10, decimals allowed), justification (2-3 sentences), \
         examples (array of strings).\n\n\
         Brands payload (JSON array):\n{payload}",
        owner = v.owner,
        items = v.items,
        payload = serde_json::Value::Array(payload),
    );
    (system, user)
}

#[must_use]
pub fn advantages_prompt(media: MediaType, brand: &str, text: &str) -> (String, String) {
    let v = voice(media);
    let system = format!(
        "You are auditing {} content. Output only valid JSON. Only use explicit claims made in \
         the text.",
        v.items
    );
    let user = format!(
        "Extract the key advantages (benefits or strengths) that this {item} by \"{brand}\" \
         explicitly claims. Return 0-5 entries.\n\
         Each entry has: category (short English noun phrase, e.g. \"Convenience\", \"Price\", \
         \"Events\") and evidence (an EXACT quote from the text supporting it).\n\
         JSON format: {{\"advantages\": [{{\"category\": \"...\", \"evidence\": \"...\"}}]}}\n\n\
         {item} text:\n{text}",
        item = v.item,
    );
    (system, user)
}

#[must_use]
pub fn pillars_prompt(brand: &str, posts: &[Candidate]) -> (String, String) {
    let system = "You are performing a topical analysis of social media posts. Always respond \
                  in English, but keep quoted examples in their original language."
        .to_owned();

    let max_themes = match posts.len() {
        0..=10 => "2-3",
        11..=20 => "3-4",
        _ => "4-5",
    };
    let mut listing = String::new();
    for post in posts {
        let _ = writeln!(listing, "[{}] {}", post.index, post.text);
    }

    let user = format!(
        "Here are {count} posts by \"{brand}\":\n{listing}\n\
         Classify them into main themes. Be conservative: at most {max_themes} truly distinct \
         themes.\n\
         For each theme provide a name, a brief description, the share of posts, the number of \
         posts, 2-3 subtopics, and 2-3 EXACT QUOTES from the posts.\n\n\
         Format your response EXACTLY as follows:\n\n\
         THEME: [Theme Name]\n\
         DESCRIPTION: [Brief description of the theme]\n\
         SHARE: [Percentage of posts in this theme]%\n\
         POSTS_COUNT: [Number of posts in this theme]\n\
         SUBTOPICS:\n\
         - [Subtopic 1]: [Description]\n\
         - [Subtopic 2]: [Description]\n\
         POSTS:\n\
         - \"[Exact quote from a post]\"\n\
         - \"[Exact quote from another post]\"\n\n\
         Continue this format for all themes.",
        count = posts.len(),
    );
    (system, user)
}

#[must_use]
pub fn affinity_prompt(persona: &Persona, text: &str) -> (String, String) {
    let mut system = format!(
        "You will be provided with Facebook post content. You should look at the given content \
         from the perspective of {} ({}).\n\n\
         Evaluate each of the following points from 1 to {MAX_AFFINITY_SCORE}, where 1 = poorly \
         represented and {MAX_AFFINITY_SCORE} = strongly represented.\n\
         A 1 would mean that the post is not relevant to the audience, a {MAX_AFFINITY_SCORE} \
         would mean that the post is strongly relevant to the audience.\n\n",
        persona.name, persona.audience
    );
    for (i, criterion) in persona.criteria.iter().enumerate() {
        let _ = writeln!(system, "{}. {}: {}", i + 1, criterion.name, criterion.question);
    }
    system.push_str("\nRespond ONLY in the following format:\n");
    for criterion in &persona.criteria {
        let _ = writeln!(system, "{}: [score]", criterion.name);
    }
    (system, text.to_owned())
}

/// At most `limit` characters, with a trailing `…` when cut.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_owned(),
    }
}
