//! Lenient parsing of model replies.

use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::types::{AffinityCriterion, Pillar, MAX_AFFINITY_SCORE};

/// Deserialize the first JSON object or array in `reply` that parses as `T`,
/// ignoring code fences and surrounding prose. Each `{`/`[` is tried in turn, so
/// brackets in the prose before the payload do not hide it.
///
/// # Errors
///
/// Returns [`LlmError::Unparseable`] if no JSON value of type `T` can be found.
pub fn parse_json<T: DeserializeOwned>(reply: &str, context: &str) -> Result<T, LlmError> {
    let mut last_error = None;
    for (start, _) in reply.match_indices(['{', '[']) {
        let mut values = serde_json::Deserializer::from_str(&reply[start..]).into_iter::<T>();
        match values.next() {
            Some(Ok(value)) => return Ok(value),
            Some(Err(e)) => last_error = Some(e.to_string()),
            None => {}
        }
    }
    Err(LlmError::Unparseable {
        context: context.to_owned(),
        reason: last_error.unwrap_or_else(|| "no JSON found".to_owned()),
    })
}

/// Match a `Top Archetype:`-style reply against `labels`.
///
/// Looks at the text after `marker` when present, otherwise the whole reply.
/// Matching ignores case, a leading list number such as `3.`, surrounding
/// punctuation, and a missing or extra leading `The `.
#[must_use]
pub fn match_label<'a>(reply: &str, marker: &str, labels: &'a [String]) -> Option<&'a str> {
    let lowered = reply.to_lowercase();
    let marker = marker.to_lowercase();
    let answer = lowered
        .find(&marker)
        .map_or(lowered.as_str(), |pos| &lowered[pos + marker.len()..]);
    let answer = answer.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let wanted = canonical(answer);
    if wanted.is_empty() {
        return None;
    }

    labels
        .iter()
        .find(|l| canonical(l) == wanted)
        .or_else(|| {
            // Longest label contained in the answer, for replies like "The Sage, because ...".
            labels
                .iter()
                .filter(|l| wanted.contains(&canonical(l)))
                .max_by_key(|l| l.len())
        })
        .map(String::as_str)
}

fn canonical(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')' || c == '-')
        .trim_matches(|c: char| !c.is_alphanumeric() && c != ' ')
        .trim()
        .to_lowercase();
    let without_article = trimmed.strip_prefix("the ").unwrap_or(&trimmed);
    without_article.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read `Criterion: score` lines. Returns one entry per criterion, in order,
/// `None` where no line names the criterion with a score from 1 to 7.
///
/// Names match case-insensitively and with straight or curly apostrophes; the
/// score is the first whole number after the name.
#[must_use]
pub fn parse_affinity_scores(reply: &str, criteria: &[AffinityCriterion]) -> Vec<Option<u8>> {
    let names: Vec<String> = criteria.iter().map(|c| fold_name(&c.name)).collect();
    let mut scores = vec![None; criteria.len()];

    for line in reply.lines() {
        let line = fold_name(line);
        for (slot, name) in scores.iter_mut().zip(&names) {
            if slot.is_some() {
                continue;
            }
            let Some(pos) = line.find(name.as_str()) else {
                continue;
            };
            *slot = line[pos + name.len()..]
                .split(|c: char| !c.is_ascii_digit())
                .filter(|word| !word.is_empty())
                .find_map(|word| word.parse::<u8>().ok())
                .filter(|n| (1..=MAX_AFFINITY_SCORE).contains(n));
        }
    }
    scores
}

fn fold_name(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(['*', '#', '-'])
        .replace(['\u{2019}', '\u{2018}'], "'")
        .to_lowercase()
}

/// Parse the `THEME:` / `DESCRIPTION:` / `SHARE:` / `POSTS_COUNT:` / `SUBTOPICS:` /
/// `POSTS:` block format. Unknown lines are ignored.
#[must_use]
pub fn parse_pillars(reply: &str) -> Vec<Pillar> {
    #[derive(PartialEq)]
    enum Section {
        None,
        Subtopics,
        Posts,
    }

    let mut pillars = Vec::new();
    let mut current: Option<Pillar> = None;
    let mut section = Section::None;

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let line = line.trim_start_matches(['*', '#']).trim();
        if let Some(rest) = line.strip_prefix("THEME:") {
            pillars.extend(current.take());
            current = Some(Pillar {
                theme: rest.trim().to_owned(),
                ..Pillar::default()
            });
            section = Section::None;
            continue;
        }
        let Some(pillar) = current.as_mut() else {
            continue;
        };
        if let Some(rest) = line.strip_prefix("DESCRIPTION:") {
            rest.trim().clone_into(&mut pillar.description);
        } else if let Some(rest) = line.strip_prefix("SHARE:") {
            pillar.share = rest.trim().trim_end_matches('%').trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("POSTS_COUNT:") {
            pillar.posts_count = rest.trim().parse().ok();
        } else if line.starts_with("SUBTOPICS:") {
            section = Section::Subtopics;
        } else if line.starts_with("POSTS:") {
            section = Section::Posts;
        } else if let Some(item) = line.strip_prefix("- ") {
            let item = item.trim();
            match section {
                Section::Subtopics => pillar.subtopics.push(item.to_owned()),
                Section::Posts => pillar.examples.push(item.trim_matches('"').to_owned()),
                Section::None => {}
            }
        }
    }
    pillars.extend(current);
    pillars.retain(|p| !p.theme.is_empty());
    pillars
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        picks: Vec<u32>,
    }

    fn labels() -> Vec<String> {
        ["The Sage", "The Hero", "The Everyman", "The Lover", "The Magician"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect()
    }

    #[test]
    fn json_inside_code_fence() {
        let reply = "Here you go:\n```json\n{\"picks\": [1, 2]}\n```";
        let parsed: Reply = parse_json(reply, "test").unwrap();
        assert_eq!(parsed.picks, vec![1, 2]);
    }

    #[test]
    fn bracket_in_prose_before_json() {
        #[derive(Debug, Deserialize)]
        struct Ranked {
            rankings: Vec<u32>,
        }
        let parsed: Ranked =
            parse_json("Final ranking [see below]:\n{\"rankings\": [1, 2]}", "rank").unwrap();
        assert_eq!(parsed.rankings, vec![1, 2]);

        let parsed: Reply = parse_json("Picks {as requested}: {\"picks\": [3]} done.", "select").unwrap();
        assert_eq!(parsed.picks, vec![3]);
    }

    #[test]
    fn wrong_shape_is_unparseable() {
        let err = parse_json::<Reply>("{\"other\": 1}", "select").unwrap_err();
        assert!(matches!(err, LlmError::Unparseable { .. }));
    }

    #[test]
    fn json_missing_is_unparseable() {
        let err = parse_json::<Reply>("no data", "select").unwrap_err();
        assert!(matches!(err, LlmError::Unparseable { ref context, .. } if context == "select"));
    }

    #[test]
    fn label_tolerates_number_case_and_article() {
        let l = labels();
        assert_eq!(match_label("Top Archetype: 3. the hero", "Top Archetype:", &l), Some("The Hero"));
        assert_eq!(match_label("Top Archetype: Everyman", "Top Archetype:", &l), Some("The Everyman"));
        assert_eq!(match_label("**Top Archetype:** THE SAGE.", "Top Archetype:", &l), Some("The Sage"));
    }

    #[test]
    fn label_found_in_longer_answer() {
        let l = labels();
        assert_eq!(
            match_label("Top Archetype: The Magician, since the ad transforms", "Top Archetype:", &l),
            Some("The Magician")
        );
    }

    #[test]
    fn unknown_label_is_none() {
        let l = labels();
        assert_eq!(match_label("Top Archetype: The Jester", "Top Archetype:", &l), None);
        assert_eq!(match_label("", "Top Archetype:", &l), None);
    }

    fn criteria(names: &[&str]) -> Vec<AffinityCriterion> {
        names
            .iter()
            .map(|n| AffinityCriterion {
                name: (*n).to_owned(),
                question: String::new(),
            })
            .collect()
    }

    #[test]
    fn affinity_scores_in_criterion_order() {
        let c = criteria(&[
            "Kids\u{2019} Products Relevance",
            "Kids\u{2019} Events & Activities",
            "Household Savings & Discounts",
        ]);
        let reply = "Household Savings & Discounts: 2\n\
                     **kids' products relevance:** [6]\n\
                     Kids\u{2019} Events & Activities: 7/7";
        assert_eq!(parse_affinity_scores(reply, &c), vec![Some(6), Some(7), Some(2)]);
    }

    #[test]
    fn affinity_ignores_list_numbers_and_out_of_range() {
        let c = criteria(&["Accessibility & Comfort", "Ambience & Design Quality"]);
        let reply = "1. Accessibility & Comfort: 9\n2. Ambience & Design Quality: 5";
        assert_eq!(parse_affinity_scores(reply, &c), vec![None, Some(5)]);
        assert_eq!(parse_affinity_scores("no idea", &c), vec![None, None]);
    }

    #[test]
    fn pillars_block_format() {
        let reply = r#"THEME: Family Events
DESCRIPTION: Weekend activities for families
SHARE: 40%
POSTS_COUNT: 4
SUBTOPICS:
- Kids workshops: Crafts and games
- Concerts: Live music
POSTS:
- "Join us this Saturday"
- "Free face painting"

THEME: Discounts
DESCRIPTION: Price promotions
SHARE: 60 %
POSTS_COUNT: six
POSTS:
- "-30% on shoes"
"#;
        let pillars = parse_pillars(reply);
        assert_eq!(pillars.len(), 2);
        assert_eq!(pillars[0].theme, "Family Events");
        assert_eq!(pillars[0].share, Some(40.0));
        assert_eq!(pillars[0].posts_count, Some(4));
        assert_eq!(pillars[0].subtopics.len(), 2);
        assert_eq!(pillars[0].examples, vec!["Join us this Saturday", "Free face painting"]);
        assert_eq!(pillars[1].share, Some(60.0));
        assert_eq!(pillars[1].posts_count, None);
        assert_eq!(pillars[1].examples, vec!["-30% on shoes"]);
    }

    #[test]
    fn pillars_ignore_preamble() {
        assert!(parse_pillars("Sorry, I cannot help with that.").is_empty());
    }
}
