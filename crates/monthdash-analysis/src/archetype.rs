//! The fixed CompOS archetype taxonomy.

use monthdash_llm::TaxonomyEntry;

/// Label recorded for items with no text. Never sent to the text service.
pub const NO_CONTENT: &str = "No Content";

/// Label recorded for items whose classification failed after retries.
pub const UNCLASSIFIED: &str = "Unclassified";

/// The 16 archetypes with their descriptors, in presentation order.
pub const ARCHETYPES: [(&str, &str); 16] = [
    ("The Futurist", "innovative, disruptive, pioneering, visionary"),
    ("The Eco Warrior", "ecological, sustainable, environmental, renewable"),
    ("The Technologist", "technological, automated, smart, integrated"),
    ("The Mentor", "guiding, insightful, informative, supportive"),
    ("The Collaborator", "community, collaborative, teamwork, partner"),
    ("The People's Champion", "democratic, inclusive, empowering, friendly"),
    ("The Nurturer", "caring, understanding, nurturing, encouraging"),
    ("The Simplifier", "simple, easy, simplifying, effortless"),
    ("The Expert", "intelligent, expert, specialized, scientific"),
    ("The Value-Seeker", "cost-effective, affordable, economical, low-cost"),
    ("The Personalizer", "adaptive, tailored, personalized, customized"),
    ("The Accelerator", "agile, instant, fast, enabling"),
    ("The Guardian", "safe, secure, dependable, encrypted"),
    ("The Principled", "honest, transparent, fair, responsible"),
    ("The Jet-Setter", "global, international, largest, leading"),
    ("The Optimizer", "efficient, optimized, streamlined, frictionless"),
];

#[must_use]
pub fn taxonomy() -> Vec<TaxonomyEntry> {
    ARCHETYPES
        .iter()
        .map(|(label, descriptors)| TaxonomyEntry::new(*label, *descriptors))
        .collect()
}

/// Position of `label` in [`ARCHETYPES`], used to order columns and break ties.
#[must_use]
pub fn position(label: &str) -> Option<usize> {
    ARCHETYPES.iter().position(|(l, _)| *l == label)
}
