//! Subtype → category mapping.
//!
//! Nodes may be authored with a strict category in their `type` field or
//! with only a free-form subtype name. Resolution order:
//!
//! 1. An explicit `type` that is exactly a category name wins.
//! 2. A known subtype from [`KNOWN_SUBTYPES`].
//! 3. Fuzzy match on the subtype: contains `trigger`, `action`, `logic`,
//!    `ai`, in that order. Words listed in [`AI_LOOKALIKES`] (`mail`,
//!    `detail`, ...) are masked before the `ai` check.
//! 4. Fall back to [`Category::Action`].
//!
//! This never fails. Callers resolve once when the node is built and keep
//! the resulting [`Category`].

use tracing::debug;

use crate::Category;

/// Subtypes shipped with the editor palette and template catalog.
pub const KNOWN_SUBTYPES: &[(&str, Category)] = &[
    ("email-trigger", Category::Trigger),
    ("gmail-trigger", Category::Trigger),
    ("schedule-trigger", Category::Trigger),
    ("webhook-trigger", Category::Trigger),
    ("trello-action", Category::Action),
    ("asana-action", Category::Action),
    ("email-action", Category::Action),
    ("condition", Category::Logic),
    ("if-else", Category::Logic),
    ("filter", Category::Logic),
    ("ai-tagger", Category::Ai),
    ("ai-classifier", Category::Ai),
    ("ai-summarizer", Category::Ai),
];

/// Ordinary words that contain `ai` without naming an AI step.
pub const AI_LOOKALIKES: &[&str] = &[
    "mail", "detail", "retail", "wait", "chain", "domain", "contain", "maintain", "plain",
    "rain", "fail", "avail", "paid", "said", "raise",
];

/// Resolve the category of a node from its `type` field and subtype.
pub fn infer_category(explicit: Option<&str>, subtype: &str) -> Category {
    if let Some(category) = explicit.and_then(|t| t.parse::<Category>().ok()) {
        return category;
    }

    let subtype = subtype.trim().to_ascii_lowercase();

    if let Some((_, category)) = KNOWN_SUBTYPES.iter().find(|(name, _)| *name == subtype) {
        return *category;
    }

    if let Some(category) = fuzzy_match(&subtype) {
        debug!(subtype = %subtype, %category, "category inferred from subtype name");
        return category;
    }

    debug!(subtype = %subtype, explicit = ?explicit, "no category match, defaulting to action");
    Category::Action
}

fn fuzzy_match(subtype: &str) -> Option<Category> {
    for category in [Category::Trigger, Category::Action, Category::Logic] {
        if subtype.contains(category.as_str()) {
            return Some(category);
        }
    }

    let masked = AI_LOOKALIKES
        .iter()
        .fold(subtype.to_owned(), |acc, word| acc.replace(word, "-"));
    masked.contains("ai").then_some(Category::Ai)
}
