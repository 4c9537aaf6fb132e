//! Keyword categorisation with persistent merchant overrides.
//!
//! Lookup precedence, first match wins:
//!   1. exact override on the full lowercased description
//!   2. exact override on the portion before the composite delimiter
//!   3. override key contained anywhere in the description (insertion order)
//!   4. category keyword contained in the description (rule-table order)
//!   5. the uncategorised label

use crate::overrides::OverrideTable;
use crate::settings::Settings;

/// Joins the parts of a composite description (e.g. Monzo's name, raw
/// description and type). Override keys are truncated at the first
/// occurrence, so one override covers every composite from that merchant.
pub const COMPOSITE_DELIMITER: &str = " | ";

/// Normalise a merchant string into the key stored in the override table:
/// lowercased, trimmed, truncated before the composite delimiter.
pub fn merchant_key(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let trimmed = lowered.trim();
    match trimmed.split_once(COMPOSITE_DELIMITER) {
        Some((head, _)) => head.trim().to_string(),
        None => trimmed.to_string(),
    }
}

pub fn categorise(description: &str, settings: &Settings, overrides: &OverrideTable) -> String {
    let lowered = description.to_lowercase();
    let desc = lowered.trim();

    if let Some(category) = overrides.get(desc) {
        return category.to_string();
    }
    if let Some((head, _)) = desc.split_once(COMPOSITE_DELIMITER) {
        if let Some(category) = overrides.get(head.trim()) {
            return category.to_string();
        }
    }
    for (key, category) in overrides.iter() {
        if desc.contains(key) {
            return category.to_string();
        }
    }
    for rule in &settings.categories {
        if rule.keywords.iter().any(|kw| desc.contains(kw.as_str())) {
            return rule.name.clone();
        }
    }
    settings.uncategorised_label.clone()
}
