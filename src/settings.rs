use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PennyError, Result};

/// One category in the rule table. Keywords are lowercase substrings; the
/// table's declared order is the matching order, so `categories` is a list
/// rather than a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,
    #[serde(default = "default_uncategorised_label")]
    pub uncategorised_label: String,
    #[serde(default = "default_uncategorised_icon")]
    pub uncategorised_icon: String,
    #[serde(default = "default_itemised_threshold")]
    pub itemised_threshold: f64,
}

fn default_uncategorised_label() -> String {
    "Other / Uncategorised".to_string()
}

fn default_uncategorised_icon() -> String {
    "❓".to_string()
}

fn default_itemised_threshold() -> f64 {
    30.0
}

fn default_categories() -> Vec<CategoryRule> {
    let table: &[(&str, &str, &[&str])] = &[
        (
            "Groceries",
            "🛒",
            &["tesco", "sainsbury", "asda", "aldi", "lidl", "morrisons", "waitrose", "co-op", "ocado"],
        ),
        (
            "Eating Out",
            "🍽️",
            &["restaurant", "coffee", "cafe", "pret", "greggs", "nando", "mcdonald", "kfc", "deliveroo", "just eat", "uber eats", "pizza"],
        ),
        (
            "Transport",
            "🚆",
            &["tfl", "trainline", "rail", "uber", "bolt", "shell", "esso", "bp ", "parking"],
        ),
        (
            "Bills & Utilities",
            "💡",
            &["british gas", "octopus", "edf", "thames water", "council tax", "vodafone", "o2", "ee limited", "three", "virgin media", "sky", "bt group"],
        ),
        (
            "Entertainment",
            "🎬",
            &["netflix", "spotify", "disney", "prime video", "cinema", "steam", "playstation", "xbox"],
        ),
        (
            "Shopping",
            "🛍️",
            &["amazon", "ebay", "argos", "john lewis", "ikea", "zara", "h&m", "next retail"],
        ),
        (
            "Health",
            "🏥",
            &["boots", "pharmacy", "gym", "puregym", "dental", "optic"],
        ),
        (
            "Travel",
            "✈️",
            &["ryanair", "easyjet", "british airways", "booking.com", "airbnb", "hotel"],
        ),
        ("Cash", "🏧", &["atm", "cash withdrawal"]),
    ];
    table
        .iter()
        .map(|(name, icon, keywords)| CategoryRule {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            icon: icon.to_string(),
        })
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            uncategorised_label: default_uncategorised_label(),
            uncategorised_icon: default_uncategorised_icon(),
            itemised_threshold: default_itemised_threshold(),
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| PennyError::Settings(e.to_string()))?;
        Ok(settings.normalised())
    }

    /// Load from a JSON file, falling back to the built-in defaults when the
    /// file is missing or unreadable.
    pub fn load(path: &Path) -> Settings {
        if path.exists() {
            let content = std::fs::read_to_string(path).unwrap_or_default();
            Settings::from_json_str(&content).unwrap_or_default()
        } else {
            Settings::default()
        }
    }

    /// Keyword matching is case-insensitive via lowercase comparison, so
    /// keywords are lowercased once at load time.
    fn normalised(mut self) -> Self {
        for rule in &mut self.categories {
            for kw in &mut rule.keywords {
                *kw = kw.trim().to_lowercase();
            }
        }
        self
    }

    pub fn icon_for(&self, category: &str) -> &str {
        if category == self.uncategorised_label {
            return &self.uncategorised_icon;
        }
        self.categories
            .iter()
            .find(|rule| rule.name == category)
            .map(|rule| rule.icon.as_str())
            .unwrap_or("")
    }

    /// Every valid category name, the uncategorised label last.
    pub fn category_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.categories.iter().map(|r| r.name.clone()).collect();
        names.push(self.uncategorised_label.clone());
        names
    }
}
