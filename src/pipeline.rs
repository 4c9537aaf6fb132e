//! Batch orchestration: files in, categorised and sorted transactions out.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::categorizer::categorise;
use crate::error::{PennyError, Result};
use crate::importer::parse_statement;
use crate::models::Transaction;
use crate::overrides::OverrideStore;
use crate::settings::Settings;

/// One uploaded statement: the filename drives format dispatch
/// (spreadsheet vs delimited text).
#[derive(Debug, Clone)]
pub struct StatementFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl StatementFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Everything the display layer needs to render a report without touching
/// the rule table itself.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayConfig {
    pub itemised_threshold: f64,
    pub icons: HashMap<String, String>,
    pub uncategorised_label: String,
    pub uncategorised_icon: String,
    pub categories: Vec<String>,
}

impl DisplayConfig {
    fn from_settings(settings: &Settings) -> Self {
        let icons = settings
            .categories
            .iter()
            .map(|rule| (rule.name.clone(), rule.icon.clone()))
            .collect();
        Self {
            itemised_threshold: settings.itemised_threshold,
            icons,
            uncategorised_label: settings.uncategorised_label.clone(),
            uncategorised_icon: settings.uncategorised_icon.clone(),
            categories: settings.category_names(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementReport {
    pub transactions: Vec<Transaction>,
    pub display: DisplayConfig,
}

/// Process a batch of uploaded statements.
///
/// Each file runs through the parser chain independently; a file nothing can
/// read contributes zero rows rather than failing the batch. The merged set
/// is categorised against a snapshot of the override table taken here, then
/// sorted newest-first (stable, so equal dates keep their file order).
pub fn process_statements(
    files: &[StatementFile],
    settings: &Settings,
    overrides: &OverrideStore,
) -> Result<StatementReport> {
    if files.is_empty() {
        return Err(PennyError::NoFiles);
    }
    let table = overrides.snapshot();

    let mut transactions: Vec<Transaction> = Vec::new();
    for file in files {
        match parse_statement(&file.bytes, &file.name) {
            Ok(rows) => {
                if rows.is_empty() {
                    debug!("no transactions recognised in {}", file.name);
                }
                transactions.extend(rows);
            }
            Err(e) => {
                warn!("skipping unreadable statement {}: {e}", file.name);
            }
        }
    }

    for txn in &mut transactions {
        txn.category = Some(categorise(&txn.description, settings, &table));
    }
    transactions.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(StatementReport {
        transactions,
        display: DisplayConfig::from_settings(settings),
    })
}
