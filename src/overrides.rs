//! Merchant -> category overrides, persisted as a JSON document.
//!
//! The table is small and write-rare: writes take a mutex, mutate the
//! in-memory table and rewrite the whole file. Readers take a snapshot at
//! the start of a request and never block on writers afterwards.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::categorizer::merchant_key;
use crate::error::{PennyError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OverrideEntry {
    merchant: String,
    category: String,
}

/// Insertion-ordered override table. Order matters: the categoriser's
/// substring scan takes the first matching key, so this is a list rather
/// than a map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideTable {
    entries: Vec<OverrideEntry>,
}

impl OverrideTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.merchant == key)
            .map(|e| e.category.as_str())
    }

    /// Store under the normalised merchant key. An existing key keeps its
    /// position; last write wins on the category.
    pub fn set(&mut self, merchant: &str, category: &str) {
        let key = merchant_key(merchant);
        let category = category.trim();
        match self.entries.iter_mut().find(|e| e.merchant == key) {
            Some(entry) => entry.category = category.to_string(),
            None => self.entries.push(OverrideEntry {
                merchant: key,
                category: category.to_string(),
            }),
        }
    }

    pub fn remove(&mut self, merchant: &str) {
        let key = merchant_key(merchant);
        self.entries.retain(|e| e.merchant != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.merchant.as_str(), e.category.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns the override table and its on-disk copy. Injected into the pipeline
/// rather than held as process-wide state, so tests can run isolated stores.
pub struct OverrideStore {
    path: Option<PathBuf>,
    table: Mutex<OverrideTable>,
}

impl OverrideStore {
    /// Open a file-backed store, loading any existing table. A missing or
    /// unreadable file starts empty rather than failing.
    pub fn open(path: &Path) -> Self {
        let table = if path.exists() {
            let content = std::fs::read_to_string(path).unwrap_or_default();
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            OverrideTable::default()
        };
        Self {
            path: Some(path.to_path_buf()),
            table: Mutex::new(table),
        }
    }

    /// A store that never touches disk, for tests and ephemeral sessions.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            table: Mutex::new(OverrideTable::default()),
        }
    }

    /// Read-only copy of the current table for one request's categorisation.
    pub fn snapshot(&self) -> OverrideTable {
        self.table.lock().expect("override table lock").clone()
    }

    /// Record one merchant -> category override. Validation happens before
    /// any mutation; a persistence failure is logged and the in-memory write
    /// still takes effect for this process.
    pub fn record(&self, merchant: &str, category: &str) -> Result<()> {
        let key = merchant_key(merchant);
        if key.is_empty() {
            return Err(PennyError::InvalidOverride("merchant is required".into()));
        }
        if category.trim().is_empty() {
            return Err(PennyError::InvalidOverride("category is required".into()));
        }
        let mut table = self.table.lock().expect("override table lock");
        table.set(merchant, category);
        self.persist(&table);
        Ok(())
    }

    pub fn forget(&self, merchant: &str) {
        let mut table = self.table.lock().expect("override table lock");
        table.remove(merchant);
        self.persist(&table);
    }

    pub fn clear(&self) {
        let mut table = self.table.lock().expect("override table lock");
        table.entries.clear();
        self.persist(&table);
    }

    fn persist(&self, table: &OverrideTable) {
        let Some(path) = &self.path else {
            return;
        };
        let result = (|| -> Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(table)
                .map_err(|e| PennyError::Settings(e.to_string()))?;
            std::fs::write(path, format!("{json}\n"))?;
            Ok(())
        })();
        if let Err(e) = result {
            warn!("failed to persist overrides to {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_last_write_wins() {
        let mut table = OverrideTable::default();
        table.set("Tesco", "Grocery");
        table.set("PRET A MANGER", "Eating Out");
        assert_eq!(table.get("tesco"), Some("Grocery"));
        table.set("tesco", "Shopping");
        assert_eq!(table.get("tesco"), Some("Shopping"));
        assert_eq!(table.len(), 2);
        // Updating keeps insertion position
        assert_eq!(table.iter().next().unwrap().0, "tesco");
    }

    #[test]
    fn test_set_truncates_composite_merchant() {
        let mut table = OverrideTable::default();
        table.set("Tesco | TESCO EXPRESS | Card payment", "Grocery");
        assert_eq!(table.get("tesco"), Some("Grocery"));
    }

    #[test]
    fn test_record_validates_before_mutating() {
        let store = OverrideStore::in_memory();
        assert!(store.record("", "Grocery").is_err());
        assert!(store.record("   ", "Grocery").is_err());
        assert!(store.record("tesco", "  ").is_err());
        assert!(store.snapshot().is_empty());
        store.record("tesco", "Grocery").unwrap();
        assert_eq!(store.snapshot().get("tesco"), Some("Grocery"));
    }

    #[test]
    fn test_clear_then_read_is_empty() {
        let store = OverrideStore::in_memory();
        store.record("tesco", "Grocery").unwrap();
        store.record("pret", "Eating Out").unwrap();
        store.clear();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_forget_removes_single_entry() {
        let store = OverrideStore::in_memory();
        store.record("tesco", "Grocery").unwrap();
        store.record("pret", "Eating Out").unwrap();
        store.forget("TESCO");
        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("tesco"), None);
        assert_eq!(snapshot.get("pret"), Some("Eating Out"));
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        {
            let store = OverrideStore::open(&path);
            store.record("tesco", "Grocery").unwrap();
        }
        let reopened = OverrideStore::open(&path);
        assert_eq!(reopened.snapshot().get("tesco"), Some("Grocery"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, "{definitely not json").unwrap();
        let store = OverrideStore::open(&path);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_unwritable_store_still_updates_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        // Parent "directory" is a plain file, so the write must fail
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = OverrideStore::open(&blocker.join("overrides.json"));
        store.record("tesco", "Grocery").unwrap();
        assert_eq!(store.snapshot().get("tesco"), Some("Grocery"));
    }
}
