//! Statement parsing and expense categorisation for personal banking.
//!
//! Upload a batch of bank or credit-card statement exports in whatever
//! tabular shape the institution produces; get back one normalised,
//! categorised, newest-first transaction list plus the display settings a
//! front end needs to render it. Hosting concerns (HTTP, CLI, storage) live
//! with the caller.
//!
//! ```no_run
//! use penny::{process_statements, OverrideStore, Settings, StatementFile};
//!
//! let settings = Settings::default();
//! let overrides = OverrideStore::open(std::path::Path::new("overrides.json"));
//! let files = vec![StatementFile::new(
//!     "march.csv",
//!     std::fs::read("march.csv").unwrap(),
//! )];
//! let report = process_statements(&files, &settings, &overrides).unwrap();
//! for txn in &report.transactions {
//!     println!("{} {} {:?}", txn.date, txn.description, txn.category);
//! }
//! ```

pub mod categorizer;
pub mod error;
pub mod importer;
pub mod models;
pub mod normalize;
pub mod overrides;
pub mod pipeline;
pub mod settings;

pub use error::{PennyError, Result};
pub use models::{Direction, RawRecord, Transaction};
pub use overrides::{OverrideStore, OverrideTable};
pub use pipeline::{process_statements, DisplayConfig, StatementFile, StatementReport};
pub use settings::{CategoryRule, Settings};
