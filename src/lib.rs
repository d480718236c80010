//! Porygon: all-or-nothing spreadsheet import into a content store.
//!
//! This library reads uploaded CSV files, maps columns to record fields,
//! attributes, and taxonomy terms, validates every row up front, and then
//! creates the records inside one store transaction. A batch is either
//! imported completely or not at all.

#![warn(missing_docs)]
// env_logger is used by src/main.rs (binary), not this library
#![expect(unused_crate_dependencies)]

pub mod cli;
pub mod error;
pub mod import;
pub mod mapping;
pub mod reader;
pub mod store;
pub mod terms;
pub mod validate;

/// Re-export common error types for convenience.
pub use error::{PorygonError, Result};

/// Re-export the importer entry points for convenience.
pub use import::{ImportOptions, ImportReport, Importer};

/// Porygon version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
