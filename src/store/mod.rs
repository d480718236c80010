//! Content store capability consumed by the importer.
//!
//! The importer never owns records. It talks to the host through the
//! [`ContentStore`] trait: record creation, attribute storage, term lookup
//! and creation, term assignment, and a single transaction scope.

mod memory;
mod sqlite;

pub use memory::{MemoryStore, StoredRecord, StoredTerm};
pub use sqlite::SqliteStore;

use crate::error::Result;
use serde::Serialize;

/// Identifier of a record in the content store.
pub type RecordId = i64;

/// Identifier of a taxonomy term in the content store.
pub type TermId = i64;

/// Publication status assigned to created records.
///
/// Imported records always start unpublished; an editor publishes them
/// in the host afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Not visible until an editor publishes it.
    #[default]
    Draft,
}

impl RecordStatus {
    /// Convert to the host's string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
        }
    }
}

/// Core fields of a record about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Opaque record type forwarded from the caller.
    pub record_type: String,
    /// Record title.
    pub title: String,
    /// Record body, when a column was mapped to it.
    pub body: Option<String>,
    /// Publication status.
    pub status: RecordStatus,
}

/// How a term is looked up in a taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermQuery<'a> {
    /// Existing term whose name or slug equals the value.
    NameOrSlug(&'a str),
    /// Term whose display name equals the value (case-insensitive).
    Name(&'a str),
    /// Term whose slug equals the value.
    Slug(&'a str),
}

/// Capability interface implemented by the host content store.
///
/// Mutating calls made between [`ContentStore::begin`] and
/// [`ContentStore::commit`] must become visible together, or not at all
/// after [`ContentStore::rollback`].
pub trait ContentStore {
    /// Create a record and return its identifier.
    fn create_record(&mut self, record: &NewRecord) -> Result<RecordId>;

    /// Set (insert or overwrite) an attribute on a record.
    fn set_attribute(&mut self, record: RecordId, key: &str, value: &str) -> Result<()>;

    /// Find an existing term.
    fn find_term(&self, taxonomy: &str, query: TermQuery<'_>) -> Result<Option<TermId>>;

    /// Create a new term in a taxonomy.
    fn create_term(&mut self, taxonomy: &str, name: &str) -> Result<TermId>;

    /// Replace the record's terms for one taxonomy.
    fn assign_terms(&mut self, record: RecordId, taxonomy: &str, terms: &[TermId]) -> Result<()>;

    /// Open the transaction scope.
    fn begin(&mut self) -> Result<()>;

    /// Make every change since `begin` durable.
    fn commit(&mut self) -> Result<()>;

    /// Discard every change since `begin`.
    fn rollback(&mut self) -> Result<()>;

    /// Number of records of the given type.
    fn record_count(&self, record_type: &str) -> Result<usize>;

    /// Attribute keys found on up to `limit` records of the given type.
    fn sample_attribute_keys(&self, record_type: &str, limit: usize) -> Result<Vec<String>>;

    /// Taxonomies that currently hold at least one term.
    fn known_taxonomies(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
