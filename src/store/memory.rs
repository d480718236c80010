//! In-memory content store.
//!
//! Used by tests and by callers that want to preview an import without a
//! database. Transactions are implemented by snapshotting on `begin` and
//! restoring the snapshot on `rollback`.

use super::{ContentStore, NewRecord, RecordId, RecordStatus, TermId, TermQuery};
use crate::error::{PorygonError, Result};
use crate::terms::term_slug;
use std::collections::BTreeMap;

/// A record held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Record identifier.
    pub id: RecordId,
    /// Record type.
    pub record_type: String,
    /// Title.
    pub title: String,
    /// Body.
    pub body: Option<String>,
    /// Publication status.
    pub status: RecordStatus,
    /// Attributes, keyed by name.
    pub attributes: BTreeMap<String, String>,
    /// Assigned terms per taxonomy.
    pub terms: BTreeMap<String, Vec<TermId>>,
}

/// A taxonomy term held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTerm {
    /// Term identifier.
    pub id: TermId,
    /// Owning taxonomy.
    pub taxonomy: String,
    /// Display name.
    pub name: String,
    /// URL-safe slug, unique within the taxonomy.
    pub slug: String,
}

#[derive(Debug, Clone, Default)]
struct State {
    records: Vec<StoredRecord>,
    terms: Vec<StoredTerm>,
    next_record_id: RecordId,
    next_term_id: TermId,
}

/// Content store backed by plain vectors.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: State,
    snapshot: Option<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a term outside any transaction. Returns its identifier.
    pub fn with_term(&mut self, taxonomy: &str, name: &str) -> TermId {
        self.insert_term(taxonomy, name, term_slug(name))
    }

    /// Seed a term with an explicit slug.
    pub fn with_term_slug(&mut self, taxonomy: &str, name: &str, slug: &str) -> TermId {
        self.insert_term(taxonomy, name, slug.to_string())
    }

    /// All records, in creation order.
    pub fn records(&self) -> &[StoredRecord] {
        &self.state.records
    }

    /// All terms, in creation order.
    pub fn terms(&self) -> &[StoredTerm] {
        &self.state.terms
    }

    /// Look up a record by id.
    pub fn record(&self, id: RecordId) -> Option<&StoredRecord> {
        self.state.records.iter().find(|r| r.id == id)
    }

    /// Look up a term by taxonomy and exact name.
    pub fn term_named(&self, taxonomy: &str, name: &str) -> Option<&StoredTerm> {
        self.state
            .terms
            .iter()
            .find(|t| t.taxonomy == taxonomy && t.name == name)
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn insert_term(&mut self, taxonomy: &str, name: &str, slug: String) -> TermId {
        self.state.next_term_id += 1;
        let id = self.state.next_term_id;
        self.state.terms.push(StoredTerm {
            id,
            taxonomy: taxonomy.to_string(),
            name: name.to_string(),
            slug,
        });
        id
    }

    fn record_mut(&mut self, id: RecordId) -> Result<&mut StoredRecord> {
        self.state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PorygonError::Store(format!("Record {} does not exist", id)))
    }
}

impl ContentStore for MemoryStore {
    fn create_record(&mut self, record: &NewRecord) -> Result<RecordId> {
        self.state.next_record_id += 1;
        let id = self.state.next_record_id;
        self.state.records.push(StoredRecord {
            id,
            record_type: record.record_type.clone(),
            title: record.title.clone(),
            body: record.body.clone(),
            status: record.status,
            attributes: BTreeMap::new(),
            terms: BTreeMap::new(),
        });
        Ok(id)
    }

    fn set_attribute(&mut self, record: RecordId, key: &str, value: &str) -> Result<()> {
        self.record_mut(record)?
            .attributes
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn find_term(&self, taxonomy: &str, query: TermQuery<'_>) -> Result<Option<TermId>> {
        let mut candidates = self.state.terms.iter().filter(|t| t.taxonomy == taxonomy);
        let found = match query {
            TermQuery::NameOrSlug(value) => candidates.find(|t| t.name == value || t.slug == value),
            TermQuery::Name(value) => candidates.find(|t| t.name.eq_ignore_ascii_case(value)),
            TermQuery::Slug(value) => candidates.find(|t| t.slug == value),
        };
        Ok(found.map(|t| t.id))
    }

    fn create_term(&mut self, taxonomy: &str, name: &str) -> Result<TermId> {
        let slug = term_slug(name);
        if self
            .state
            .terms
            .iter()
            .any(|t| t.taxonomy == taxonomy && t.slug == slug)
        {
            return Err(PorygonError::Store(format!(
                "A term with slug '{}' already exists in taxonomy '{}'",
                slug, taxonomy
            )));
        }
        Ok(self.insert_term(taxonomy, name, slug))
    }

    fn assign_terms(&mut self, record: RecordId, taxonomy: &str, terms: &[TermId]) -> Result<()> {
        self.record_mut(record)?
            .terms
            .insert(taxonomy.to_string(), terms.to_vec());
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(PorygonError::Store(
                "A transaction is already open".to_string(),
            ));
        }
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| PorygonError::Store("No transaction to commit".to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| PorygonError::Store("No transaction to roll back".to_string()))?;
        self.state = snapshot;
        Ok(())
    }

    fn record_count(&self, record_type: &str) -> Result<usize> {
        Ok(self
            .state
            .records
            .iter()
            .filter(|r| r.record_type == record_type)
            .count())
    }

    fn sample_attribute_keys(&self, record_type: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .state
            .records
            .iter()
            .filter(|r| r.record_type == record_type)
            .take(limit)
            .flat_map(|r| r.attributes.keys().cloned())
            .collect())
    }

    fn known_taxonomies(&self) -> Result<Vec<String>> {
        let mut taxonomies: Vec<String> = Vec::new();
        for term in &self.state.terms {
            if !taxonomies.contains(&term.taxonomy) {
                taxonomies.push(term.taxonomy.clone());
            }
        }
        Ok(taxonomies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> NewRecord {
        NewRecord {
            record_type: "book".to_string(),
            title: title.to_string(),
            body: None,
            status: RecordStatus::Draft,
        }
    }

    #[test]
    fn test_rollback_discards_changes_since_begin() {
        let mut store = MemoryStore::new();
        store.create_record(&draft("kept")).unwrap();

        store.begin().unwrap();
        let id = store.create_record(&draft("dropped")).unwrap();
        store.set_attribute(id, "isbn", "123").unwrap();
        store.create_term("genre", "Poetry").unwrap();
        store.rollback().unwrap();

        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].title, "kept");
        assert!(store.terms().is_empty());
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut store = MemoryStore::new();
        store.begin().unwrap();
        store.create_record(&draft("a")).unwrap();
        store.commit().unwrap();
        assert_eq!(store.record_count("book").unwrap(), 1);
    }

    #[test]
    fn test_nested_begin_is_rejected() {
        let mut store = MemoryStore::new();
        store.begin().unwrap();
        assert!(store.begin().is_err());
    }

    #[test]
    fn test_find_term_queries() {
        let mut store = MemoryStore::new();
        let id = store.with_term_slug("genre", "Science Fiction", "sci-fi");

        assert_eq!(
            store.find_term("genre", TermQuery::NameOrSlug("sci-fi")).unwrap(),
            Some(id)
        );
        assert_eq!(
            store.find_term("genre", TermQuery::Name("science fiction")).unwrap(),
            Some(id)
        );
        assert_eq!(store.find_term("genre", TermQuery::Slug("sci-fi")).unwrap(), Some(id));
        assert_eq!(store.find_term("tag", TermQuery::Slug("sci-fi")).unwrap(), None);
    }

    #[test]
    fn test_assign_terms_replaces_existing() {
        let mut store = MemoryStore::new();
        let id = store.create_record(&draft("a")).unwrap();
        store.assign_terms(id, "genre", &[1, 2]).unwrap();
        store.assign_terms(id, "genre", &[3]).unwrap();
        assert_eq!(store.record(id).unwrap().terms["genre"], vec![3]);
    }
}
