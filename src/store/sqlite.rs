//! SQLite-backed content store.
//!
//! Schema:
//! - `records`: one row per created record (type, title, body, status, created_at)
//! - `record_attributes`: key/value pairs, one value per (record, key)
//! - `terms`: taxonomy terms, slug unique per taxonomy
//! - `record_terms`: term assignments per (record, taxonomy)
//!
//! The transaction scope maps onto `BEGIN IMMEDIATE` / `COMMIT` /
//! `ROLLBACK` on the single connection.

use super::{ContentStore, NewRecord, RecordId, TermId, TermQuery};
use crate::error::{PorygonError, Result};
use crate::terms::term_slug;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_type TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_type ON records(record_type);

CREATE TABLE IF NOT EXISTS record_attributes (
    record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (record_id, key)
);

CREATE TABLE IF NOT EXISTS terms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    taxonomy TEXT NOT NULL,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    UNIQUE (taxonomy, slug)
);

CREATE TABLE IF NOT EXISTS record_terms (
    record_id INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
    taxonomy TEXT NOT NULL,
    term_id INTEGER NOT NULL REFERENCES terms(id),
    position INTEGER NOT NULL,
    PRIMARY KEY (record_id, taxonomy, term_id)
);
"#;

/// Content store handle over a SQLite database.
pub struct SqliteStore {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    /// Seed a term outside any transaction.
    pub fn insert_term(&mut self, taxonomy: &str, name: &str) -> Result<TermId> {
        self.create_term(taxonomy, name)
    }

    /// Title of a record, if it exists.
    pub fn record_title(&self, id: RecordId) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT title FROM records WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Attribute value of a record, if set.
    pub fn attribute(&self, id: RecordId, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM record_attributes WHERE record_id = ?1 AND key = ?2",
                params![id, key],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Terms assigned to a record for one taxonomy, in assignment order.
    pub fn assigned_terms(&self, id: RecordId, taxonomy: &str) -> Result<Vec<TermId>> {
        let mut stmt = self.conn.prepare(
            "SELECT term_id FROM record_terms WHERE record_id = ?1 AND taxonomy = ?2 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![id, taxonomy], |row| row.get(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Number of terms in a taxonomy.
    pub fn term_count(&self, taxonomy: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM terms WHERE taxonomy = ?1",
            [taxonomy],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ContentStore for SqliteStore {
    fn create_record(&mut self, record: &NewRecord) -> Result<RecordId> {
        let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        self.conn.execute(
            "INSERT INTO records (record_type, title, body, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.record_type,
                record.title,
                record.body,
                record.status.as_str(),
                created_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn set_attribute(&mut self, record: RecordId, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO record_attributes (record_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(record_id, key) DO UPDATE SET value = excluded.value",
            params![record, key, value],
        )?;
        Ok(())
    }

    fn find_term(&self, taxonomy: &str, query: TermQuery<'_>) -> Result<Option<TermId>> {
        let (sql, value) = match query {
            TermQuery::NameOrSlug(value) => (
                "SELECT id FROM terms WHERE taxonomy = ?1 AND (name = ?2 OR slug = ?2) ORDER BY id LIMIT 1",
                value,
            ),
            TermQuery::Name(value) => (
                "SELECT id FROM terms WHERE taxonomy = ?1 AND name = ?2 COLLATE NOCASE ORDER BY id LIMIT 1",
                value,
            ),
            TermQuery::Slug(value) => (
                "SELECT id FROM terms WHERE taxonomy = ?1 AND slug = ?2 ORDER BY id LIMIT 1",
                value,
            ),
        };
        Ok(self
            .conn
            .query_row(sql, params![taxonomy, value], |row| row.get(0))
            .optional()?)
    }

    fn create_term(&mut self, taxonomy: &str, name: &str) -> Result<TermId> {
        let slug = term_slug(name);
        self.conn
            .execute(
                "INSERT INTO terms (taxonomy, name, slug) VALUES (?1, ?2, ?3)",
                params![taxonomy, name, slug],
            )
            .map_err(|e| {
                PorygonError::Store(format!(
                    "Failed to create term '{}' in taxonomy '{}': {}",
                    name, taxonomy, e
                ))
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    fn assign_terms(&mut self, record: RecordId, taxonomy: &str, terms: &[TermId]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM record_terms WHERE record_id = ?1 AND taxonomy = ?2",
            params![record, taxonomy],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO record_terms (record_id, taxonomy, term_id, position) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, term) in terms.iter().enumerate() {
            stmt.execute(params![record, taxonomy, term, position as i64])?;
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(PorygonError::Store(
                "A transaction is already open".to_string(),
            ));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(PorygonError::Store("No transaction to commit".to_string()));
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(PorygonError::Store(
                "No transaction to roll back".to_string(),
            ));
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn record_count(&self, record_type: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE record_type = ?1",
            [record_type],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn sample_attribute_keys(&self, record_type: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.key FROM record_attributes a
             JOIN (SELECT id FROM records WHERE record_type = ?1 ORDER BY id LIMIT ?2) r
               ON r.id = a.record_id
             ORDER BY a.record_id, a.key",
        )?;
        let rows = stmt.query_map(params![record_type, limit as i64], |row| row.get(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn known_taxonomies(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT taxonomy FROM terms GROUP BY taxonomy ORDER BY MIN(id)")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut taxonomies = Vec::new();
        for row in rows {
            taxonomies.push(row?);
        }
        Ok(taxonomies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStatus;

    fn draft(title: &str) -> NewRecord {
        NewRecord {
            record_type: "book".to_string(),
            title: title.to_string(),
            body: Some("text".to_string()),
            status: RecordStatus::Draft,
        }
    }

    #[test]
    fn test_rollback_discards_records_and_terms() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.begin().unwrap();
        let id = store.create_record(&draft("a")).unwrap();
        let term = store.create_term("genre", "Poetry").unwrap();
        store.assign_terms(id, "genre", &[term]).unwrap();
        store.rollback().unwrap();

        assert_eq!(store.record_count("book").unwrap(), 0);
        assert_eq!(store.term_count("genre").unwrap(), 0);
    }

    #[test]
    fn test_set_attribute_overwrites() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_record(&draft("a")).unwrap();
        store.set_attribute(id, "isbn", "1").unwrap();
        store.set_attribute(id, "isbn", "2").unwrap();
        assert_eq!(store.attribute(id, "isbn").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_duplicate_slug_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_term("genre", "Sci Fi").unwrap();
        let err = store.create_term("genre", "sci-fi").unwrap_err();
        assert_eq!(err.kind(), "Store");
    }

    #[test]
    fn test_name_lookup_is_case_insensitive() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_term("genre", "Poetry").unwrap();
        assert_eq!(
            store.find_term("genre", TermQuery::Name("POETRY")).unwrap(),
            Some(id)
        );
        assert_eq!(
            store.find_term("genre", TermQuery::NameOrSlug("POETRY")).unwrap(),
            None
        );
    }
}
