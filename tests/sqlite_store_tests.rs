//! Import tests against the SQLite-backed store on disk.

use porygon::mapping::parse_request;
use porygon::reader::{open_spreadsheet, Spreadsheet};
use porygon::store::{ContentStore, SqliteStore};
use porygon::{Importer, PorygonError};
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

const MANIFEST: &str = r#"{
    "record_type": "book",
    "fields": {"post_title": "0", "content": "1", "isbn": 3, "pages": ""},
    "taxonomies": {"genre": {"column": "2", "create": true}}
}"#;

#[test]
fn test_import_persists_across_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv = write(
        dir.path(),
        "books.csv",
        "title,summary,genre,isbn\nDune,Spice,\"Science Fiction, Classic\",978-0441172719\n,,,\nEmma,Matchmaking,Classic,978-0141439587\n",
    );
    let db = dir.path().join("store.db");

    let request = parse_request(MANIFEST).unwrap();
    let spreadsheet = open_spreadsheet(&csv).unwrap();
    {
        let mut store = SqliteStore::open(&db).unwrap();
        let report = Importer::new(&mut store).run(&spreadsheet, &request).unwrap();
        assert!(report.is_committed());
        assert_eq!(report.success_count, 2);
    }

    let store = SqliteStore::open(&db).unwrap();
    assert_eq!(store.record_count("book").unwrap(), 2);
    assert_eq!(store.term_count("genre").unwrap(), 2);
    assert_eq!(store.record_title(1).unwrap().as_deref(), Some("Dune"));
    assert_eq!(
        store.attribute(1, "isbn").unwrap().as_deref(),
        Some("978-0441172719")
    );
    assert_eq!(store.attribute(1, "pages").unwrap(), None);
    assert_eq!(store.assigned_terms(1, "genre").unwrap().len(), 2);
    assert_eq!(
        store.assigned_terms(2, "genre").unwrap(),
        vec![store.assigned_terms(1, "genre").unwrap()[1]]
    );
}

#[test]
fn test_aborted_import_leaves_database_untouched() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let csv = write(dir.path(), "books.csv", "title,genre\nDune,Classic\n,Classic\n");
    let db = dir.path().join("store.db");

    let request = parse_request(
        r#"{"record_type": "book", "fields": {"title": "0"}, "taxonomies": {"genre": {"column": "1"}}}"#,
    )
    .unwrap();
    let spreadsheet = open_spreadsheet(&csv).unwrap();
    let mut store = SqliteStore::open(&db).unwrap();

    let report = Importer::new(&mut store).run(&spreadsheet, &request).unwrap();

    assert!(report.is_aborted());
    let rows: Vec<usize> = report.errors().iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![2, 3, 3]);
    assert_eq!(store.record_count("book").unwrap(), 0);
    assert_eq!(store.term_count("genre").unwrap(), 0);
}

#[test]
fn test_existing_terms_matched_case_insensitively() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let classic = store.insert_term("genre", "Classic").unwrap();

    let request = parse_request(
        r#"{"record_type": "book", "fields": {"title": "0"}, "taxonomies": {"genre": {"column": "1"}}}"#,
    )
    .unwrap();
    let spreadsheet = Spreadsheet::from_reader("title,genre\nEmma,classic\n".as_bytes()).unwrap();

    let report = Importer::new(&mut store).run(&spreadsheet, &request).unwrap();
    assert!(report.is_committed());
    let id = report.results()[0].record_id.unwrap();
    assert_eq!(store.assigned_terms(id, "genre").unwrap(), vec![classic]);
}

#[test]
fn test_unsupported_files_rejected_before_store_access() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let xlsx = write(dir.path(), "books.xlsx", "PK");
    let txt = write(dir.path(), "books.txt", "title\nDune\n");

    let err = open_spreadsheet(&xlsx).unwrap_err();
    assert!(matches!(err, PorygonError::UnsupportedFormat { .. }));
    assert!(err.to_string().contains("not yet supported"));

    let err = open_spreadsheet(&txt).unwrap_err();
    assert!(err.to_string().contains("Invalid file type"));
    assert_eq!(err.file_path(), Some(txt.as_path()));
}

#[test]
fn test_missing_csv_is_read_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let err = open_spreadsheet(&dir.path().join("absent.csv")).unwrap_err();
    assert_eq!(err.kind(), "Read");
}
