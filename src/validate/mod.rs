//! Pre-commit row validation.
//!
//! Validation is a dry run: it reads from the store but never writes. It
//! scans every row and collects every problem so one submission reports
//! the whole batch.

use crate::error::Result;
use crate::mapping::ImportRequest;
use crate::reader::Spreadsheet;
use crate::store::ContentStore;
use crate::terms::{TermLookup, TermResolver};
use serde::Serialize;

/// A problem with one spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// 1-based spreadsheet row number (header is row 1).
    pub row: usize,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    fn missing_title(row: usize) -> Self {
        Self {
            row,
            message: "Missing title".to_string(),
        }
    }

    fn unknown_term(row: usize, taxonomy: &str, term: &str) -> Self {
        Self {
            row,
            message: format!(
                "Term \"{}\" does not exist in taxonomy \"{}\" and creation is not enabled",
                term, taxonomy
            ),
        }
    }
}

/// Whether every cell of a row is empty or whitespace.
pub fn is_empty_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Validate every non-empty row of a spreadsheet.
///
/// Empty rows are skipped silently. For each other row:
/// 1. the title must resolve to a non-blank value;
/// 2. every term name in a taxonomy without creation enabled must already
///    exist (lookup chain only).
///
/// Store failures are returned as errors; row problems are returned as
/// the list of [`ValidationError`]s, empty when the batch may proceed.
pub fn validate_rows<S: ContentStore + ?Sized>(
    store: &S,
    request: &ImportRequest,
    spreadsheet: &Spreadsheet,
) -> Result<Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut resolver = TermResolver::new();

    for (line, cells) in spreadsheet.numbered_rows() {
        if is_empty_row(cells) {
            continue;
        }

        let row = request.resolve_row(line, cells);

        if row.missing_title() {
            errors.push(ValidationError::missing_title(row.row_number));
        }

        for terms in row.terms.iter().filter(|t| !t.create_missing) {
            for name in &terms.names {
                if resolver.lookup(store, &terms.taxonomy, name)? == TermLookup::NotFound {
                    errors.push(ValidationError::unknown_term(
                        row.row_number,
                        &terms.taxonomy,
                        name,
                    ));
                }
            }
        }
    }

    if !errors.is_empty() {
        log::debug!("validation found {} problems", errors.len());
    }
    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldMapping, TaxonomyMapping};
    use crate::store::MemoryStore;

    fn sheet(rows: &[&[&str]]) -> Spreadsheet {
        let mut rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        let headers = rows.remove(0);
        Spreadsheet::new(headers, rows)
    }

    #[test]
    fn test_is_empty_row() {
        assert!(is_empty_row(&[]));
        assert!(is_empty_row(&["".to_string(), "  ".to_string()]));
        assert!(!is_empty_row(&["".to_string(), "0".to_string()]));
    }

    #[test]
    fn test_collects_every_problem() {
        let store = MemoryStore::new();
        let request = ImportRequest::new("book", FieldMapping::new().with_title(0))
            .with_taxonomies(TaxonomyMapping::new().with_taxonomy("genre", 1, false));
        let spreadsheet = sheet(&[
            &["title", "genre", "notes"],
            &["", "Math", ""],
            &[" ", "", "note"],
            &["", "", ""],
            &["Ada", "Math, Poetry", ""],
        ]);

        let errors = validate_rows(&store, &request, &spreadsheet).unwrap();
        let rows: Vec<usize> = errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 2, 3, 5, 5]);
        assert_eq!(errors[0].message, "Missing title");
        assert!(errors[1].message.contains("\"Math\""));
        assert!(errors[4].message.contains("\"Poetry\""));
    }

    #[test]
    fn test_create_enabled_taxonomy_is_not_checked() {
        let store = MemoryStore::new();
        let request = ImportRequest::new("book", FieldMapping::new().with_title(0))
            .with_taxonomies(TaxonomyMapping::new().with_taxonomy("genre", 1, true));
        let spreadsheet = sheet(&[&["title", "genre"], &["Ada", "Unheard Of"]]);

        assert!(validate_rows(&store, &request, &spreadsheet)
            .unwrap()
            .is_empty());
    }
}
