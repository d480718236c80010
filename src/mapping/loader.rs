use super::{ColumnSelection, CoreField, FieldMapping, ImportRequest, TaxonomyMapping};
use crate::error::{PorygonError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RequestSpec {
    record_type: String,
    #[serde(default)]
    fields: BTreeMap<String, ColumnSpec>,
    #[serde(default)]
    taxonomies: BTreeMap<String, TaxonomySpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Index(u64),
    Raw(String),
}

#[derive(Debug, Deserialize)]
struct TaxonomySpec {
    column: ColumnSpec,
    #[serde(default)]
    create: bool,
}

/// Load an import request from a JSON manifest.
pub fn load_request_from_file(manifest_path: &Path) -> Result<ImportRequest> {
    let contents = fs::read_to_string(manifest_path).map_err(|e| PorygonError::Io {
        path: manifest_path.to_path_buf(),
        source: e,
    })?;
    parse_request(&contents)
}

/// Parse an import request from JSON text.
///
/// The title must be present and mapped; every other entry may be
/// unmapped (`""`).
pub fn parse_request(json: &str) -> Result<ImportRequest> {
    let spec: RequestSpec =
        serde_json::from_str(json).map_err(|err| PorygonError::InvalidMapping {
            field: "<manifest>".to_string(),
            message: format!("JSON parse error: {}", err),
        })?;

    if spec.record_type.trim().is_empty() {
        return Err(PorygonError::InvalidMapping {
            field: "record_type".to_string(),
            message: "Record type must not be empty".to_string(),
        });
    }

    let mut fields = FieldMapping::new();
    let mut seen_core: Vec<CoreField> = Vec::new();
    for (key, column) in &spec.fields {
        if key.trim().is_empty() {
            return Err(PorygonError::InvalidMapping {
                field: key.clone(),
                message: "Field name must not be empty".to_string(),
            });
        }
        let selection = resolve_column(key, column)?;
        if let Some(core) = CoreField::from_key(key) {
            if !selection.is_mapped() {
                continue;
            }
            if seen_core.contains(&core) {
                return Err(PorygonError::InvalidMapping {
                    field: key.clone(),
                    message: format!("'{}' is mapped more than once", core.as_str()),
                });
            }
            seen_core.push(core);
        }
        fields.set(key, selection);
    }
    fields.require_title()?;

    let mut taxonomies = TaxonomyMapping::new();
    for (taxonomy, entry) in &spec.taxonomies {
        if taxonomy.trim().is_empty() {
            return Err(PorygonError::InvalidMapping {
                field: taxonomy.clone(),
                message: "Taxonomy name must not be empty".to_string(),
            });
        }
        taxonomies.set(taxonomy, resolve_column(taxonomy, &entry.column)?, entry.create);
    }

    Ok(ImportRequest {
        record_type: spec.record_type,
        fields,
        taxonomies,
    })
}

fn resolve_column(key: &str, spec: &ColumnSpec) -> Result<ColumnSelection> {
    match spec {
        ColumnSpec::Index(index) => usize::try_from(*index)
            .map(ColumnSelection::from)
            .map_err(|_| PorygonError::InvalidMapping {
                field: key.to_string(),
                message: format!("Column {} is out of range", index),
            }),
        ColumnSpec::Raw(raw) => {
            ColumnSelection::parse(raw).map_err(|message| PorygonError::InvalidMapping {
                field: key.to_string(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_style_manifest() {
        let json = r#"{
            "record_type": "book",
            "fields": {"post_title": "0", "post_content": "", "isbn": "3"},
            "taxonomies": {"genre": {"column": "2", "create": true}, "tag": {"column": ""}}
        }"#;
        let request = parse_request(json).unwrap();

        assert_eq!(request.record_type, "book");
        assert_eq!(request.fields.title(), ColumnSelection::Column(0));
        assert_eq!(request.fields.body(), ColumnSelection::Unmapped);
        assert_eq!(
            request.fields.attributes(),
            &[("isbn".to_string(), ColumnSelection::Column(3))]
        );
        let entries = request.taxonomies.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].taxonomy, "genre");
        assert!(entries[0].create_missing);
        assert_eq!(entries[1].column, ColumnSelection::Unmapped);
        assert!(!entries[1].create_missing);
    }

    #[test]
    fn test_integer_columns_are_accepted() {
        let json = r#"{"record_type": "book", "fields": {"title": 0, "body": 1}}"#;
        let request = parse_request(json).unwrap();
        assert_eq!(request.fields.title(), ColumnSelection::Column(0));
        assert_eq!(request.fields.body(), ColumnSelection::Column(1));
    }

    #[test]
    fn test_unmapped_title_is_missing_mapping() {
        let json = r#"{"record_type": "book", "fields": {"title": ""}}"#;
        assert!(matches!(
            parse_request(json),
            Err(PorygonError::MissingMapping)
        ));

        let json = r#"{"record_type": "book", "fields": {"body": "1"}}"#;
        assert!(matches!(
            parse_request(json),
            Err(PorygonError::MissingMapping)
        ));
    }

    #[test]
    fn test_bad_column_names_the_field() {
        let json = r#"{"record_type": "book", "fields": {"title": "0", "isbn": "abc"}}"#;
        match parse_request(json) {
            Err(PorygonError::InvalidMapping { field, .. }) => assert_eq!(field, "isbn"),
            other => panic!("expected InvalidMapping, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_core_alias_rejected() {
        let json = r#"{"record_type": "book", "fields": {"title": "0", "post_title": "1"}}"#;
        assert!(matches!(
            parse_request(json),
            Err(PorygonError::InvalidMapping { .. })
        ));
    }

    #[test]
    fn test_unmapped_alias_does_not_shadow_core_field() {
        let json =
            r#"{"record_type": "book", "fields": {"title": "0", "content": "", "body": "1"}}"#;
        let request = parse_request(json).unwrap();
        assert_eq!(request.fields.body(), ColumnSelection::Column(1));

        let json =
            r#"{"record_type": "book", "fields": {"title": "0", "body": "1", "post_content": ""}}"#;
        let request = parse_request(json).unwrap();
        assert_eq!(request.fields.body(), ColumnSelection::Column(1));

        let json =
            r#"{"record_type": "book", "fields": {"title": "0", "body": "1", "content": "2"}}"#;
        assert!(matches!(
            parse_request(json),
            Err(PorygonError::InvalidMapping { .. })
        ));
    }

    #[test]
    fn test_empty_record_type_rejected() {
        let json = r#"{"record_type": " ", "fields": {"title": "0"}}"#;
        assert!(matches!(
            parse_request(json),
            Err(PorygonError::InvalidMapping { .. })
        ));
    }
}
