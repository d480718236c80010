//! Default column suggestions for presenting a mapping to an operator.
//!
//! Suggestions match header names case-insensitively. They only pre-fill
//! a mapping; import never falls back to header matching.

use super::ColumnSelection;
use crate::error::Result;
use crate::store::ContentStore;
use serde::Serialize;

/// Number of existing records sampled when discovering attribute keys.
pub const ATTRIBUTE_SAMPLE_SIZE: usize = 100;

/// Suggested column for one target field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSuggestion {
    /// Target field key.
    pub field: String,
    /// Suggested column.
    pub column: ColumnSelection,
    /// Whether the field must be mapped before import.
    pub required: bool,
}

/// Suggested column for one taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomySuggestion {
    /// Taxonomy name.
    pub taxonomy: String,
    /// Suggested column.
    pub column: ColumnSelection,
    /// Suggested create-missing flag.
    pub create: bool,
}

/// First header equal to any candidate, ignoring case.
pub fn suggest_column(headers: &[String], candidates: &[&str]) -> ColumnSelection {
    headers
        .iter()
        .position(|header| {
            let header = header.trim().to_lowercase();
            candidates.iter().any(|c| c.to_lowercase() == header)
        })
        .map_or(ColumnSelection::Unmapped, ColumnSelection::Column)
}

/// Suggest columns for the core fields followed by `attribute_keys`.
pub fn suggest_field_mapping(
    headers: &[String],
    attribute_keys: &[String],
) -> Vec<FieldSuggestion> {
    let mut suggestions = vec![
        FieldSuggestion {
            field: "title".to_string(),
            column: suggest_column(headers, &["title", "post_title"]),
            required: true,
        },
        FieldSuggestion {
            field: "body".to_string(),
            column: suggest_column(headers, &["body", "content", "post_content"]),
            required: false,
        },
    ];
    for key in attribute_keys {
        suggestions.push(FieldSuggestion {
            field: key.clone(),
            column: suggest_column(headers, &[key.as_str()]),
            required: false,
        });
    }
    suggestions
}

/// Suggest columns for taxonomies given as (name, label) pairs.
///
/// Creation defaults to enabled, matching the upload form.
pub fn suggest_taxonomy_mapping(
    headers: &[String],
    taxonomies: &[(String, String)],
) -> Vec<TaxonomySuggestion> {
    taxonomies
        .iter()
        .map(|(name, label)| TaxonomySuggestion {
            taxonomy: name.clone(),
            column: suggest_column(headers, &[name.as_str(), label.as_str()]),
            create: true,
        })
        .collect()
}

/// Attribute keys in use on existing records of a type.
///
/// Samples [`ATTRIBUTE_SAMPLE_SIZE`] records, keeps first-seen order, and
/// drops private keys (leading `_`).
pub fn discover_attribute_keys<S: ContentStore + ?Sized>(
    store: &S,
    record_type: &str,
) -> Result<Vec<String>> {
    let mut keys: Vec<String> = Vec::new();
    for key in store.sample_attribute_keys(record_type, ATTRIBUTE_SAMPLE_SIZE)? {
        if key.starts_with('_') || keys.contains(&key) {
            continue;
        }
        keys.push(key);
    }
    Ok(keys)
}
