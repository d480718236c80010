//! Column mapping: which spreadsheet column supplies which field.
//!
//! Mappings arrive loosely typed (form posts, JSON manifests) and are
//! turned into [`FieldMapping`] and [`TaxonomyMapping`] once, at the
//! boundary. Everything downstream works with column indices only.

mod loader;
mod suggest;

pub use loader::{load_request_from_file, parse_request};
pub use suggest::{
    discover_attribute_keys, suggest_column, suggest_field_mapping, suggest_taxonomy_mapping,
    FieldSuggestion, TaxonomySuggestion, ATTRIBUTE_SAMPLE_SIZE,
};

use crate::error::{PorygonError, Result};
use crate::terms::split_term_names;
use serde::Serialize;

/// A column choice for one target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSelection {
    /// Nothing selected.
    #[default]
    Unmapped,
    /// Zero-based column index. Column 0 is a real column.
    Column(usize),
}

impl ColumnSelection {
    /// Parse the boundary form of a selection.
    ///
    /// `""` (or whitespace) means unmapped. `"0"` is column 0, never
    /// unmapped.
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(ColumnSelection::Unmapped);
        }
        trimmed
            .parse::<usize>()
            .map(ColumnSelection::Column)
            .map_err(|_| format!("'{}' is not a column index", raw))
    }

    /// Column index, if mapped.
    pub fn index(self) -> Option<usize> {
        match self {
            ColumnSelection::Unmapped => None,
            ColumnSelection::Column(index) => Some(index),
        }
    }

    /// Whether a column is selected.
    pub fn is_mapped(self) -> bool {
        self.index().is_some()
    }

    /// Cell value for this selection, or `None` when unmapped.
    ///
    /// Indices past the end of a short row resolve to `""`.
    pub fn cell<'a>(self, row: &'a [String]) -> Option<&'a str> {
        self.index()
            .map(|index| row.get(index).map(String::as_str).unwrap_or(""))
    }
}

impl From<usize> for ColumnSelection {
    fn from(index: usize) -> Self {
        ColumnSelection::Column(index)
    }
}

/// Fixed fields every record has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreField {
    /// Record title (required).
    Title,
    /// Record body.
    Body,
}

impl CoreField {
    /// Canonical key.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoreField::Title => "title",
            CoreField::Body => "body",
        }
    }

    /// Recognise a mapping key as a core field.
    ///
    /// Accepts the host form names (`post_title`, `post_content`) and
    /// `content` as aliases.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "title" | "post_title" => Some(CoreField::Title),
            "body" | "content" | "post_content" => Some(CoreField::Body),
            _ => None,
        }
    }
}

/// Target field → column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    title: ColumnSelection,
    body: ColumnSelection,
    attributes: Vec<(String, ColumnSelection)>,
}

impl FieldMapping {
    /// Empty mapping (title unmapped).
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the title column.
    pub fn with_title(mut self, column: usize) -> Self {
        self.title = ColumnSelection::Column(column);
        self
    }

    /// Select the body column.
    pub fn with_body(mut self, column: usize) -> Self {
        self.body = ColumnSelection::Column(column);
        self
    }

    /// Map an attribute key to a column. A later entry for the same key
    /// replaces the earlier one.
    pub fn with_attribute(mut self, key: &str, column: usize) -> Self {
        self.set(key, ColumnSelection::Column(column));
        self
    }

    /// Set a mapping entry by key; core field names are recognised.
    pub fn set(&mut self, key: &str, column: ColumnSelection) {
        match CoreField::from_key(key) {
            Some(CoreField::Title) => self.title = column,
            Some(CoreField::Body) => self.body = column,
            None => {
                if let Some(entry) = self.attributes.iter_mut().find(|(k, _)| k == key) {
                    entry.1 = column;
                } else {
                    self.attributes.push((key.to_string(), column));
                }
            }
        }
    }

    /// Title selection.
    pub fn title(&self) -> ColumnSelection {
        self.title
    }

    /// Body selection.
    pub fn body(&self) -> ColumnSelection {
        self.body
    }

    /// Attribute selections in insertion order.
    pub fn attributes(&self) -> &[(String, ColumnSelection)] {
        &self.attributes
    }

    /// Fail unless the title points at a column.
    pub fn require_title(&self) -> Result<usize> {
        self.title.index().ok_or(PorygonError::MissingMapping)
    }

    /// Resolve core and attribute values for one row.
    ///
    /// Unmapped entries are skipped. A mapped title always yields a value,
    /// possibly empty.
    pub fn resolve(&self, row: &[String]) -> ResolvedFields {
        ResolvedFields {
            title: self.title.cell(row).unwrap_or("").to_string(),
            body: self.body.cell(row).map(str::to_string),
            attributes: self
                .attributes
                .iter()
                .filter_map(|(key, column)| {
                    column.cell(row).map(|value| (key.clone(), value.to_string()))
                })
                .collect(),
        }
    }
}

/// Values resolved from one row by a [`FieldMapping`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    /// Title cell (may be empty).
    pub title: String,
    /// Body cell, when mapped.
    pub body: Option<String>,
    /// Attribute key/value pairs, in mapping order.
    pub attributes: Vec<(String, String)>,
}

/// One taxonomy's column selection and create-missing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyColumn {
    /// Taxonomy name.
    pub taxonomy: String,
    /// Column holding comma-separated term names.
    pub column: ColumnSelection,
    /// Create terms that do not exist yet.
    pub create_missing: bool,
}

/// Taxonomy → column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyMapping {
    entries: Vec<TaxonomyColumn>,
}

impl TaxonomyMapping {
    /// Empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a taxonomy to a column.
    pub fn with_taxonomy(
        mut self,
        taxonomy: &str,
        column: usize,
        create_missing: bool,
    ) -> Self {
        self.set(taxonomy, ColumnSelection::Column(column), create_missing);
        self
    }

    /// Set a taxonomy entry, replacing any previous one.
    pub fn set(&mut self, taxonomy: &str, column: ColumnSelection, create_missing: bool) {
        let entry = TaxonomyColumn {
            taxonomy: taxonomy.to_string(),
            column,
            create_missing,
        };
        if let Some(existing) = self.entries.iter_mut().find(|e| e.taxonomy == taxonomy) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    /// All entries, including unmapped ones.
    pub fn entries(&self) -> &[TaxonomyColumn] {
        &self.entries
    }

    /// Term names per mapped taxonomy for one row.
    ///
    /// Taxonomies whose cell holds no names are omitted, so existing
    /// assignments are never cleared by a blank cell.
    pub fn resolve(&self, row: &[String]) -> Vec<TaxonomyTerms> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let names = split_term_names(entry.column.cell(row)?);
                if names.is_empty() {
                    return None;
                }
                Some(TaxonomyTerms {
                    taxonomy: entry.taxonomy.clone(),
                    names,
                    create_missing: entry.create_missing,
                })
            })
            .collect()
    }
}

/// Term names resolved from one row for one taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyTerms {
    /// Taxonomy name.
    pub taxonomy: String,
    /// Trimmed, non-empty term names in cell order.
    pub names: Vec<String>,
    /// Create terms that do not exist yet.
    pub create_missing: bool,
}

/// Everything the caller supplies for one import call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Opaque record type forwarded to the store.
    pub record_type: String,
    /// Field mapping.
    pub fields: FieldMapping,
    /// Taxonomy mapping.
    pub taxonomies: TaxonomyMapping,
}

impl ImportRequest {
    /// Build a request without taxonomy columns.
    pub fn new(record_type: &str, fields: FieldMapping) -> Self {
        Self {
            record_type: record_type.to_string(),
            fields,
            taxonomies: TaxonomyMapping::new(),
        }
    }

    /// Attach a taxonomy mapping.
    pub fn with_taxonomies(mut self, taxonomies: TaxonomyMapping) -> Self {
        self.taxonomies = taxonomies;
        self
    }

    /// Derive the per-row import view.
    pub fn resolve_row(&self, row_number: usize, row: &[String]) -> ImportRow {
        ImportRow {
            row_number,
            fields: self.fields.resolve(row),
            terms: self.taxonomies.resolve(row),
        }
    }
}

/// Per-row derived data, alive only during one import call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    /// 1-based spreadsheet row number (header is row 1).
    pub row_number: usize,
    /// Resolved core and attribute values.
    pub fields: ResolvedFields,
    /// Resolved term names per taxonomy.
    pub terms: Vec<TaxonomyTerms>,
}

impl ImportRow {
    /// Whether the title is missing (empty or whitespace only).
    pub fn missing_title(&self) -> bool {
        self.fields.title.trim().is_empty()
    }
}
