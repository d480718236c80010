//! All-or-nothing import of spreadsheet rows into a content store.
//!
//! An import runs in two phases:
//! 1. Validate every row against the store (read-only). Any problem
//!    aborts the call with zero mutations and the full error list.
//! 2. Inside one store transaction, create each record, set its
//!    attributes, and assign its terms. Any failure rolls back every
//!    record and term created by this call.
//!
//! The caller always gets either a complete success summary or a
//! complete rejection. There is no partially imported outcome.

use crate::error::{PorygonError, Result};
use crate::mapping::{ImportRequest, ImportRow};
use crate::reader::Spreadsheet;
use crate::store::{ContentStore, NewRecord, RecordId, RecordStatus};
use crate::terms::TermResolver;
use crate::validate::{is_empty_row, validate_rows, ValidationError};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::time::Instant;

/// Where an import call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    /// Nothing has happened yet.
    Idle,
    /// Checking every row. A successful dry run stops here.
    Validating,
    /// Validation failed; nothing was written.
    Aborted,
    /// Writing rows inside the transaction.
    Committing,
    /// Every row was written and the transaction committed.
    Committed,
    /// The transaction was rolled back.
    RolledBack,
}

/// Caller-imposed limits for one import call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Commit must finish before this instant; otherwise it rolls back.
    pub deadline: Option<Instant>,
}

/// Per-row status in an import result.
///
/// A committed import only ever reports [`RowStatus::Success`]: a row that
/// fails during commit rolls back the whole batch and surfaces as a
/// batch-level error instead of an `Error` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// The record was created.
    Success,
    /// The row failed. Part of the report schema; not emitted by
    /// [`Importer::run`].
    Error,
}

/// Outcome for one non-empty input row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// 1-based spreadsheet row number (header is row 1).
    pub row: usize,
    /// Row status.
    pub status: RowStatus,
    /// Created record, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    /// Record title, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Failure message, on error. Always absent in a committed report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImportResult {
    fn success(row: usize, record_id: RecordId, title: &str) -> Self {
        Self {
            row,
            status: RowStatus::Success,
            record_id: Some(record_id),
            title: Some(title.to_string()),
            message: None,
        }
    }
}

/// What an import call concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Validation failed; nothing was written.
    Aborted {
        /// Every problem found.
        errors: Vec<ValidationError>,
    },
    /// Validation passed on a dry run; nothing was written.
    Validated {
        /// Number of non-empty rows that would be imported.
        rows: usize,
    },
    /// Every row was committed.
    Committed {
        /// One result per non-empty row, in file order.
        results: Vec<ImportResult>,
    },
}

impl Serialize for ImportOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            ImportOutcome::Aborted { errors } => {
                map.serialize_entry("aborted", &true)?;
                map.serialize_entry("errors", errors)?;
            }
            ImportOutcome::Validated { rows } => {
                map.serialize_entry("validated", &true)?;
                map.serialize_entry("rows", rows)?;
            }
            ImportOutcome::Committed { results } => {
                map.serialize_entry("committed", &true)?;
                map.serialize_entry("results", results)?;
            }
        }
        map.end()
    }
}

/// Structured summary of one import call.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Unique identifier of this call.
    pub run_id: String,
    /// When the call started (RFC 3339, UTC).
    pub started_at: String,
    /// Hex SHA-256 of the source file, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,
    /// Record type the rows were imported as.
    pub record_type: String,
    /// Number of records created (or that would be, for a dry run).
    pub success_count: usize,
    /// Number of validation problems.
    pub error_count: usize,
    /// Human-readable summary.
    pub message: String,
    /// Outcome details.
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

impl ImportReport {
    /// Whether the rows were written.
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, ImportOutcome::Committed { .. })
    }

    /// Whether validation rejected the batch.
    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, ImportOutcome::Aborted { .. })
    }

    /// Validation errors, empty unless aborted.
    pub fn errors(&self) -> &[ValidationError] {
        match &self.outcome {
            ImportOutcome::Aborted { errors } => errors,
            _ => &[],
        }
    }

    /// Row results, empty unless committed.
    pub fn results(&self) -> &[ImportResult] {
        match &self.outcome {
            ImportOutcome::Committed { results } => results,
            _ => &[],
        }
    }
}

/// Runs import calls against a content store.
pub struct Importer<'a, S: ContentStore + ?Sized> {
    store: &'a mut S,
    options: ImportOptions,
    phase: ImportPhase,
}

impl<'a, S: ContentStore + ?Sized> Importer<'a, S> {
    /// Create an importer over a store.
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            options: ImportOptions::default(),
            phase: ImportPhase::Idle,
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Phase reached by the most recent call.
    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    /// Validate, then commit every non-empty row atomically.
    ///
    /// # Returns
    /// * `Ok(report)` - committed, or aborted with every validation error
    /// * `Err(PorygonError)` - missing title mapping, store failure, or a
    ///   commit-phase failure after which nothing remains written
    pub fn run(
        &mut self,
        spreadsheet: &Spreadsheet,
        request: &ImportRequest,
    ) -> Result<ImportReport> {
        let started = Started::now();
        if let Some(errors) = self.validate(spreadsheet, request)? {
            return Ok(started.report(spreadsheet, request, 0, aborted(errors)));
        }

        self.enter(ImportPhase::Committing);
        self.store.begin()?;

        let results = match self.commit_rows(spreadsheet, request) {
            Ok(results) => results,
            Err(err) => {
                self.roll_back(&err);
                return Err(err);
            }
        };

        if let Err(err) = self.store.commit() {
            let err = PorygonError::Transaction {
                message: format!("Commit failed: {}", err),
            };
            self.roll_back(&err);
            return Err(err);
        }

        self.enter(ImportPhase::Committed);
        log::info!(
            "import {} committed {} records of type '{}'",
            started.run_id,
            results.len(),
            request.record_type
        );
        let count = results.len();
        Ok(started.report(
            spreadsheet,
            request,
            count,
            ImportOutcome::Committed { results },
        ))
    }

    /// Validate only. Never writes to the store.
    pub fn dry_run(
        &mut self,
        spreadsheet: &Spreadsheet,
        request: &ImportRequest,
    ) -> Result<ImportReport> {
        let started = Started::now();
        if let Some(errors) = self.validate(spreadsheet, request)? {
            return Ok(started.report(spreadsheet, request, 0, aborted(errors)));
        }
        let rows = spreadsheet.rows.iter().filter(|r| !is_empty_row(r)).count();
        Ok(started.report(spreadsheet, request, rows, ImportOutcome::Validated { rows }))
    }

    /// Shared validation phase. `Some(errors)` means the batch is rejected.
    fn validate(
        &mut self,
        spreadsheet: &Spreadsheet,
        request: &ImportRequest,
    ) -> Result<Option<Vec<ValidationError>>> {
        self.phase = ImportPhase::Idle;
        request.fields.require_title()?;

        self.enter(ImportPhase::Validating);
        let errors = validate_rows(&*self.store, request, spreadsheet)?;
        if errors.is_empty() {
            return Ok(None);
        }

        self.enter(ImportPhase::Aborted);
        log::warn!(
            "validation failed with {} errors; no data was imported",
            errors.len()
        );
        Ok(Some(errors))
    }

    fn commit_rows(
        &mut self,
        spreadsheet: &Spreadsheet,
        request: &ImportRequest,
    ) -> Result<Vec<ImportResult>> {
        let mut resolver = TermResolver::new();
        let mut results = Vec::new();

        for (line, cells) in spreadsheet.numbered_rows() {
            if is_empty_row(cells) {
                continue;
            }
            let row = request.resolve_row(line, cells);

            if let Some(deadline) = self.options.deadline {
                if Instant::now() >= deadline {
                    return Err(PorygonError::Transaction {
                        message: format!("Deadline exceeded before row {}", row.row_number),
                    });
                }
            }

            let id = self.commit_row(&mut resolver, request, &row)?;
            log::debug!("row {} -> record {}", row.row_number, id);
            results.push(ImportResult::success(row.row_number, id, &row.fields.title));
        }

        if !resolver.created().is_empty() {
            log::info!("created {} new terms", resolver.created().len());
        }
        Ok(results)
    }

    fn commit_row(
        &mut self,
        resolver: &mut TermResolver,
        request: &ImportRequest,
        row: &ImportRow,
    ) -> Result<RecordId> {
        let record = NewRecord {
            record_type: request.record_type.clone(),
            title: row.fields.title.clone(),
            body: row.fields.body.clone(),
            status: RecordStatus::Draft,
        };
        let id = self
            .store
            .create_record(&record)
            .map_err(|e| PorygonError::CreateRecord {
                row: row.row_number,
                message: e.to_string(),
            })?;

        for (key, value) in &row.fields.attributes {
            self.store
                .set_attribute(id, key, value)
                .map_err(|e| row_failure(row.row_number, e))?;
        }

        for terms in &row.terms {
            let ids = resolver
                .resolve_all(&mut *self.store, &terms.taxonomy, &terms.names, terms.create_missing)
                .map_err(|e| row_failure(row.row_number, e))?;
            if !ids.is_empty() {
                self.store
                    .assign_terms(id, &terms.taxonomy, &ids)
                    .map_err(|e| row_failure(row.row_number, e))?;
            }
        }

        Ok(id)
    }

    fn roll_back(&mut self, cause: &PorygonError) {
        log::warn!("import failed, rolling back: {}", cause);
        if let Err(rollback_err) = self.store.rollback() {
            log::error!("Rollback failed: {}", rollback_err);
        }
        self.enter(ImportPhase::RolledBack);
    }

    fn enter(&mut self, phase: ImportPhase) {
        log::info!("import phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

fn aborted(errors: Vec<ValidationError>) -> ImportOutcome {
    ImportOutcome::Aborted { errors }
}

fn row_failure(row: usize, err: PorygonError) -> PorygonError {
    PorygonError::Transaction {
        message: format!("{} at row {}", err, row),
    }
}

struct Started {
    run_id: String,
    started_at: String,
}

impl Started {
    fn now() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }

    fn report(
        self,
        spreadsheet: &Spreadsheet,
        request: &ImportRequest,
        success_count: usize,
        outcome: ImportOutcome,
    ) -> ImportReport {
        let (error_count, message) = match &outcome {
            ImportOutcome::Aborted { errors } => (
                errors.len(),
                "Validation failed. No data was imported.".to_string(),
            ),
            ImportOutcome::Validated { rows } => {
                (0, format!("Validation passed: {} rows ready to import.", rows))
            }
            ImportOutcome::Committed { results } => (
                0,
                format!(
                    "Import completed: {} records created successfully.",
                    results.len()
                ),
            ),
        };
        ImportReport {
            run_id: self.run_id,
            started_at: self.started_at,
            source_sha256: spreadsheet.source_sha256.clone(),
            record_type: request.record_type.clone(),
            success_count,
            error_count,
            message,
            outcome,
        }
    }
}
