//! Porygon error types.
//!
//! All errors are typed and provide root cause information. Per-row
//! validation problems are not errors of this kind: they are collected as
//! [`crate::validate::ValidationError`] values and reported as a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Porygon operations.
#[derive(Error, Debug)]
pub enum PorygonError {
    /// I/O error during file operations.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file path that caused the I/O error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The uploaded file is not a format the importer accepts.
    #[error("Unsupported format for {file}: {message}")]
    UnsupportedFormat {
        /// The offending file.
        file: PathBuf,
        /// Why the format was rejected.
        message: String,
    },

    /// The spreadsheet stream could not be opened or parsed.
    #[error("Unable to read spreadsheet: {message}")]
    Read {
        /// What went wrong while reading.
        message: String,
    },

    /// The title field has no column selected.
    #[error("Title field mapping is required")]
    MissingMapping,

    /// An import manifest or column selection is malformed.
    #[error("Invalid mapping for '{field}': {message}")]
    InvalidMapping {
        /// The mapping key that failed to parse.
        field: String,
        /// The parse error message.
        message: String,
    },

    /// A term could not be resolved and creation is not enabled.
    #[error("Term \"{term}\" does not exist in taxonomy \"{taxonomy}\" and creation is not enabled")]
    TermNotFound {
        /// Taxonomy searched.
        taxonomy: String,
        /// Candidate term name.
        term: String,
    },

    /// The content store rejected a record during commit.
    #[error("Failed to create record at row {row}: {message}")]
    CreateRecord {
        /// 1-based spreadsheet row number (header is row 1).
        row: usize,
        /// Store error message.
        message: String,
    },

    /// The commit phase failed and the transaction was rolled back.
    #[error("Import transaction failed: {message}")]
    Transaction {
        /// What failed inside the transaction.
        message: String,
    },

    /// Content store backend error.
    #[error("Store error: {0}")]
    Store(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl PorygonError {
    /// Stable identifier for this error kind, used in CLI payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PorygonError::Io { .. } => "Io",
            PorygonError::UnsupportedFormat { .. } => "UnsupportedFormat",
            PorygonError::Read { .. } => "Read",
            PorygonError::MissingMapping => "MissingMapping",
            PorygonError::InvalidMapping { .. } => "InvalidMapping",
            PorygonError::TermNotFound { .. } => "TermNotFound",
            PorygonError::CreateRecord { .. } => "CreateRecord",
            PorygonError::Transaction { .. } => "Transaction",
            PorygonError::Store(_) => "Store",
            PorygonError::Json(_) => "Json",
            PorygonError::Other(_) => "Other",
        }
    }

    /// Remediation hint, when there is a useful one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PorygonError::UnsupportedFormat { .. } => {
                Some("Export the sheet as comma-separated values (.csv) and retry")
            }
            PorygonError::MissingMapping => {
                Some("Select a column for the title field in the import manifest")
            }
            PorygonError::InvalidMapping { .. } => {
                Some("Column selections must be a column index or \"\" for unmapped")
            }
            PorygonError::CreateRecord { .. } | PorygonError::Transaction { .. } => {
                Some("No data was imported; fix the cause and re-run the whole file")
            }
            _ => None,
        }
    }

    /// File associated with this error, if any.
    pub fn file_path(&self) -> Option<&std::path::Path> {
        match self {
            PorygonError::Io { path, .. } => Some(path.as_path()),
            PorygonError::UnsupportedFormat { file, .. } => Some(file.as_path()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PorygonError {
    fn from(err: std::io::Error) -> Self {
        PorygonError::Io {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<csv::Error> for PorygonError {
    fn from(err: csv::Error) -> Self {
        PorygonError::Read {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for PorygonError {
    fn from(err: rusqlite::Error) -> Self {
        PorygonError::Store(err.to_string())
    }
}

/// Result type alias for Porygon operations.
pub type Result<T> = std::result::Result<T, PorygonError>;
