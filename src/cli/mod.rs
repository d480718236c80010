//! Command-line interface for Porygon.
//!
//! This module handles argument parsing and JSON payload shapes only.
//! NO import logic or store operations are performed here.

use crate::import::ImportReport;
use crate::validate::ValidationError;
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Porygon: all-or-nothing spreadsheet import into a content store.
#[derive(Parser, Debug)]
#[command(name = "porygon")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_required = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available Porygon commands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Show headers, row count, and suggested mappings for a spreadsheet.
    Inspect {
        /// Path to the spreadsheet (.csv).
        #[arg(short, long)]
        file: PathBuf,

        /// Optional content store database, used to discover attribute keys.
        #[arg(long, value_name = "DB")]
        store: Option<PathBuf>,

        /// Record type whose existing attribute keys are suggested.
        #[arg(long = "record-type", value_name = "TYPE", requires = "store")]
        record_type: Option<String>,

        /// Taxonomy to suggest a column for, as NAME or NAME:LABEL.
        #[arg(long, value_name = "NAME[:LABEL]")]
        taxonomy: Vec<String>,
    },

    /// Validate every row against the store without importing anything.
    Validate {
        /// Path to the spreadsheet (.csv).
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the JSON import manifest.
        #[arg(short, long, value_name = "FILE")]
        mapping: PathBuf,

        /// Content store database.
        #[arg(long, value_name = "DB")]
        store: PathBuf,
    },

    /// Import every row in one transaction, or nothing at all.
    Import {
        /// Path to the spreadsheet (.csv).
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the JSON import manifest.
        #[arg(short, long, value_name = "FILE")]
        mapping: PathBuf,

        /// Content store database.
        #[arg(long, value_name = "DB")]
        store: PathBuf,

        /// Roll back if the commit phase runs longer than this.
        #[arg(long, value_name = "SECONDS")]
        timeout_secs: Option<u64>,
    },
}

/// Parse command-line arguments.
///
/// Returns the parsed Cli struct or exits on error.
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Split a `NAME[:LABEL]` taxonomy argument. The label defaults to the name.
pub fn parse_taxonomy_arg(raw: &str) -> (String, String) {
    match raw.split_once(':') {
        Some((name, label)) if !label.trim().is_empty() => {
            (name.trim().to_string(), label.trim().to_string())
        }
        Some((name, _)) => (name.trim().to_string(), name.trim().to_string()),
        None => (raw.trim().to_string(), raw.trim().to_string()),
    }
}

/// JSON success payload for CLI responses.
#[derive(Serialize)]
pub struct CliSuccessPayload {
    /// Status indicator ("ok").
    pub status: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CliSuccessPayload {
    /// Construct a payload with structured data.
    pub fn with_data(message: String, data: Value) -> Self {
        Self {
            status: "ok",
            message,
            data: Some(data),
        }
    }
}

/// JSON error payload for CLI responses.
#[derive(Serialize)]
pub struct CliErrorPayload {
    /// Status indicator ("error").
    pub status: &'static str,
    /// Structured error details.
    pub error: ErrorDetails,
}

/// Details for a CLI error payload.
#[derive(Serialize)]
pub struct ErrorDetails {
    /// Error kind identifier (MissingMapping, ValidationFailed, etc.).
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Optional file context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Optional hint for remediation steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Per-row problems when validation rejected the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationError>>,
    /// Full import report, when one was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Value>,
}

impl CliErrorPayload {
    /// Build payload from a PorygonError instance.
    pub fn from_error(error: &crate::PorygonError) -> Self {
        let file = error
            .file_path()
            .map(|path| path.to_string_lossy().to_string());
        let hint = error.hint().map(|h| h.to_string());

        CliErrorPayload {
            status: "error",
            error: ErrorDetails {
                kind: error.kind(),
                message: error.to_string(),
                file,
                hint,
                errors: None,
                report: None,
            },
        }
    }

    /// Build payload for a batch that validation rejected.
    pub fn from_aborted(report: &ImportReport, file: &std::path::Path) -> Self {
        CliErrorPayload {
            status: "error",
            error: ErrorDetails {
                kind: "ValidationFailed",
                message: report.message.clone(),
                file: Some(file.to_string_lossy().to_string()),
                hint: Some("Fix the listed rows and re-run the whole file".to_string()),
                errors: Some(report.errors().to_vec()),
                report: serde_json::to_value(report).ok(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_taxonomy_arg() {
        assert_eq!(
            parse_taxonomy_arg("genre:Genres"),
            ("genre".to_string(), "Genres".to_string())
        );
        assert_eq!(
            parse_taxonomy_arg("genre"),
            ("genre".to_string(), "genre".to_string())
        );
        assert_eq!(
            parse_taxonomy_arg("genre:"),
            ("genre".to_string(), "genre".to_string())
        );
    }

    #[test]
    fn test_error_payload_shape() {
        let payload = CliErrorPayload::from_error(&crate::PorygonError::MissingMapping);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["kind"], "MissingMapping");
        assert!(json["error"].get("errors").is_none());
        assert!(json["error"]["hint"].is_string());
    }
}
