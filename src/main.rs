//! Porygon CLI binary
//!
//! This is the main entry point for the porygon command-line interface.
//! The CLI is a thin adapter over existing APIs - NO logic is implemented here.

use porygon::cli::{parse_taxonomy_arg, CliErrorPayload, CliSuccessPayload, Commands};
use porygon::{ImportReport, PorygonError};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// What a command produced before it is printed.
enum Outcome {
    Success(CliSuccessPayload),
    Rejected(CliErrorPayload),
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = porygon::cli::parse_args();

    // Initialize logger if verbose
    if cli.verbose {
        env_logger::init();
    }

    // Execute command
    let result = match cli.command {
        Commands::Inspect {
            file,
            store,
            record_type,
            taxonomy,
        } => execute_inspect(&file, store.as_deref(), record_type.as_deref(), &taxonomy),

        Commands::Validate {
            file,
            mapping,
            store,
        } => execute_validate(&file, &mapping, &store),

        Commands::Import {
            file,
            mapping,
            store,
            timeout_secs,
        } => execute_import(&file, &mapping, &store, timeout_secs),
    };

    // Handle result
    match result {
        Ok(Outcome::Success(payload)) => {
            print_json(&payload);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Rejected(payload)) => {
            print_json(&payload);
            ExitCode::from(1)
        }
        Err(e) => {
            print_json(&CliErrorPayload::from_error(&e));
            ExitCode::from(1)
        }
    }
}

fn print_json<T: Serialize>(payload: &T) {
    match serde_json::to_string_pretty(payload) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to serialize output: {}", e),
    }
}

/// Execute the inspect command.
///
/// Reads the spreadsheet, then suggests a mapping from its headers. With
/// a store and record type, existing attribute keys are suggested too.
fn execute_inspect(
    file: &Path,
    store_path: Option<&Path>,
    record_type: Option<&str>,
    taxonomy_args: &[String],
) -> Result<Outcome, PorygonError> {
    use porygon::mapping::{
        discover_attribute_keys, suggest_field_mapping, suggest_taxonomy_mapping,
    };
    use porygon::reader::open_spreadsheet;
    use porygon::store::{ContentStore, SqliteStore};

    let spreadsheet = open_spreadsheet(file)?;

    let mut attribute_keys = Vec::new();
    let mut taxonomies: Vec<(String, String)> =
        taxonomy_args.iter().map(|raw| parse_taxonomy_arg(raw)).collect();
    let mut existing_records = None;

    if let Some(store_path) = store_path {
        let store = SqliteStore::open(store_path)?;
        if let Some(record_type) = record_type {
            attribute_keys = discover_attribute_keys(&store, record_type)?;
            existing_records = Some(store.record_count(record_type)?);
        }
        if taxonomies.is_empty() {
            taxonomies = store
                .known_taxonomies()?
                .into_iter()
                .map(|name| (name.clone(), name))
                .collect();
        }
    }

    let data = serde_json::json!({
        "file": file.to_string_lossy(),
        "headers": spreadsheet.headers,
        "rows": spreadsheet.rows.len(),
        "source_sha256": spreadsheet.source_sha256,
        "existing_records": existing_records,
        "fields": suggest_field_mapping(&spreadsheet.headers, &attribute_keys),
        "taxonomies": suggest_taxonomy_mapping(&spreadsheet.headers, &taxonomies),
    });

    Ok(Outcome::Success(CliSuccessPayload::with_data(
        format!(
            "Read {} columns and {} data rows",
            spreadsheet.headers.len(),
            spreadsheet.rows.len()
        ),
        data,
    )))
}

/// Execute the validate command: a dry run that never writes.
fn execute_validate(
    file: &Path,
    mapping: &Path,
    store_path: &Path,
) -> Result<Outcome, PorygonError> {
    use porygon::mapping::load_request_from_file;
    use porygon::reader::open_spreadsheet;
    use porygon::store::SqliteStore;
    use porygon::Importer;

    let request = load_request_from_file(mapping)?;
    let spreadsheet = open_spreadsheet(file)?;
    let mut store = SqliteStore::open(store_path)?;

    let report = Importer::new(&mut store).dry_run(&spreadsheet, &request)?;
    report_outcome(report, file)
}

/// Execute the import command.
///
/// This function is a thin adapter that:
/// 1. Loads the import manifest
/// 2. Reads the spreadsheet
/// 3. Opens the store
/// 4. Runs the importer (validate, then commit atomically)
fn execute_import(
    file: &Path,
    mapping: &Path,
    store_path: &Path,
    timeout_secs: Option<u64>,
) -> Result<Outcome, PorygonError> {
    use porygon::mapping::load_request_from_file;
    use porygon::reader::open_spreadsheet;
    use porygon::store::SqliteStore;
    use porygon::{ImportOptions, Importer};

    let request = load_request_from_file(mapping)?;
    let spreadsheet = open_spreadsheet(file)?;
    let mut store = SqliteStore::open(store_path)?;

    let options = ImportOptions {
        deadline: timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs)),
    };
    let report = Importer::new(&mut store)
        .with_options(options)
        .run(&spreadsheet, &request)?;
    report_outcome(report, file)
}

fn report_outcome(report: ImportReport, file: &Path) -> Result<Outcome, PorygonError> {
    if report.is_aborted() {
        return Ok(Outcome::Rejected(CliErrorPayload::from_aborted(&report, file)));
    }
    let message = report.message.clone();
    let data = serde_json::to_value(&report)?;
    Ok(Outcome::Success(CliSuccessPayload::with_data(message, data)))
}
