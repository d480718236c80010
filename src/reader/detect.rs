//! Spreadsheet format detection from file extensions.
//!
//! Table-driven. Never inspects file content.

use std::path::Path;

/// Spreadsheet formats the upload form offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Comma-separated values (.csv)
    Csv,
    /// Office Open XML workbook (.xlsx), recognised but not importable.
    Xlsx,
    /// Anything else.
    Unknown,
}

impl SourceFormat {
    /// Convert format to string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xlsx => "xlsx",
            SourceFormat::Unknown => "unknown",
        }
    }
}

/// Detect the spreadsheet format from a file path.
///
/// # Examples
///
/// ```
/// # use porygon::reader::{detect_format, SourceFormat};
/// # use std::path::Path;
/// assert_eq!(detect_format(Path::new("books.csv")), SourceFormat::Csv);
/// assert_eq!(detect_format(Path::new("Books.XLSX")), SourceFormat::Xlsx);
/// assert_eq!(detect_format(Path::new("books.txt")), SourceFormat::Unknown);
/// ```
pub fn detect_format(path: &Path) -> SourceFormat {
    let extension = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return SourceFormat::Unknown,
    };

    match extension.as_str() {
        "csv" => SourceFormat::Csv,
        "xlsx" => SourceFormat::Xlsx,
        _ => SourceFormat::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_extension_is_unknown() {
        assert_eq!(detect_format(Path::new("books")), SourceFormat::Unknown);
        assert_eq!(detect_format(Path::new(".csv")), SourceFormat::Unknown);
    }

    #[test]
    fn test_xls_is_not_xlsx() {
        assert_eq!(detect_format(Path::new("books.xls")), SourceFormat::Unknown);
    }
}
