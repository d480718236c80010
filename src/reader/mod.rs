//! Spreadsheet reading.
//!
//! [`CsvRows`] is a lazy, single-pass row iterator over any byte stream.
//! [`Spreadsheet`] materialises a header row plus data rows, because an
//! import needs two passes (validate, then commit) over the same rows.

mod detect;

pub use detect::{detect_format, SourceFormat};

use crate::error::{PorygonError, Result};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Reader adapter that hashes every byte passing through it.
///
/// It also remembers the offsets of newlines the parser has not consumed
/// yet, so a record's line ending can be told apart from end of input.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    offset: u64,
    newlines: VecDeque<u64>,
}

impl<R: Read> HashingReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            offset: 0,
            newlines: VecDeque::new(),
        }
    }

    /// Hex SHA-256 of every byte read so far.
    pub fn hex_digest(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }

    /// Whether the byte at `offset` is `\n`. Forgets earlier newlines.
    fn newline_at(&mut self, offset: u64) -> bool {
        while self.newlines.front().is_some_and(|&at| at < offset) {
            self.newlines.pop_front();
        }
        self.newlines.front() == Some(&offset)
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        for (i, byte) in buf[..n].iter().enumerate() {
            if *byte == b'\n' {
                self.newlines.push_back(self.offset + i as u64);
            }
        }
        self.offset += n as u64;
        Ok(n)
    }
}

/// One parsed record and the file line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line number of the first byte of the record.
    pub line: usize,
    /// Cell values in column order.
    pub cells: Vec<String>,
}

/// Lazy iterator of comma-delimited rows.
///
/// Rows may have any length; column counts are not validated. Invalid
/// UTF-8 is replaced rather than rejected. Physically blank lines yield no
/// row but still count towards [`CsvRow::line`]. The underlying stream is
/// owned and released when the iterator is dropped.
pub struct CsvRows<R: Read> {
    records: csv::ByteRecordsIntoIter<HashingReader<R>>,
}

impl<R: Read> CsvRows<R> {
    /// Start reading rows from a byte stream.
    pub fn new(reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(false)
            .flexible(true)
            .from_reader(HashingReader::new(reader))
            .into_byte_records();
        Self { records }
    }

    /// Consume the iterator and return the SHA-256 of the bytes read.
    ///
    /// Only covers the whole stream once iteration has reached the end.
    pub fn finish(self) -> String {
        self.records.into_reader().into_inner().hex_digest()
    }

    /// Line on which the record just read starts.
    ///
    /// The parser reports its position before skipping blank lines, so the
    /// start is counted back from the line after the record: minus the
    /// newlines inside quoted cells, minus the record's own line ending.
    fn start_line(&mut self, record: &csv::ByteRecord) -> usize {
        let after = self.records.reader().position().clone();
        let embedded: usize = record
            .iter()
            .map(|field| field.iter().filter(|&&b| b == b'\n').count())
            .sum();
        let terminated = after.byte() > 0
            && self
                .records
                .reader_mut()
                .get_mut()
                .newline_at(after.byte() - 1);
        (after.line() as usize)
            .saturating_sub(embedded + usize::from(terminated))
            .max(1)
    }
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = Result<CsvRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(PorygonError::from(err))),
        };
        let line = self.start_line(&record);
        let cells = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        Some(Ok(CsvRow { line, cells }))
    }
}

/// Header row plus data rows of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    /// Column names (row 1 of the file).
    pub headers: Vec<String>,
    /// Data rows in file order.
    pub rows: Vec<Vec<String>>,
    /// Hex SHA-256 of the source bytes, when read from a stream.
    pub source_sha256: Option<String>,
    lines: Vec<usize>,
}

impl Spreadsheet {
    /// Build a spreadsheet from in-memory rows.
    ///
    /// Data row `i` is numbered `i + 2`, as if the file had no blank lines.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let lines = (0..rows.len()).map(|index| index + 2).collect();
        Self {
            headers,
            rows,
            source_sha256: None,
            lines,
        }
    }

    /// Read a whole CSV stream.
    ///
    /// A stream with no rows at all is a read error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rows = CsvRows::new(reader);
        let headers = match rows.next() {
            Some(headers) => headers?.cells,
            None => {
                return Err(PorygonError::Read {
                    message: "Invalid CSV file or unable to read".to_string(),
                })
            }
        };
        let mut data = Vec::new();
        let mut lines = Vec::new();
        for row in rows.by_ref() {
            let row = row?;
            lines.push(row.line);
            data.push(row.cells);
        }
        let digest = rows.finish();
        Ok(Self {
            headers,
            rows: data,
            source_sha256: Some(digest),
            lines,
        })
    }

    /// Spreadsheet line number (1-based) of data row `index`.
    pub fn row_number(&self, index: usize) -> usize {
        self.lines.get(index).copied().unwrap_or(index + 2)
    }

    /// Data rows paired with their spreadsheet line numbers.
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &[String])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, cells)| (self.row_number(index), cells.as_slice()))
    }
}

/// Open an uploaded file and read it as a spreadsheet.
///
/// Only `.csv` is accepted. `.xlsx` is recognised and refused as not yet
/// supported; any other extension is an invalid file type.
pub fn open_spreadsheet(path: &Path) -> Result<Spreadsheet> {
    match detect_format(path) {
        SourceFormat::Csv => {}
        SourceFormat::Xlsx => {
            return Err(PorygonError::UnsupportedFormat {
                file: path.to_path_buf(),
                message: "XLSX import is not yet supported".to_string(),
            })
        }
        SourceFormat::Unknown => {
            return Err(PorygonError::UnsupportedFormat {
                file: path.to_path_buf(),
                message: "Invalid file type. Please upload a CSV file".to_string(),
            })
        }
    }

    let file = File::open(path).map_err(|e| PorygonError::Read {
        message: format!("Failed to open '{}': {}", path.display(), e),
    })?;
    let spreadsheet = Spreadsheet::from_reader(file)?;
    log::debug!(
        "read {} data rows with {} columns from {}",
        spreadsheet.rows.len(),
        spreadsheet.headers.len(),
        path.display()
    );
    Ok(spreadsheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_tolerate_ragged_lengths() {
        let data = "title,content,genre\nAda,bio\nGrace,notes,CS,extra\n";
        let sheet = Spreadsheet::from_reader(data.as_bytes()).unwrap();

        assert_eq!(sheet.headers, vec!["title", "content", "genre"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], vec!["Ada", "bio"]);
        assert_eq!(sheet.rows[1].len(), 4);
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let data = "title,genre\n\"Ada, Countess\",\"Math,Science\"\n";
        let sheet = Spreadsheet::from_reader(data.as_bytes()).unwrap();
        assert_eq!(sheet.rows[0], vec!["Ada, Countess", "Math,Science"]);
    }

    #[test]
    fn test_empty_stream_is_read_error() {
        let err = Spreadsheet::from_reader("".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), "Read");
    }

    #[test]
    fn test_digest_covers_whole_stream() {
        let data = "title\nAda\n";
        let sheet = Spreadsheet::from_reader(data.as_bytes()).unwrap();
        let expected = format!("{:x}", Sha256::digest(data.as_bytes()));
        assert_eq!(sheet.source_sha256, Some(expected));
    }

    #[test]
    fn test_lazy_rows_yield_in_order() {
        let mut rows = CsvRows::new("a,b\n1,2\n".as_bytes());
        assert_eq!(rows.next().unwrap().unwrap().cells, vec!["a", "b"]);
        assert_eq!(rows.next().unwrap().unwrap().cells, vec!["1", "2"]);
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_blank_lines_keep_line_numbers() {
        let data = "title\nAda\n\n\nGrace\n\"Multi\nline\"\nEdsger\n";
        let sheet = Spreadsheet::from_reader(data.as_bytes()).unwrap();
        let lines: Vec<usize> = sheet.numbered_rows().map(|(line, _)| line).collect();
        assert_eq!(lines, vec![2, 5, 6, 8]);
    }

    #[test]
    fn test_crlf_without_trailing_newline() {
        let sheet = Spreadsheet::from_reader("title\r\nAda\r\n\r\nGrace".as_bytes()).unwrap();
        let lines: Vec<usize> = sheet.numbered_rows().map(|(line, _)| line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(sheet.rows[1], vec!["Grace"]);
    }

    #[test]
    fn test_in_memory_rows_number_from_two() {
        let sheet = Spreadsheet::new(vec!["title".to_string()], vec![vec!["Ada".to_string()]; 2]);
        assert_eq!(sheet.row_number(0), 2);
        assert_eq!(sheet.row_number(1), 3);
    }
}
