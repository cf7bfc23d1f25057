//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over replayed operations from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to read and deserialize rows one at a
//! time, so memory use does not grow with the file. Each row is converted with
//! `csv_format::convert_csv_record`; failures carry the row's line number.
//!
//! ```no_run
//! use wallet_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("Replaying: {:?}", operation),
//!         Err(e) => eprintln!("Skipping: {}", e),
//!     }
//! }
//! ```

use crate::io::csv_format::{convert_csv_record, OperationCsvRecord};
use crate::types::{LedgerError, Operation};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Yields one `Result<Operation, LedgerError>` per data row.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open a CSV file for streaming iteration
    ///
    /// The reader trims whitespace from all fields and accepts short rows.
    ///
    /// # Errors
    ///
    /// * `FileNotFound` if the path does not exist
    /// * `IoError` for any other open failure
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), e),
            },
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<Operation, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.reader.deserialize::<OperationCsvRecord>().next()?;
        self.line_num += 1;
        let line = self.line_num;

        Some(match next {
            Ok(record) => convert_csv_record(record).map_err(|e| match e {
                LedgerError::ParseError { message, .. } => LedgerError::ParseError {
                    line: Some(line),
                    message,
                },
                other => other,
            }),
            Err(e) => Err(LedgerError::ParseError {
                line: Some(line),
                message: e.to_string(),
            }),
        })
    }
}
