//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reads of replayed operations from any `futures` reader,
//! used by the concurrent replay strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Operations
//!                  ↓
//!           csv_format module
//!           (OperationCsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, OperationCsvRecord};
use crate::types::Operation;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Maintains streaming behavior with constant memory usage per batch.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
    skipped: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
            skipped: 0,
        }
    }

    /// Number of malformed rows skipped so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Read a batch of operations
    ///
    /// Reads up to `batch_size` rows. Malformed rows are logged with their
    /// line number and skipped, so a batch may hold fewer operations than rows
    /// read.
    ///
    /// # Returns
    ///
    /// The converted operations in file order. An empty vector means the end
    /// of the input was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Operation> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<OperationCsvRecord>();

        while batch.len() < batch_size {
            let next = records.next().await;
            if next.is_some() {
                self.line_num += 1;
            }
            match next {
                Some(Ok(record)) => match convert_csv_record(record) {
                    Ok(operation) => batch.push(operation),
                    Err(e) => {
                        self.skipped += 1;
                        warn!(line = self.line_num, error = %e, "skipping malformed row");
                    }
                },
                Some(Err(e)) => {
                    self.skipped += 1;
                    warn!(line = self.line_num, error = %e, "skipping unreadable row");
                }
                None => break,
            }
        }

        batch
    }
}
