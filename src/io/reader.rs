//! Streaming CSV reader with iterator interface
//!
//! Provides a streaming iterator over replay actions from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as Err variants in the iterator so
//!   the caller can report them and continue
//! - Line numbers are included in error messages for debugging

use crate::io::csv_format::{convert_csv_action, ActionRecord, CsvAction};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming reader over replay action rows
///
/// Implements Iterator, yielding `Result<ActionRecord, String>` per row.
/// Rows are read one at a time; memory usage does not depend on file size.
#[derive(Debug)]
pub struct ActionReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl ActionReader {
    /// Create a new ActionReader from a file path
    ///
    /// The CSV reader is configured to trim whitespace and to tolerate rows
    /// with trailing optional columns missing.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(ActionReader)` if the file opened successfully
    /// * `Err(String)` if the file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for ActionReader {
    type Item = Result<ActionRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvAction>();

        match deserializer.next()? {
            Ok(csv_action) => {
                self.line_num += 1;
                // Line numbers are 1-based and offset by the header row.
                Some(
                    convert_csv_action(csv_action)
                        .map_err(|e| format!("Line {}: {}", self.line_num + 1, e)),
                )
            }
            Err(e) => {
                self.line_num += 1;
                Some(Err(format!(
                    "Line {}: CSV parse error: {}",
                    self.line_num + 1,
                    e
                )))
            }
        }
    }
}
