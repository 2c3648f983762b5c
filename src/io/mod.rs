//! IO module
//!
//! CSV input and output for the replay pipeline:
//! - `csv_format`: row structures, conversion, and loan output (pure)
//! - `reader`: streaming file reader with per-row error reporting

pub mod csv_format;
pub mod reader;

pub use csv_format::{convert_csv_action, write_loans_csv, ActionKind, ActionRecord, CsvAction};
pub use reader::ActionReader;
