//! Delimited text in and out.
//!
//! Both directions use the same convention: one record per line, fields
//! separated by commas, no quoting and no escaping. A comma inside a field
//! is indistinguishable from a delimiter.

pub mod reader;
pub mod writer;

pub use reader::{decode_content, detect_encoding, parse_bytes, parse_str, read_dataset, read_dataset_file};
pub use writer::{to_csv_bytes, to_csv_string, write_dataset, write_dataset_file};

/// Field delimiter shared by the reader and the writer.
pub const DELIMITER: u8 = b',';
