//! Tabular writer, the inverse of the reader for comma-free fields.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::DELIMITER;
use crate::models::Dataset;

/// Write every row as one line, fields joined by commas.
pub fn write_dataset<W: Write>(dataset: &Dataset, mut writer: W) -> io::Result<()> {
    for row in dataset.rows() {
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                writer.write_all(&[DELIMITER])?;
            }
            writer.write_all(field.as_bytes())?;
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Write a dataset to a local file, replacing it.
pub fn write_dataset_file<P: AsRef<Path>>(dataset: &Dataset, path: P) -> io::Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_dataset(dataset, BufWriter::new(file))
}

pub fn to_csv_bytes(dataset: &Dataset) -> Vec<u8> {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_dataset(dataset, &mut out);
    out
}

pub fn to_csv_string(dataset: &Dataset) -> String {
    String::from_utf8_lossy(&to_csv_bytes(dataset)).into_owned()
}
