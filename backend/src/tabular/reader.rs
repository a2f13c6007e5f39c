//! Tabular reader with encoding auto-detection.
//!
//! Splits text on line terminators, then on commas. Fields are kept
//! byte-for-byte: no trimming, no quote handling. Empty lines are skipped.

use std::io::Read;
use std::path::Path;

use super::DELIMITER;
use crate::error::ReadResult;
use crate::models::Dataset;

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to text.
///
/// Valid UTF-8 is used as is. Anything else goes through encoding detection,
/// falling back to lossy UTF-8 for charsets we do not map.
pub fn decode_content(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    match detect_encoding(bytes).as_str() {
        "iso-8859-1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Read a whole stream into a dataset.
///
/// The stream is consumed completely before parsing, so a read failure
/// never yields a partial dataset.
pub fn read_dataset<R: Read>(mut reader: R) -> ReadResult<Dataset> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_bytes(&bytes)
}

/// Read a dataset from a local file.
pub fn read_dataset_file<P: AsRef<Path>>(path: P) -> ReadResult<Dataset> {
    let file = std::fs::File::open(path.as_ref())?;
    read_dataset(file)
}

/// Parse raw bytes into a dataset.
pub fn parse_bytes(bytes: &[u8]) -> ReadResult<Dataset> {
    parse_str(&decode_content(bytes))
}

/// Parse already-decoded text into a dataset.
pub fn parse_str(content: &str) -> ReadResult<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(DELIMITER)
        .quoting(false)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(Dataset::new(rows))
}
