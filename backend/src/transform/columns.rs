//! Column lookup by header name.

use std::collections::HashMap;

use crate::error::{TransformError, TransformResult};

/// Position of `name` in `header`: linear scan, first exact match wins.
pub fn index_of(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|column| column == name)
}

/// Name → position map built once from a header row.
///
/// Build it after appending any derived column to the header, otherwise the
/// new column cannot be found.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(header: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(header.len());
        for (i, column) in header.iter().enumerate() {
            positions.entry(column.clone()).or_insert(i);
        }
        Self { positions }
    }

    /// Position of `name`, or `None` when the header has no such column.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Position of a column the caller cannot do without.
    pub fn require(&self, name: &str) -> TransformResult<usize> {
        self.position(name)
            .ok_or_else(|| TransformError::MissingColumn(name.to_string()))
    }
}
