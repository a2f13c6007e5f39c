//! Keep-first deduplication by a key column.

use std::collections::HashSet;

use crate::error::{TransformError, TransformResult};
use crate::models::Dataset;

/// Drop every row whose key repeats an earlier row's key.
///
/// All rows take part, the header included. Kept rows stay in their
/// original order. Returns the filtered dataset and the number of rows dropped.
pub fn dedupe_by(dataset: Dataset, key_index: usize, key_name: &str) -> TransformResult<(Dataset, usize)> {
    let rows = dataset.into_rows();
    let total = rows.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let mut kept = Vec::with_capacity(total);

    for (i, row) in rows.into_iter().enumerate() {
        let key = row.get(key_index).ok_or_else(|| TransformError::ShortRow {
            row: i,
            column: key_name.to_string(),
            needed: key_index + 1,
            found: row.len(),
        })?;

        if seen.insert(key.clone()) {
            kept.push(row);
        }
    }

    let removed = total - kept.len();
    Ok((Dataset::new(kept), removed))
}
