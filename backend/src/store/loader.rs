//! Batch loader: transformed dataset → `Orders`.
//!
//! The whole load runs in one transaction. If any row fails, the
//! transaction is dropped without commit and rolled back, so callers never
//! see a partially loaded dataset.

use rusqlite::{params_from_iter, Connection, ErrorCode};
use serde::Serialize;

use super::schema::{create_orders_table, INSERT_ORDER_SQL};
use crate::error::{LoadError, LoadResult};
use crate::models::{Dataset, OrderRecord, ORDERS_COLUMNS};

/// Rows inserted between progress checkpoints.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// What a successful load did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub rows_inserted: usize,
    pub batches: usize,
}

/// Insert every data row of `dataset`; the header is never inserted.
///
/// `on_batch` is called after each batch with the summary so far.
pub fn load_dataset_with<F>(
    conn: &mut Connection,
    dataset: &Dataset,
    batch_size: usize,
    mut on_batch: F,
) -> LoadResult<LoadSummary>
where
    F: FnMut(&LoadSummary),
{
    if batch_size == 0 {
        return Err(LoadError::InvalidBatchSize(batch_size));
    }
    if let Some(header) = dataset.header() {
        check_header(header)?;
    }

    let tx = conn.transaction()?;
    create_orders_table(&tx)?;

    let mut summary = LoadSummary::default();
    {
        let mut stmt = tx.prepare(INSERT_ORDER_SQL)?;

        for (batch_no, batch) in dataset.data_rows().chunks(batch_size).enumerate() {
            for (offset, fields) in batch.iter().enumerate() {
                let row = batch_no * batch_size + offset + 1;
                let record = OrderRecord::from_fields(fields).ok_or(LoadError::RowShape {
                    row,
                    expected: ORDERS_COLUMNS.len(),
                    found: fields.len(),
                })?;

                stmt.execute(params_from_iter(record.values()))
                    .map_err(|err| insert_error(err, row, &record.order_id))?;
                summary.rows_inserted += 1;
            }
            summary.batches += 1;
            on_batch(&summary);
        }
    }

    tx.commit()?;
    Ok(summary)
}

pub fn load_dataset(conn: &mut Connection, dataset: &Dataset, batch_size: usize) -> LoadResult<LoadSummary> {
    load_dataset_with(conn, dataset, batch_size, |_| {})
}

/// The header must name the Orders columns in order. Spaces are ignored,
/// so both `Order ID` and `OrderID` match the `OrderID` column.
pub fn check_header(header: &[String]) -> LoadResult<()> {
    let width = header.len().max(ORDERS_COLUMNS.len());
    for position in 0..width {
        let found = header.get(position).map(|name| name.replace(' ', ""));
        let expected = ORDERS_COLUMNS.get(position).copied();
        if found.as_deref() != expected {
            return Err(LoadError::HeaderMismatch {
                position: position + 1,
                expected: expected.unwrap_or("<no column>").to_string(),
                found: header
                    .get(position)
                    .cloned()
                    .unwrap_or_else(|| "<missing>".to_string()),
            });
        }
    }
    Ok(())
}

fn insert_error(err: rusqlite::Error, row: usize, order_id: &str) -> LoadError {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            LoadError::DuplicateOrder {
                row,
                order_id: order_id.to_string(),
            }
        }
        other => LoadError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::orders_table_exists;

    fn order(id: &str, region: &str, units: &str) -> Vec<String> {
        vec![
            region, "Country", "Cereal", "Online", "High", "1/1/2020", id, "1/2/2020", units,
            "2.0", "1.0", "100", "90", "10", "1", "10.00",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn dataset(ids: &[&str]) -> Dataset {
        let mut rows = vec![ORDERS_COLUMNS.iter().map(|c| c.to_string()).collect()];
        rows.extend(ids.iter().map(|id| order(id, "US", "1")));
        Dataset::new(rows)
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM Orders", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_loads_every_data_row() {
        let mut conn = Connection::open_in_memory().unwrap();

        let summary = load_dataset(&mut conn, &dataset(&["1", "2", "3"]), DEFAULT_BATCH_SIZE).unwrap();

        assert_eq!(summary.rows_inserted, 3);
        assert_eq!(summary.batches, 1);
        assert_eq!(count(&conn), 3);
    }

    #[test]
    fn test_header_is_not_inserted() {
        let mut conn = Connection::open_in_memory().unwrap();
        load_dataset(&mut conn, &dataset(&["1"]), DEFAULT_BATCH_SIZE).unwrap();

        let header_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM Orders WHERE OrderID = 'OrderID'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(header_rows, 0);
    }

    #[test]
    fn test_batches_across_boundary() {
        let mut conn = Connection::open_in_memory().unwrap();
        let ids: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

        let mut seen = Vec::new();
        let summary = load_dataset_with(&mut conn, &dataset(&ids), 3, |s| seen.push(s.rows_inserted)).unwrap();

        assert_eq!(summary.batches, 3);
        assert_eq!(seen, vec![3, 6, 7]);
        assert_eq!(count(&conn), 7);
    }

    #[test]
    fn test_duplicate_in_batch_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();

        let err = load_dataset(&mut conn, &dataset(&["1", "2", "1"]), DEFAULT_BATCH_SIZE).unwrap_err();

        assert!(matches!(err, LoadError::DuplicateOrder { row: 3, ref order_id } if order_id == "1"));
        // Even the table creation was rolled back.
        assert!(!orders_table_exists(&conn).unwrap());
    }

    #[test]
    fn test_reload_conflicts_and_keeps_store() {
        let mut conn = Connection::open_in_memory().unwrap();
        load_dataset(&mut conn, &dataset(&["1", "2"]), DEFAULT_BATCH_SIZE).unwrap();

        let err = load_dataset(&mut conn, &dataset(&["3", "2"]), DEFAULT_BATCH_SIZE).unwrap_err();

        assert!(matches!(err, LoadError::DuplicateOrder { .. }));
        assert_eq!(count(&conn), 2);
        let missing: i64 = conn
            .query_row("SELECT COUNT(*) FROM Orders WHERE OrderID = '3'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(missing, 0);
    }

    #[test]
    fn test_malformed_row_fails_load() {
        let mut conn = Connection::open_in_memory().unwrap();
        let mut data = dataset(&["1"]).into_rows();
        let mut short = order("2", "US", "1");
        short.truncate(14);
        data.push(short);

        let err = load_dataset(&mut conn, &Dataset::new(data), DEFAULT_BATCH_SIZE).unwrap_err();

        assert!(matches!(err, LoadError::RowShape { row: 2, expected: 16, found: 14 }));
        assert!(!orders_table_exists(&conn).unwrap());
    }

    #[test]
    fn test_default_batch_size_splits_past_one_thousand() {
        let mut conn = Connection::open_in_memory().unwrap();
        let ids: Vec<String> = (0..1001).map(|i| i.to_string()).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

        let summary = load_dataset(&mut conn, &dataset(&ids), DEFAULT_BATCH_SIZE).unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.rows_inserted, 1001);
        assert_eq!(count(&conn), 1001);
    }

    #[test]
    fn test_transformed_header_is_accepted() {
        let header = "Region,Country,Item Type,Sales Channel,Order Priority,Order Date,Order ID,Ship Date,Units Sold,Unit Price,Unit Cost,Total Revenue,Total Cost,Total Profit,Order Processing Time,Gross Margin";
        let header: Vec<String> = header.split(',').map(String::from).collect();

        assert!(check_header(&header).is_ok());
    }

    #[test]
    fn test_reordered_columns_fail_load() {
        use crate::tabular::parse_str;
        use crate::transform::transform_dataset;

        let raw = parse_str(
            "Country,Region,Item Type,Sales Channel,Order Priority,Order Date,Order ID,Ship Date,Units Sold,Unit Price,Unit Cost,Total Revenue,Total Cost,Total Profit\n\
             US,North America,Cereal,Online,H,1/1/2020,A,1/2/2020,5,20,18,100,90,10\n",
        )
        .unwrap();
        let transformed = transform_dataset(raw).unwrap().dataset;
        let mut conn = Connection::open_in_memory().unwrap();

        let err = load_dataset(&mut conn, &transformed, DEFAULT_BATCH_SIZE).unwrap_err();

        assert!(matches!(
            err,
            LoadError::HeaderMismatch { position: 1, ref expected, ref found }
                if expected == "Region" && found == "Country"
        ));
        assert!(!orders_table_exists(&conn).unwrap());
    }

    #[test]
    fn test_short_header_fails_load() {
        let mut rows = dataset(&["1"]).into_rows();
        rows[0].pop();
        let mut conn = Connection::open_in_memory().unwrap();

        let err = load_dataset(&mut conn, &Dataset::new(rows), DEFAULT_BATCH_SIZE).unwrap_err();

        assert!(matches!(
            err,
            LoadError::HeaderMismatch { position: 16, ref found, .. } if found == "<missing>"
        ));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = load_dataset(&mut conn, &dataset(&["1"]), 0).unwrap_err();
        assert!(matches!(err, LoadError::InvalidBatchSize(0)));
    }

    #[test]
    fn test_header_only_creates_table() {
        let mut conn = Connection::open_in_memory().unwrap();

        let summary = load_dataset(&mut conn, &dataset(&[]), DEFAULT_BATCH_SIZE).unwrap();

        assert_eq!(summary, LoadSummary::default());
        assert!(orders_table_exists(&conn).unwrap());
        assert_eq!(count(&conn), 0);
    }
}
