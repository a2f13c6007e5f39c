//! The four-step order transform.
//!
//! ```text
//! raw ──▶ + Order Processing Time ──▶ Order Priority words ──▶ + Gross Margin ──▶ dedupe by Order ID
//! ```
//!
//! Steps run in this order because later ones look up columns appended by
//! earlier ones. Every step takes the dataset by value and returns a new one.

use serde::Serialize;

use super::columns::ColumnIndex;
use super::dedupe::dedupe_by;
use super::derive::{gross_margin_value, normalize_priority, processing_days, DeriveError};
use crate::error::{TransformError, TransformResult};
use crate::models::{columns, Dataset, Row};

/// A derived value that could not be computed.
///
/// The row is kept and the derived field is left empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformIssue {
    /// Row position in the dataset (header = 0).
    pub row: usize,
    /// Derived column that was left empty.
    pub column: String,
    pub message: String,
}

impl TransformIssue {
    fn new(row: usize, column: &str, error: DeriveError) -> Self {
        Self {
            row,
            column: column.to_string(),
            message: error.to_string(),
        }
    }
}

/// Output of [`transform_dataset`].
#[derive(Debug, Clone)]
pub struct TransformReport {
    pub dataset: Dataset,
    pub issues: Vec<TransformIssue>,
    pub duplicates_removed: usize,
}

impl TransformReport {
    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Transformed: {} orders, {} issues, {} duplicates removed",
            self.dataset.data_len(),
            self.issues.len(),
            self.duplicates_removed
        )
    }
}

/// Run all four steps.
pub fn transform_dataset(dataset: Dataset) -> TransformResult<TransformReport> {
    let (dataset, mut issues) = append_processing_time(dataset)?;
    let dataset = normalize_priorities(dataset)?;
    let (dataset, margin_issues) = append_gross_margin(dataset)?;
    issues.extend(margin_issues);
    let (dataset, duplicates_removed) = dedupe_orders(dataset)?;

    Ok(TransformReport {
        dataset,
        issues,
        duplicates_removed,
    })
}

/// Step 1: append "Order Processing Time" (days from order to ship).
pub fn append_processing_time(dataset: Dataset) -> TransformResult<(Dataset, Vec<TransformIssue>)> {
    let (header, rows) = split_header(dataset)?;
    let header = with_column(header, columns::ORDER_PROCESSING_TIME);
    let index = ColumnIndex::new(&header);
    let order_date = index.require(columns::ORDER_DATE)?;
    let ship_date = index.require(columns::SHIP_DATE)?;

    let mut issues = Vec::new();
    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(header);

    for (i, mut row) in rows.into_iter().enumerate() {
        let position = i + 1;
        let value = match processing_days(
            field(&row, position, order_date, columns::ORDER_DATE)?,
            field(&row, position, ship_date, columns::SHIP_DATE)?,
        ) {
            Ok(days) => days.to_string(),
            Err(err) => {
                issues.push(TransformIssue::new(position, columns::ORDER_PROCESSING_TIME, err));
                String::new()
            }
        };
        row.push(value);
        out.push(row);
    }

    Ok((Dataset::new(out), issues))
}

/// Step 2: replace priority codes with words, in place.
pub fn normalize_priorities(dataset: Dataset) -> TransformResult<Dataset> {
    let (header, rows) = split_header(dataset)?;
    let priority = ColumnIndex::new(&header).require(columns::ORDER_PRIORITY)?;

    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(header);

    for (i, mut row) in rows.into_iter().enumerate() {
        let value = normalize_priority(field(&row, i + 1, priority, columns::ORDER_PRIORITY)?);
        row[priority] = value;
        out.push(row);
    }

    Ok(Dataset::new(out))
}

/// Step 3: append "Gross Margin" (profit / revenue, percent).
pub fn append_gross_margin(dataset: Dataset) -> TransformResult<(Dataset, Vec<TransformIssue>)> {
    let (header, rows) = split_header(dataset)?;
    let header = with_column(header, columns::GROSS_MARGIN);
    let index = ColumnIndex::new(&header);
    let profit = index.require(columns::TOTAL_PROFIT)?;
    let revenue = index.require(columns::TOTAL_REVENUE)?;

    let mut issues = Vec::new();
    let mut out = Vec::with_capacity(rows.len() + 1);
    out.push(header);

    for (i, mut row) in rows.into_iter().enumerate() {
        let position = i + 1;
        let value = match gross_margin_value(
            field(&row, position, profit, columns::TOTAL_PROFIT)?,
            field(&row, position, revenue, columns::TOTAL_REVENUE)?,
        ) {
            Ok(margin) => margin.to_string(),
            Err(err) => {
                issues.push(TransformIssue::new(position, columns::GROSS_MARGIN, err));
                String::new()
            }
        };
        row.push(value);
        out.push(row);
    }

    Ok((Dataset::new(out), issues))
}

/// Step 4: keep the first row of each "Order ID".
pub fn dedupe_orders(dataset: Dataset) -> TransformResult<(Dataset, usize)> {
    let header = dataset.header().ok_or(TransformError::EmptyDataset)?;
    let order_id = ColumnIndex::new(header).require(columns::ORDER_ID)?;
    dedupe_by(dataset, order_id, columns::ORDER_ID)
}

fn split_header(dataset: Dataset) -> TransformResult<(Row, Vec<Row>)> {
    let mut rows = dataset.into_rows().into_iter();
    let header = rows.next().ok_or(TransformError::EmptyDataset)?;
    Ok((header, rows.collect()))
}

fn with_column(mut header: Row, name: &str) -> Row {
    header.push(name.to_string());
    header
}

fn field<'a>(row: &'a Row, position: usize, index: usize, column: &str) -> TransformResult<&'a str> {
    row.get(index)
        .map(String::as_str)
        .ok_or_else(|| TransformError::ShortRow {
            row: position,
            column: column.to_string(),
            needed: index + 1,
            found: row.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::parse_str;

    const HEADER: &str = "Region,Country,Item Type,Sales Channel,Order Priority,Order Date,Order ID,Ship Date,Units Sold,Unit Price,Unit Cost,Total Revenue,Total Cost,Total Profit";

    fn sales(lines: &[&str]) -> Dataset {
        let mut text = String::from(HEADER);
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        parse_str(&text).unwrap()
    }

    #[test]
    fn test_duplicate_order_end_to_end() {
        let input = sales(&[
            "North America,US,Cereal,Online,H,1/1/2020,A,1/2/2020,5,20,18,100,90,10",
            "North America,US,Cereal,Online,L,1/5/2020,A,1/9/2020,5,20,18,100,90,10",
        ]);

        let report = transform_dataset(input).unwrap();
        let dataset = report.dataset;

        assert_eq!(report.duplicates_removed, 1);
        assert!(report.issues.is_empty());
        assert_eq!(dataset.data_len(), 1);

        let header = dataset.header().unwrap();
        assert_eq!(header.len(), 16);
        assert_eq!(header[14], "Order Processing Time");
        assert_eq!(header[15], "Gross Margin");

        let row = &dataset.data_rows()[0];
        assert_eq!(row[4], "High");
        assert_eq!(row[6], "A");
        assert_eq!(row[14], "1");
        assert_eq!(row[15], "10.00");
    }

    #[test]
    fn test_bad_values_leave_empty_fields() {
        let input = sales(&[
            "Asia,Japan,Fruits,Offline,M,13/45/2020,B,1/2/2020,5,20,18,abc,90,10",
            "Asia,Japan,Fruits,Offline,C,2/1/2020,C,2/3/2020,5,20,18,0,90,10",
        ]);

        let report = transform_dataset(input).unwrap();
        let rows = report.dataset.data_rows();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][4], "Medium");
        assert_eq!(rows[0][14], "");
        assert_eq!(rows[0][15], "");
        assert_eq!(rows[1][4], "Critical");
        assert_eq!(rows[1][14], "2");
        assert_eq!(rows[1][15], "0.0");

        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].row, 1);
        assert_eq!(report.issues[0].column, "Order Processing Time");
        assert_eq!(report.issues[1].column, "Gross Margin");
    }

    #[test]
    fn test_unknown_priority_passes_through() {
        let input = sales(&["Asia,Japan,Fruits,Offline,Urgent,1/1/2020,B,1/2/2020,5,20,18,10,9,1"]);

        let report = transform_dataset(input).unwrap();
        assert_eq!(report.dataset.data_rows()[0][4], "Urgent");
    }

    #[test]
    fn test_header_only() {
        let report = transform_dataset(sales(&[])).unwrap();

        assert_eq!(report.dataset.len(), 1);
        assert_eq!(report.dataset.header().unwrap().len(), 16);
    }

    #[test]
    fn test_empty_dataset_is_fatal() {
        let err = transform_dataset(Dataset::default()).unwrap_err();
        assert!(matches!(err, TransformError::EmptyDataset));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let input = parse_str("Order Date,Ship Date\n1/1/2020,1/2/2020\n").unwrap();

        let err = transform_dataset(input).unwrap_err();
        assert!(matches!(err, TransformError::MissingColumn(ref c) if c == "Order Priority"));
    }

    #[test]
    fn test_short_row_is_fatal() {
        let input = sales(&["Asia,Japan,Fruits"]);

        let err = transform_dataset(input).unwrap_err();
        assert!(matches!(err, TransformError::ShortRow { row: 1, .. }));
    }

    #[test]
    fn test_steps_do_not_touch_input() {
        let input = sales(&["Asia,Japan,Fruits,Offline,H,1/1/2020,B,1/2/2020,5,20,18,10,9,1"]);
        let copy = input.clone();

        let (stepped, _) = append_processing_time(copy).unwrap();

        assert_eq!(input.header().unwrap().len(), 14);
        assert_eq!(stepped.header().unwrap().len(), 15);
    }

    #[test]
    fn test_summary() {
        let report = transform_dataset(sales(&[
            "Asia,Japan,Fruits,Offline,H,1/1/2020,B,1/2/2020,5,20,18,10,9,1",
        ]))
        .unwrap();
        assert_eq!(
            report.summary(),
            "Transformed: 1 orders, 0 issues, 0 duplicates removed"
        );
    }
}
