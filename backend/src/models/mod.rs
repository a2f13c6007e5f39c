//! Domain models for the salesdb pipeline.
//!
//! - [`Dataset`] - Header row plus data rows, all untyped text
//! - [`OrderPriority`] - Single-letter priority codes and their words
//! - [`OrderRecord`] - One row of the `Orders` table, typed at the store boundary
//! - [`columns`] - Column names of the input CSV and of the `Orders` table

use serde::{Deserialize, Serialize};

// =============================================================================
// Column names
// =============================================================================

/// CSV header names the transform looks up or appends.
pub mod columns {
    pub const ORDER_PRIORITY: &str = "Order Priority";
    pub const ORDER_DATE: &str = "Order Date";
    pub const ORDER_ID: &str = "Order ID";
    pub const SHIP_DATE: &str = "Ship Date";
    pub const TOTAL_REVENUE: &str = "Total Revenue";
    pub const TOTAL_PROFIT: &str = "Total Profit";
    pub const ORDER_PROCESSING_TIME: &str = "Order Processing Time";
    pub const GROSS_MARGIN: &str = "Gross Margin";
}

/// Column names of the `Orders` table, in insert order.
pub const ORDERS_COLUMNS: [&str; 16] = [
    "Region",
    "Country",
    "ItemType",
    "SalesChannel",
    "OrderPriority",
    "OrderDate",
    "OrderID",
    "ShipDate",
    "UnitsSold",
    "UnitPrice",
    "UnitCost",
    "TotalRevenue",
    "TotalCost",
    "TotalProfit",
    "OrderProcessingTime",
    "GrossMargin",
];

// =============================================================================
// Dataset
// =============================================================================

/// One line of delimited text, split into fields.
pub type Row = Vec<String>;

/// Ordered rows where row 0 is the header.
///
/// Rows are not required to share the header's field count; consumers
/// that index into a row report the mismatch themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// The header row, if the dataset has any row at all.
    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Rows 1..N.
    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// All rows, header included.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows, header included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of data rows.
    pub fn data_len(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for Dataset {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

// =============================================================================
// Order Priority
// =============================================================================

/// Priority of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl OrderPriority {
    /// Parse a single-letter code. Exact and case-sensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "L" => Some(Self::Low),
            "M" => Some(Self::Medium),
            "H" => Some(Self::High),
            "C" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

// =============================================================================
// Order Record
// =============================================================================

/// A fully transformed order, one field per `Orders` column.
///
/// Every field stays text: the store keeps values exactly as they were
/// rendered by the transform stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderRecord {
    pub region: String,
    pub country: String,
    pub item_type: String,
    pub sales_channel: String,
    pub order_priority: String,
    pub order_date: String,
    #[serde(rename = "OrderID")]
    pub order_id: String,
    pub ship_date: String,
    pub units_sold: String,
    pub unit_price: String,
    pub unit_cost: String,
    pub total_revenue: String,
    pub total_cost: String,
    pub total_profit: String,
    pub order_processing_time: String,
    pub gross_margin: String,
}

impl OrderRecord {
    /// Build a record from a positional row.
    ///
    /// Returns `None` unless the row has exactly one field per `Orders` column.
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        let [region, country, item_type, sales_channel, order_priority, order_date, order_id, ship_date, units_sold, unit_price, unit_cost, total_revenue, total_cost, total_profit, order_processing_time, gross_margin] =
            fields
        else {
            return None;
        };

        Some(Self {
            region: region.clone(),
            country: country.clone(),
            item_type: item_type.clone(),
            sales_channel: sales_channel.clone(),
            order_priority: order_priority.clone(),
            order_date: order_date.clone(),
            order_id: order_id.clone(),
            ship_date: ship_date.clone(),
            units_sold: units_sold.clone(),
            unit_price: unit_price.clone(),
            unit_cost: unit_cost.clone(),
            total_revenue: total_revenue.clone(),
            total_cost: total_cost.clone(),
            total_profit: total_profit.clone(),
            order_processing_time: order_processing_time.clone(),
            gross_margin: gross_margin.clone(),
        })
    }

    /// Field values in [`ORDERS_COLUMNS`] order.
    pub fn values(&self) -> [&str; 16] {
        [
            &self.region,
            &self.country,
            &self.item_type,
            &self.sales_channel,
            &self.order_priority,
            &self.order_date,
            &self.order_id,
            &self.ship_date,
            &self.units_sold,
            &self.unit_price,
            &self.unit_cost,
            &self.total_revenue,
            &self.total_cost,
            &self.total_profit,
            &self.order_processing_time,
            &self.gross_margin,
        ]
    }
}
