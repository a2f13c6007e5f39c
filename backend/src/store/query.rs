//! Filtered aggregation queries over `Orders`.
//!
//! A query is a set of equality filters (AND-ed) and an ordered list of
//! aggregation expressions, e.g. `SUM(UnitsSold)`:
//!
//! ```text
//! { Region: "Europe", Country: "France" } + [SUM(UnitsSold), AVG(UnitPrice)]
//!   ──▶ SELECT SUM(UnitsSold), AVG(UnitPrice) FROM Orders WHERE Country = ?1 AND Region = ?2
//! ```
//!
//! Filter values are bound, never spliced into the SQL. Filter columns must
//! be `Orders` columns. Aggregation expressions are passed through to SQLite
//! as written.

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::schema::{is_orders_column, ORDERS_TABLE};
use crate::error::QueryError;

/// Aggregation expression → value.
pub type Aggregates = BTreeMap<String, f64>;

/// Filters plus aggregations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Column → exact value, all must match.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Projection, in output order.
    #[serde(default)]
    pub aggregations: Vec<String>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(column.into(), value.into());
        self
    }

    pub fn aggregate(mut self, expression: impl Into<String>) -> Self {
        self.aggregations.push(expression.into());
        self
    }
}

/// SQL text plus the values bound to `?1..?N`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<String>,
}

pub fn build_query(spec: &QuerySpec) -> Result<BuiltQuery, QueryError> {
    if spec.aggregations.is_empty() {
        return Err(QueryError::NoAggregations);
    }
    if spec.filters.is_empty() {
        return Err(QueryError::NoFilters);
    }
    if let Some(column) = spec.filters.keys().find(|c| !is_orders_column(c)) {
        return Err(QueryError::UnknownColumn(column.clone()));
    }

    let predicates: Vec<String> = spec
        .filters
        .keys()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column, i + 1))
        .collect();

    Ok(BuiltQuery {
        sql: format!(
            "SELECT {} FROM {} WHERE {}",
            spec.aggregations.join(", "),
            ORDERS_TABLE,
            predicates.join(" AND ")
        ),
        params: spec.filters.values().cloned().collect(),
    })
}

/// Values read so far, and the error that stopped the query if any.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub values: Aggregates,
    pub error: Option<QueryError>,
}

impl QueryOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the partial values if the query failed.
    pub fn into_result(self) -> Result<Aggregates, QueryError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.values),
        }
    }
}

/// Run a query.
///
/// Every result row overwrites the values of the previous one, so with
/// more than one row only the last survives. On failure the outcome keeps
/// whatever values were read before it.
pub fn execute(conn: &Connection, spec: &QuerySpec) -> QueryOutcome {
    let mut values = Aggregates::new();
    let error = run(conn, spec, &mut values).err();
    QueryOutcome { values, error }
}

fn run(conn: &Connection, spec: &QuerySpec, values: &mut Aggregates) -> Result<(), QueryError> {
    let query = build_query(spec)?;
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;

    while let Some(row) = rows.next()? {
        for (i, aggregation) in spec.aggregations.iter().enumerate() {
            let value = as_f64(row.get_ref(i)?);
            values.insert(aggregation.clone(), value);
        }
    }

    Ok(())
}

/// Numeric reading of a result cell. NULL, blobs and non-numeric text read as 0.
fn as_f64(value: ValueRef<'_>) -> f64 {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => 0.0,
        ValueRef::Integer(i) => i as f64,
        ValueRef::Real(f) => f,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(0.0),
    }
}
