//! The single-file SQLite order store.
//!
//! - Schema: the `Orders` table (16 TEXT columns, `OrderID` primary key)
//! - Loader: transactional batch insert of a transformed dataset
//! - Query: filtered aggregations with bound filter values
//!
//! One [`Store`] owns one connection. Nothing here locks the file against
//! other processes: two loaders writing the same file at once are not
//! supported.

pub mod loader;
pub mod query;
pub mod schema;

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub use loader::{load_dataset, load_dataset_with, LoadSummary, DEFAULT_BATCH_SIZE};
pub use query::{build_query, execute, Aggregates, BuiltQuery, QueryOutcome, QuerySpec};
pub use schema::{create_orders_table, orders_table_exists, ORDERS_TABLE};

use crate::error::LoadResult;
use crate::models::{Dataset, OrderRecord, ORDERS_COLUMNS};

/// Handle on an order store.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn load(&mut self, dataset: &Dataset, batch_size: usize) -> LoadResult<LoadSummary> {
        load_dataset(&mut self.conn, dataset, batch_size)
    }

    /// Load, reporting progress after each batch.
    pub fn load_with<F>(&mut self, dataset: &Dataset, batch_size: usize, on_batch: F) -> LoadResult<LoadSummary>
    where
        F: FnMut(&LoadSummary),
    {
        load_dataset_with(&mut self.conn, dataset, batch_size, on_batch)
    }

    pub fn query(&self, spec: &QuerySpec) -> QueryOutcome {
        execute(&self.conn, spec)
    }

    /// Number of stored orders; 0 when nothing was ever loaded.
    pub fn count_orders(&self) -> rusqlite::Result<i64> {
        if !orders_table_exists(&self.conn)? {
            return Ok(0);
        }
        self.conn
            .query_row("SELECT COUNT(*) FROM Orders", [], |row| row.get(0))
    }

    /// Look up one order by id.
    pub fn order(&self, order_id: &str) -> rusqlite::Result<Option<OrderRecord>> {
        if !orders_table_exists(&self.conn)? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {} FROM Orders WHERE OrderID = ?1",
            ORDERS_COLUMNS.join(", ")
        );
        self.conn
            .query_row(&sql, [order_id], |row| {
                let fields = (0..ORDERS_COLUMNS.len())
                    .map(|i| row.get::<_, Option<String>>(i).map(Option::unwrap_or_default))
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(OrderRecord::from_fields(&fields))
            })
            .optional()
            .map(Option::flatten)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, flushing everything to the file.
    pub fn close(self) -> rusqlite::Result<()> {
        self.conn.close().map_err(|(_, err)| err)
    }
}
