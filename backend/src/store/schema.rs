//! SQL for the `Orders` table.

use rusqlite::Connection;

use crate::models::ORDERS_COLUMNS;

/// Name of the single table in the store.
pub const ORDERS_TABLE: &str = "Orders";

pub const CREATE_ORDERS_SQL: &str = "CREATE TABLE IF NOT EXISTS Orders (\
    Region TEXT, \
    Country TEXT, \
    ItemType TEXT, \
    SalesChannel TEXT, \
    OrderPriority TEXT, \
    OrderDate TEXT, \
    OrderID TEXT PRIMARY KEY, \
    ShipDate TEXT, \
    UnitsSold TEXT, \
    UnitPrice TEXT, \
    UnitCost TEXT, \
    TotalRevenue TEXT, \
    TotalCost TEXT, \
    TotalProfit TEXT, \
    OrderProcessingTime TEXT, \
    GrossMargin TEXT)";

pub const INSERT_ORDER_SQL: &str = "INSERT INTO Orders (\
    Region, Country, ItemType, SalesChannel, OrderPriority, OrderDate, OrderID, ShipDate, \
    UnitsSold, UnitPrice, UnitCost, TotalRevenue, TotalCost, TotalProfit, OrderProcessingTime, GrossMargin) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)";

/// Idempotent.
pub fn create_orders_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(CREATE_ORDERS_SQL, [])?;
    Ok(())
}

pub fn orders_table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [ORDERS_TABLE],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Whether `name` is a column of `Orders`. Case-insensitive, like SQLite identifiers.
pub fn is_orders_column(name: &str) -> bool {
    ORDERS_COLUMNS.iter().any(|column| column.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!orders_table_exists(&conn).unwrap());

        create_orders_table(&conn).unwrap();
        create_orders_table(&conn).unwrap();

        assert!(orders_table_exists(&conn).unwrap());
    }

    #[test]
    fn test_table_columns_match_schema() {
        let conn = Connection::open_in_memory().unwrap();
        create_orders_table(&conn).unwrap();

        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('Orders')").unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(names, ORDERS_COLUMNS);
    }

    #[test]
    fn test_is_orders_column() {
        assert!(is_orders_column("Region"));
        assert!(is_orders_column("GrossMargin"));
        assert!(!is_orders_column("Gross Margin"));
        assert!(is_orders_column("region"));
        assert!(is_orders_column("ORDERID"));
        assert!(!is_orders_column("Region; DROP TABLE Orders"));
    }
}
