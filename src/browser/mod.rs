//! Generic row operations over any table the catalog knows about
//!
//! Nothing here is tied to HTTP; handlers and the CLI both call into these
//! functions with a borrowed connection.

mod delete;
mod edit;

pub use delete::{cascade_impact, delete_row, CascadeImpact, DeleteOutcome};
pub use edit::update_row;

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{DbmsError, Result};
use crate::ordering::Direction;
use crate::schema::{self, quote_ident, ColumnInfo, TableInfo};
use crate::value::CellValue;

/// Rows of one table ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    pub table_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// More rows exist than were loaded
    pub truncated: bool,
}

impl TableData {
    pub fn empty(table: &TableInfo) -> Self {
        TableData {
            table_name: table.name.clone(),
            columns: table.column_names(),
            rows: Vec::new(),
            truncated: false,
        }
    }
}

/// Look up a table or fail with `UnknownTable`
pub fn require_table(conn: &Connection, name: &str) -> Result<TableInfo> {
    schema::describe_table(conn, name)?.ok_or_else(|| DbmsError::UnknownTable(name.to_string()))
}

/// Read up to `max_rows` rows, optionally ordered by one column.
///
/// Binary columns cannot be used for ordering.
pub fn load_table(
    conn: &Connection,
    table_name: &str,
    order: Option<(&str, Direction)>,
    max_rows: usize,
) -> Result<TableData> {
    let table = require_table(conn, table_name)?;

    let order_clause = match order {
        Some((column, direction)) => {
            let column = table
                .column(column)
                .ok_or_else(|| DbmsError::InvalidColumn(column.to_string()))?;
            if column.kind.is_binary() {
                return Err(DbmsError::BinaryOrdering(column.name.clone()));
            }
            format!(" ORDER BY {} {}", quote_ident(&column.name), direction.as_sql())
        }
        None => String::new(),
    };

    let sql = format!(
        "SELECT {} FROM {}{} LIMIT ?1",
        table.select_list(),
        quote_ident(&table.name),
        order_clause
    );
    let width = table.columns.len();
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query_map([max_rows as i64 + 1], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(CellValue::from_sql))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let truncated = rows.len() > max_rows;
    rows.truncate(max_rows);

    Ok(TableData {
        table_name: table.name.clone(),
        columns: table.column_names(),
        rows,
        truncated,
    })
}

/// Primary key columns paired with their values taken from `row_data`
pub(crate) fn key_values<'t>(
    table: &'t TableInfo,
    row_data: &[String],
) -> Result<Vec<(&'t ColumnInfo, CellValue)>> {
    let pk = table.primary_key();
    if pk.is_empty() {
        return Err(DbmsError::NoPrimaryKey(table.name.clone()));
    }
    check_width(table, row_data)?;
    pk.into_iter()
        .map(|col| Ok((col, CellValue::parse_input(col, &row_data[col.position])?)))
        .collect()
}

pub(crate) fn check_width(table: &TableInfo, row_data: &[String]) -> Result<()> {
    if row_data.len() < table.columns.len() {
        return Err(DbmsError::MalformedRow {
            expected: table.columns.len(),
            actual: row_data.len(),
        });
    }
    Ok(())
}

/// `"a" = ? AND "b" = ?` for the given columns
pub(crate) fn match_clause<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    columns
        .into_iter()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub(crate) fn row_exists(
    conn: &Connection,
    table: &str,
    columns: &[&str],
    values: &[&CellValue],
) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        quote_ident(table),
        match_clause(columns.iter().copied())
    );
    let exists: bool = conn.query_row(&sql, rusqlite::params_from_iter(values.iter()), |row| {
        row.get(0)
    })?;
    Ok(exists)
}


#[cfg(test)]
mod tests {
    use super::fixtures::shop;
    use super::*;

    #[test]
    fn loads_rows_in_storage_order() {
        let conn = shop();
        let data = load_table(&conn, "customer", None, 100).unwrap();
        assert_eq!(data.columns, vec!["id", "name", "joined", "vip", "avatar"]);
        assert_eq!(data.rows.len(), 3);
        assert_eq!(data.rows[0][1], CellValue::Text("Ada".to_string()));
        assert_eq!(data.rows[0][4], CellValue::Blob(vec![1, 2]));
        assert!(data.rows[1][2].is_null());
        assert!(!data.truncated);
    }

    #[test]
    fn orders_by_column_case_insensitively() {
        let conn = shop();
        let data = load_table(&conn, "CUSTOMER", Some(("Name", Direction::Desc)), 100).unwrap();
        assert_eq!(data.table_name, "customer");
        let names: Vec<String> = data.rows.iter().map(|r| r[1].to_string()).collect();
        assert_eq!(names, vec!["Cleo", "Brian", "Ada"]);
    }

    #[test]
    fn refuses_binary_and_unknown_columns() {
        let conn = shop();
        assert!(matches!(
            load_table(&conn, "customer", Some(("avatar", Direction::Asc)), 100),
            Err(DbmsError::BinaryOrdering(_))
        ));
        assert!(matches!(
            load_table(&conn, "customer", Some(("nope", Direction::Asc)), 100),
            Err(DbmsError::InvalidColumn(_))
        ));
        assert!(matches!(
            load_table(&conn, "ghost", None, 100),
            Err(DbmsError::UnknownTable(_))
        ));
    }

    #[test]
    fn generated_column_keeps_cells_under_their_headers() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE item (
                id INTEGER PRIMARY KEY,
                price REAL,
                doubled REAL GENERATED ALWAYS AS (price * 2),
                label TEXT
            );
            INSERT INTO item (id, price, label) VALUES (1, 5.0, 'apple');",
        )
        .unwrap();
        let data = load_table(&conn, "item", None, 10).unwrap();
        assert_eq!(data.columns, vec!["id", "price", "doubled", "label"]);
        assert_eq!(
            data.rows[0],
            vec![
                CellValue::Integer(1),
                CellValue::Real(5.0),
                CellValue::Real(10.0),
                CellValue::Text("apple".to_string()),
            ]
        );
    }

    #[test]
    fn caps_rows() {
        let conn = shop();
        let data = load_table(&conn, "purchase", Some(("id", Direction::Asc)), 2).unwrap();
        assert_eq!(data.rows.len(), 2);
        assert!(data.truncated);
    }
}
