use rusqlite::Connection;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{key_values, match_clause, require_table, row_exists};
use crate::error::{DbmsError, Result};
use crate::schema::quote_ident;
use crate::value::CellValue;

/// Overwrite one row with positional values from the edit form.
///
/// `row_data` is aligned with the table's columns. The primary key locates
/// the row and is never rewritten; binary and generated columns are not
/// editable and keep their stored values. Foreign key values must point at an
/// existing parent.
pub fn update_row(conn: &Connection, table_name: &str, row_data: &[String]) -> Result<usize> {
    let table = require_table(conn, table_name)?;
    let keys = key_values(&table, row_data)?;

    let key_columns: Vec<&str> = keys.iter().map(|(c, _)| c.name.as_str()).collect();
    let key_params: Vec<&CellValue> = keys.iter().map(|(_, v)| v).collect();
    if !row_exists(conn, &table.name, &key_columns, &key_params)? {
        return Err(DbmsError::RowNotFound);
    }

    let mut assignments: Vec<(&str, CellValue)> = Vec::new();
    for column in &table.columns {
        if column.is_primary_key() || !column.is_editable() {
            continue;
        }
        let value = CellValue::parse_input(column, &row_data[column.position])?;
        assignments.push((column.name.as_str(), value));
    }

    // Values each foreign key would hold after the update
    let mut new_values: HashMap<String, &CellValue> = keys
        .iter()
        .map(|(c, v)| (c.name.to_lowercase(), v))
        .collect();
    for (name, value) in &assignments {
        new_values.insert(name.to_lowercase(), value);
    }
    for fk in &table.foreign_keys {
        let mut parent_columns = Vec::with_capacity(fk.columns.len());
        let mut values = Vec::with_capacity(fk.columns.len());
        for (from, to) in &fk.columns {
            match new_values.get(&from.to_lowercase()) {
                Some(value) if !value.is_null() => {
                    parent_columns.push(to.as_str());
                    values.push(*value);
                }
                // Unchanged (binary) or null references are not checked
                _ => break,
            }
        }
        if values.len() != fk.columns.len() {
            continue;
        }
        if !row_exists(conn, &fk.to_table, &parent_columns, &values)? {
            let names: Vec<&str> = fk.from_columns().collect();
            return Err(DbmsError::RelatedNotFound(names.join(", ")));
        }
    }

    if assignments.is_empty() {
        debug!(table = %table.name, "nothing editable in row");
        return Ok(0);
    }

    let set_clause = assignments
        .iter()
        .map(|(name, _)| format!("{} = ?", quote_ident(name)))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(&table.name),
        set_clause,
        match_clause(key_columns.iter().copied())
    );
    let params = assignments
        .iter()
        .map(|(_, v)| v)
        .chain(key_params.iter().copied());
    let changed = conn.execute(&sql, rusqlite::params_from_iter(params))?;
    info!(table = %table.name, changed, "row updated");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{row, shop};
    use super::*;

    fn customer(conn: &Connection, id: i64) -> (String, Option<String>, i64) {
        conn.query_row(
            "SELECT name, joined, vip FROM customer WHERE id = ?1",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap()
    }

    #[test]
    fn updates_editable_columns() {
        let conn = shop();
        let changed = update_row(
            &conn,
            "customer",
            &row(&["2", "Bryan", "2024-02-01T08:15", "true", "<0 bytes>"]),
        )
        .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(
            customer(&conn, 2),
            ("Bryan".to_string(), Some("2024-02-01 08:15:00".to_string()), 1)
        );
    }

    #[test]
    fn binary_column_is_left_alone() {
        let conn = shop();
        update_row(&conn, "customer", &row(&["1", "Ada L.", "", "1", "garbage"])).unwrap();
        let avatar: Vec<u8> = conn
            .query_row("SELECT avatar FROM customer WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(avatar, vec![1, 2]);
        assert_eq!(customer(&conn, 1).1, None);
    }

    #[test]
    fn unchanged_row_with_generated_column_saves_cleanly() {
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
        let loaded = super::super::load_table(&conn, "item", None, 10).unwrap();
        let form: Vec<String> = loaded.rows[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(update_row(&conn, "item", &form).unwrap(), 1);

        let (price, label): (f64, String) = conn
            .query_row("SELECT price, label FROM item WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(price, 5.0);
        assert_eq!(label, "apple");
    }

    #[test]
    fn time_column_text_survives_an_edit() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE shift (id INTEGER PRIMARY KEY, name TEXT, starts time, meta json);
             INSERT INTO shift VALUES (1, 'early', '06:30:00', '{\"crew\": 3}');",
        )
        .unwrap();
        update_row(&conn, "shift", &row(&["1", "dawn", "06:30:00", "{\"crew\": 3}"])).unwrap();
        let stored: (String, String, String) = conn
            .query_row("SELECT name, starts, meta FROM shift WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(
            stored,
            (
                "dawn".to_string(),
                "06:30:00".to_string(),
                "{\"crew\": 3}".to_string()
            )
        );
    }

    #[test]
    fn missing_row_is_not_found() {
        let conn = shop();
        let err = update_row(&conn, "customer", &row(&["99", "Nobody", "", "0", ""])).unwrap_err();
        assert!(matches!(err, DbmsError::RowNotFound));
    }

    #[test]
    fn dangling_foreign_key_is_rejected() {
        let conn = shop();
        let err = update_row(&conn, "purchase", &row(&["10", "42", "9.5"])).unwrap_err();
        assert_eq!(err.to_string(), "Related object not found for customer_id");

        update_row(&conn, "purchase", &row(&["10", "2", "9.5"])).unwrap();
        let owner: i64 = conn
            .query_row("SELECT customer_id FROM purchase WHERE id = 10", [], |r| r.get(0))
            .unwrap();
        assert_eq!(owner, 2);
    }

    #[test]
    fn null_foreign_key_is_allowed() {
        let conn = shop();
        update_row(&conn, "purchase", &row(&["11", "", "20"])).unwrap();
        let owner: Option<i64> = conn
            .query_row("SELECT customer_id FROM purchase WHERE id = 11", [], |r| r.get(0))
            .unwrap();
        assert_eq!(owner, None);
    }

    #[test]
    fn bad_datetime_is_reported_by_column() {
        let conn = shop();
        let err = update_row(&conn, "customer", &row(&["3", "Cleo", "soon", "0", ""])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid datetime format for joined");
    }

    #[test]
    fn shape_errors() {
        let conn = shop();
        assert!(matches!(
            update_row(&conn, "customer", &row(&["1", "Ada"])),
            Err(DbmsError::MalformedRow { expected: 5, actual: 2 })
        ));
        assert!(matches!(
            update_row(&conn, "note", &row(&["x"])),
            Err(DbmsError::NoPrimaryKey(_))
        ));
        assert!(matches!(
            update_row(&conn, "ghost", &row(&["1"])),
            Err(DbmsError::UnknownTable(_))
        ));
    }
}
