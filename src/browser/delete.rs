use rusqlite::{Connection, ErrorCode};
use serde::Serialize;
use tracing::{info, warn};

use super::{check_width, key_values, match_clause, require_table, row_exists};
use crate::error::{DbmsError, Result};
use crate::schema::{self, quote_ident, TableInfo};
use crate::value::CellValue;

/// Rows of another table that reference the row about to be deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeImpact {
    pub table: String,
    pub rows: i64,
    /// The referencing foreign key's `ON DELETE` action as the catalog reports it
    pub on_delete: String,
}

impl CascadeImpact {
    /// RESTRICT and NO ACTION make the engine refuse the delete
    pub fn blocks_delete(&self) -> bool {
        matches!(
            self.on_delete.to_ascii_uppercase().as_str(),
            "RESTRICT" | "NO ACTION" | ""
        )
    }

    fn effect(&self) -> &'static str {
        match self.on_delete.to_ascii_uppercase().as_str() {
            "CASCADE" => "will be deleted",
            "SET NULL" => "will have the reference set to NULL",
            "SET DEFAULT" => "will have the reference reset to its default",
            _ => "blocks the delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Nothing was deleted; the caller must confirm first
    Cascade {
        message: String,
        impacts: Vec<CascadeImpact>,
        /// At least one referencing table refuses the delete
        blocked: bool,
    },
    Deleted,
}

/// Count child rows, per referencing table and `ON DELETE` action, that point
/// at this row
pub fn cascade_impact(
    conn: &Connection,
    table: &TableInfo,
    row_data: &[String],
) -> Result<Vec<CascadeImpact>> {
    check_width(table, row_data)?;
    let mut impacts: Vec<CascadeImpact> = Vec::new();

    'refs: for reference in schema::inbound_references(conn, &table.name)? {
        let mut child_columns = Vec::with_capacity(reference.foreign_key.columns.len());
        let mut values = Vec::with_capacity(reference.foreign_key.columns.len());
        for (from, to) in &reference.foreign_key.columns {
            // References to an implicit rowid cannot be resolved from the form
            let Some(parent_column) = table.column(to) else {
                continue 'refs;
            };
            let value = CellValue::parse_input(parent_column, &row_data[parent_column.position])?;
            if value.is_null() {
                continue 'refs;
            }
            child_columns.push(from.as_str());
            values.push(value);
        }

        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            quote_ident(&reference.table),
            match_clause(child_columns.iter().copied())
        );
        let count: i64 = conn.query_row(&sql, rusqlite::params_from_iter(values.iter()), |r| {
            r.get(0)
        })?;
        if count == 0 {
            continue;
        }
        let on_delete = reference.foreign_key.on_delete;
        match impacts
            .iter_mut()
            .find(|i| i.table == reference.table && i.on_delete == on_delete)
        {
            Some(existing) => existing.rows += count,
            None => impacts.push(CascadeImpact {
                table: reference.table,
                rows: count,
                on_delete,
            }),
        }
    }
    Ok(impacts)
}

pub fn cascade_message(impacts: &[CascadeImpact]) -> String {
    let mut message =
        String::from("Deleting this row will have a cascade effect on the following tables:\n");
    for impact in impacts {
        let noun = if impact.rows == 1 { "row" } else { "rows" };
        message.push_str(&format!(
            "- {} ({} {}) {}\n",
            impact.table,
            impact.rows,
            noun,
            impact.effect()
        ));
    }
    if impacts.iter().any(CascadeImpact::blocks_delete) {
        message.push_str("This row cannot be deleted while those rows reference it.");
    } else {
        message.push_str("Are you sure you want to proceed?");
    }
    message
}

/// Delete one row by primary key.
///
/// When other rows reference it and `confirmed` is false nothing is deleted
/// and the cascade warning is returned instead.
pub fn delete_row(
    conn: &mut Connection,
    table_name: &str,
    row_data: &[String],
    confirmed: bool,
) -> Result<DeleteOutcome> {
    let table = require_table(conn, table_name)?;
    let keys = key_values(&table, row_data)?;
    let key_columns: Vec<&str> = keys.iter().map(|(c, _)| c.name.as_str()).collect();
    let key_params: Vec<&CellValue> = keys.iter().map(|(_, v)| v).collect();

    if !row_exists(conn, &table.name, &key_columns, &key_params)? {
        return Err(DbmsError::RowNotFound);
    }

    let impacts = cascade_impact(conn, &table, row_data)?;
    let blocked = impacts.iter().any(CascadeImpact::blocks_delete);
    if !impacts.is_empty() && !confirmed {
        warn!(table = %table.name, affected = impacts.len(), blocked, "delete needs confirmation");
        return Ok(DeleteOutcome::Cascade {
            message: cascade_message(&impacts),
            impacts,
            blocked,
        });
    }
    if blocked {
        let blockers: Vec<&str> = impacts
            .iter()
            .filter(|i| i.blocks_delete())
            .map(|i| i.table.as_str())
            .collect();
        return Err(DbmsError::BadRequest(format!(
            "Row is still referenced by {}",
            blockers.join(", ")
        )));
    }

    let sql = format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(&table.name),
        match_clause(key_columns.iter().copied())
    );
    let tx = conn.transaction()?;
    tx.execute(&sql, rusqlite::params_from_iter(key_params.iter()))
        .map_err(constraint_to_bad_request)?;
    tx.commit()?;
    info!(table = %table.name, cascaded = impacts.len(), "row deleted");
    Ok(DeleteOutcome::Deleted)
}

fn constraint_to_bad_request(err: rusqlite::Error) -> DbmsError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            DbmsError::BadRequest(format!(
                "Error deleting row: {}",
                msg.as_deref().unwrap_or("constraint failed")
            ))
        }
        _ => DbmsError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{row, shop};
    use super::*;

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn childless_row_is_deleted_immediately() {
        let mut conn = shop();
        let outcome = delete_row(&mut conn, "customer", &row(&["2", "Brian", "", "0", ""]), false)
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(count(&conn, "customer"), 2);
    }

    #[test]
    fn referenced_row_needs_confirmation() {
        let mut conn = shop();
        let data = row(&["1", "Ada", "", "1", ""]);
        let outcome = delete_row(&mut conn, "customer", &data, false).unwrap();
        match outcome {
            DeleteOutcome::Cascade {
                message,
                impacts,
                blocked,
            } => {
                assert_eq!(
                    impacts,
                    vec![CascadeImpact {
                        table: "purchase".to_string(),
                        rows: 2,
                        on_delete: "CASCADE".to_string(),
                    }]
                );
                assert!(!blocked);
                assert!(message.contains("- purchase (2 rows) will be deleted"));
                assert!(message.ends_with("Are you sure you want to proceed?"));
            }
            other => panic!("expected cascade warning, got {other:?}"),
        }
        assert_eq!(count(&conn, "customer"), 3);

        let outcome = delete_row(&mut conn, "customer", &data, true).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(count(&conn, "customer"), 2);
        // ON DELETE CASCADE removed the children
        assert_eq!(count(&conn, "purchase"), 1);
    }

    #[test]
    fn restricted_delete_is_a_client_error() {
        let mut conn = shop();
        conn.execute_batch(
            "CREATE TABLE review (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customer (id) ON DELETE RESTRICT);
             INSERT INTO review VALUES (1, 3);",
        )
        .unwrap();
        let err = delete_row(&mut conn, "customer", &row(&["3", "Cleo", "", "0", ""]), true)
            .unwrap_err();
        assert!(matches!(err, DbmsError::BadRequest(_)));
        assert_eq!(count(&conn, "customer"), 3);
    }

    #[test]
    fn no_action_child_is_reported_as_blocking() {
        let mut conn = shop();
        conn.execute_batch(
            "CREATE TABLE voucher (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customer (id));
             CREATE TABLE visit (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customer (id) ON DELETE SET NULL);
             INSERT INTO voucher VALUES (1, 3);
             INSERT INTO visit VALUES (1, 3);",
        )
        .unwrap();
        let data = row(&["3", "Cleo", "", "0", ""]);

        match delete_row(&mut conn, "customer", &data, false).unwrap() {
            DeleteOutcome::Cascade {
                message,
                impacts,
                blocked,
            } => {
                assert!(blocked);
                let voucher = impacts.iter().find(|i| i.table == "voucher").unwrap();
                assert_eq!(voucher.on_delete, "NO ACTION");
                assert!(voucher.blocks_delete());
                assert!(message.contains("- voucher (1 row) blocks the delete"));
                assert!(message.contains("- visit (1 row) will have the reference set to NULL"));
                assert!(message.ends_with("cannot be deleted while those rows reference it."));
            }
            other => panic!("expected cascade warning, got {other:?}"),
        }

        let err = delete_row(&mut conn, "customer", &data, true).unwrap_err();
        assert_eq!(err.to_string(), "Row is still referenced by voucher");
        assert_eq!(count(&conn, "customer"), 3);
        assert_eq!(count(&conn, "visit"), 1);
    }

    #[test]
    fn missing_row_and_unknown_table() {
        let mut conn = shop();
        assert!(matches!(
            delete_row(&mut conn, "customer", &row(&["77", "", "", "0", ""]), false),
            Err(DbmsError::RowNotFound)
        ));
        assert!(matches!(
            delete_row(&mut conn, "nope", &row(&["1"]), false),
            Err(DbmsError::UnknownTable(_))
        ));
    }
}
