//! Runtime schema introspection
//!
//! The browser never declares tables of its own. Everything it knows about a
//! table comes from the engine's catalog: `sqlite_master` for the table list,
//! `pragma_table_xinfo` for columns and `pragma_foreign_key_list` for
//! relations. Table and column names coming from a request are always
//! resolved through this module before they are spliced into SQL text.

mod column;

pub use column::{ColumnInfo, ColumnKind};

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKey>,
}

/// An outgoing reference from a table to a parent table.
///
/// Composite keys carry one `(from, to)` pair per column.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKey {
    pub to_table: String,
    pub columns: Vec<(String, String)>,
    pub on_delete: String,
}

impl ForeignKey {
    pub fn from_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(from, _)| from.as_str())
    }

    pub fn references(&self, column: &str) -> bool {
        self.from_columns().any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// A foreign key of `table` that points at the table being inspected.
#[derive(Debug, Clone, Serialize)]
pub struct InboundReference {
    pub table: String,
    pub foreign_key: ForeignKey,
}

impl TableInfo {
    /// Case-insensitive column lookup
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Primary key columns in key order; empty when none is declared
    pub fn primary_key(&self) -> Vec<&ColumnInfo> {
        let mut pk: Vec<&ColumnInfo> = self.columns.iter().filter(|c| c.is_primary_key()).collect();
        pk.sort_by_key(|c| c.primary_key_index);
        pk
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Comma separated, quoted column list in position order
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.references(column))
    }
}

/// Double-quote an identifier for splicing into SQL text
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Names of the browsable base tables, sorted, minus excluded prefixes
pub fn list_tables(conn: &Connection, excluded_prefixes: &[String]) -> Result<Vec<String>> {
    let tables = all_tables(conn)?;
    Ok(tables
        .into_iter()
        .filter(|name| !is_excluded(name, excluded_prefixes))
        .collect())
}

pub fn is_excluded(name: &str, excluded_prefixes: &[String]) -> bool {
    let lower = name.to_ascii_lowercase();
    excluded_prefixes
        .iter()
        .any(|prefix| lower.starts_with(&prefix.to_ascii_lowercase()))
}

fn all_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Resolve a table name case-insensitively to its stored spelling
pub fn resolve_table_name(conn: &Connection, name: &str) -> Result<Option<String>> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            params![name],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(found)
}

/// Full metadata for one table, `None` when it does not exist
pub fn describe_table(conn: &Connection, name: &str) -> Result<Option<TableInfo>> {
    let Some(name) = resolve_table_name(conn, name)? else {
        return Ok(None);
    };
    let columns = load_columns(conn, &name)?;
    let foreign_keys = load_foreign_keys(conn, &name)?;
    Ok(Some(TableInfo {
        name,
        columns,
        foreign_keys,
    }))
}

/// Declared column names in position order, `None` for an unknown table
pub fn column_names(conn: &Connection, table: &str) -> Result<Option<Vec<String>>> {
    Ok(describe_table(conn, table)?.map(|t| t.column_names()))
}

// `hidden` in pragma_table_xinfo: 0 plain, 1 hidden virtual-table column,
// 2 generated VIRTUAL, 3 generated STORED
const HIDDEN_VTAB_COLUMN: i64 = 1;

fn load_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk, hidden FROM pragma_table_xinfo(?1) ORDER BY cid",
    )?;
    let rows = stmt
        .query_map(params![table], |row| {
            let declared_type: String = row.get::<_, Option<String>>(1)?.unwrap_or_default();
            let hidden: i64 = row.get(5)?;
            Ok((
                hidden,
                ColumnInfo {
                    position: 0,
                    name: row.get(0)?,
                    kind: ColumnKind::from_declared_type(&declared_type),
                    declared_type,
                    not_null: row.get::<_, i64>(2)? != 0,
                    default_value: row.get(3)?,
                    primary_key_index: row.get::<_, i64>(4)? as usize,
                    generated: hidden > HIDDEN_VTAB_COLUMN,
                },
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Positions index the explicit select list built from these columns
    Ok(rows
        .into_iter()
        .filter(|(hidden, _)| *hidden != HIDDEN_VTAB_COLUMN)
        .enumerate()
        .map(|(position, (_, mut column))| {
            column.position = position;
            column
        })
        .collect())
}

fn load_foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKey>> {
    let mut stmt = conn.prepare(
        "SELECT id, \"table\", \"from\", \"to\", on_delete FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
    )?;
    let rows = stmt
        .query_map(params![table], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut keys: Vec<(i64, ForeignKey, Vec<Option<String>>)> = Vec::new();
    for (id, to_table, from, to, on_delete) in rows {
        if let Some((_, fk, targets)) = keys.last_mut().filter(|(last_id, _, _)| *last_id == id) {
            fk.columns.push((from, String::new()));
            targets.push(to);
            continue;
        }
        keys.push((
            id,
            ForeignKey {
                to_table,
                columns: vec![(from, String::new())],
                on_delete,
            },
            vec![to],
        ));
    }

    let mut resolved = Vec::with_capacity(keys.len());
    for (_, mut fk, targets) in keys {
        // A bare `REFERENCES parent` targets the parent's primary key
        let parent_pk: Vec<String> = if targets.iter().any(Option::is_none) {
            match resolve_table_name(conn, &fk.to_table)? {
                Some(parent) => {
                    let mut pk: Vec<ColumnInfo> = load_columns(conn, &parent)?
                        .into_iter()
                        .filter(ColumnInfo::is_primary_key)
                        .collect();
                    pk.sort_by_key(|c| c.primary_key_index);
                    pk.into_iter().map(|c| c.name).collect()
                }
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };
        for (i, (pair, target)) in fk.columns.iter_mut().zip(targets).enumerate() {
            pair.1 = target
                .or_else(|| parent_pk.get(i).cloned())
                .unwrap_or_else(|| "rowid".to_string());
        }
        resolved.push(fk);
    }
    Ok(resolved)
}

/// Every foreign key in the database that points at `table`
pub fn inbound_references(conn: &Connection, table: &str) -> Result<Vec<InboundReference>> {
    let mut refs = Vec::new();
    for child in all_tables(conn)? {
        for fk in load_foreign_keys(conn, &child)? {
            if fk.to_table.eq_ignore_ascii_case(table) {
                refs.push(InboundReference {
                    table: child.clone(),
                    foreign_key: fk,
                });
            }
        }
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE author (id INTEGER PRIMARY KEY, name VARCHAR(100) NOT NULL);
            CREATE TABLE Book (
                isbn TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                author_id INTEGER REFERENCES author ON DELETE CASCADE,
                published DATETIME,
                cover BLOB
            );
            CREATE TABLE edition (
                book TEXT,
                number INTEGER,
                PRIMARY KEY (number, book),
                FOREIGN KEY (book) REFERENCES Book (isbn)
            );
            CREATE TABLE django_migrations (id INTEGER PRIMARY KEY, app TEXT);
            CREATE TABLE auth_user (id INTEGER PRIMARY KEY);
            CREATE VIEW book_titles AS SELECT title FROM Book;
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn lists_base_tables_without_excluded_prefixes() {
        let conn = library();
        let excluded = vec!["django".to_string(), "AUTH".to_string()];
        assert_eq!(
            list_tables(&conn, &excluded).unwrap(),
            vec!["Book", "author", "edition"]
        );
    }

    #[test]
    fn describe_is_case_insensitive_and_canonicalizes() {
        let conn = library();
        let book = describe_table(&conn, "book").unwrap().unwrap();
        assert_eq!(book.name, "Book");
        assert_eq!(
            book.column_names(),
            vec!["isbn", "title", "author_id", "published", "cover"]
        );
        assert_eq!(book.column("TITLE").unwrap().kind, ColumnKind::Text);
        assert!(book.column("title").unwrap().not_null);
        assert_eq!(book.column("published").unwrap().kind, ColumnKind::DateTime);
        assert!(book.column("cover").unwrap().kind.is_binary());
        assert!(describe_table(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn bare_reference_resolves_to_parent_primary_key() {
        let conn = library();
        let book = describe_table(&conn, "Book").unwrap().unwrap();
        let fk = book.foreign_key_for("author_id").unwrap();
        assert_eq!(fk.to_table, "author");
        assert_eq!(fk.columns, vec![("author_id".to_string(), "id".to_string())]);
        assert_eq!(fk.on_delete, "CASCADE");
    }

    #[test]
    fn composite_primary_key_is_in_key_order() {
        let conn = library();
        let edition = describe_table(&conn, "edition").unwrap().unwrap();
        let pk: Vec<&str> = edition.primary_key().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(pk, vec!["number", "book"]);
    }

    #[test]
    fn inbound_references_find_children() {
        let conn = library();
        let refs = inbound_references(&conn, "book").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].table, "edition");
        assert_eq!(
            refs[0].foreign_key.columns,
            vec![("book".to_string(), "isbn".to_string())]
        );
        assert!(inbound_references(&conn, "edition").unwrap().is_empty());
    }

    #[test]
    fn generated_columns_are_listed_and_marked() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE item (
                id INTEGER PRIMARY KEY,
                price REAL,
                doubled REAL GENERATED ALWAYS AS (price * 2) VIRTUAL,
                label TEXT
            );",
        )
        .unwrap();
        let item = describe_table(&conn, "item").unwrap().unwrap();
        assert_eq!(item.column_names(), vec!["id", "price", "doubled", "label"]);
        let doubled = item.column("doubled").unwrap();
        assert!(doubled.generated);
        assert!(!doubled.is_editable());
        assert_eq!(item.column("label").unwrap().position, 3);
        assert!(item.column("label").unwrap().is_editable());
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
