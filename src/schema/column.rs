use serde::Serialize;

/// How a column's values are parsed from form input and whether the column can
/// be used for ordering.
///
/// Derived from the declared type following SQLite's affinity rules, with the
/// boolean and date/time spellings common in framework-generated schemas
/// recognised first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Real,
    Numeric,
    Text,
    Boolean,
    Date,
    DateTime,
    Time,
    Blob,
    Untyped,
}

impl ColumnKind {
    pub fn from_declared_type(declared: &str) -> Self {
        let t = declared.trim().to_ascii_uppercase();
        if t.is_empty() {
            return ColumnKind::Untyped;
        }
        if t.contains("BOOL") {
            ColumnKind::Boolean
        } else if t.contains("DATETIME") || t.contains("TIMESTAMP") {
            ColumnKind::DateTime
        } else if t.starts_with("DATE") {
            ColumnKind::Date
        } else if t.starts_with("TIME") {
            ColumnKind::Time
        } else if t.contains("INT") {
            ColumnKind::Integer
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            ColumnKind::Text
        } else if t.contains("BLOB") || t.contains("BINARY") || t.contains("BYTEA") {
            ColumnKind::Blob
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            ColumnKind::Real
        } else {
            ColumnKind::Numeric
        }
    }

    pub fn is_binary(self) -> bool {
        self == ColumnKind::Blob
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub position: usize,
    pub name: String,
    pub declared_type: String,
    pub kind: ColumnKind,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based index within the primary key, 0 when not part of it
    pub primary_key_index: usize,
    /// Computed by a `GENERATED ALWAYS AS` expression
    pub generated: bool,
}

impl ColumnInfo {
    pub fn is_primary_key(&self) -> bool {
        self.primary_key_index > 0
    }

    /// Whether the edit form may write this column back
    pub fn is_editable(&self) -> bool {
        !self.generated && !self.kind.is_binary()
    }
}
