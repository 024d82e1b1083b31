// Defaults shared by config, CLI and web layers

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_DATABASE_PATH: &str = "db.sqlite3";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Framework bookkeeping and engine-internal tables are not browsable.
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &["django", "auth", "sys", "sqlite_"];

pub const SESSION_COOKIE: &str = "dbms_session";
pub const SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const SESSION_MAX_ENTRIES: usize = 10_000;

pub const TABLE_UPDATED: &str = "Table updated successfully";
pub const ROW_DELETED: &str = "Row deleted successfully";
pub const DETAIL_BINARY_ORDER_MESSAGE: &str = "Table cannot be ordered by a binary column!";
