use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbmsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid table name")]
    UnknownTable(String),

    #[error("Invalid column name")]
    InvalidColumn(String),

    #[error("Cannot order by a binary column!")]
    BinaryOrdering(String),

    #[error("Table {0} has no primary key")]
    NoPrimaryKey(String),

    #[error("Expected {expected} values in row_data, got {actual}")]
    MalformedRow { expected: usize, actual: usize },

    #[error("Related object not found for {0}")]
    RelatedNotFound(String),

    #[error("Invalid datetime format for {0}")]
    InvalidDatetime(String),

    #[error("Invalid value for {column}: {value:?}")]
    InvalidValue { column: String, value: String },

    #[error("Row does not exist.")]
    RowNotFound,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl DbmsError {
    pub fn status(&self) -> StatusCode {
        match self {
            DbmsError::UnknownTable(_)
            | DbmsError::InvalidColumn(_)
            | DbmsError::BinaryOrdering(_)
            | DbmsError::NoPrimaryKey(_)
            | DbmsError::MalformedRow { .. }
            | DbmsError::RelatedNotFound(_)
            | DbmsError::InvalidDatetime(_)
            | DbmsError::InvalidValue { .. }
            | DbmsError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DbmsError::RowNotFound | DbmsError::NotFound(_) => StatusCode::NOT_FOUND,
            DbmsError::Database(_)
            | DbmsError::Toml(_)
            | DbmsError::Io(_)
            | DbmsError::Template(_)
            | DbmsError::Join(_)
            | DbmsError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for the error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            DbmsError::Database(_) => "database",
            DbmsError::Toml(_) | DbmsError::Config(_) => "config",
            DbmsError::Io(_) => "io",
            DbmsError::Template(_) => "template",
            DbmsError::Join(_) => "join",
            DbmsError::UnknownTable(_) => "unknown_table",
            DbmsError::InvalidColumn(_) => "invalid_column",
            DbmsError::BinaryOrdering(_) => "binary_ordering",
            DbmsError::NoPrimaryKey(_) => "no_primary_key",
            DbmsError::MalformedRow { .. } => "malformed_row",
            DbmsError::RelatedNotFound(_) => "related_not_found",
            DbmsError::InvalidDatetime(_) => "invalid_datetime",
            DbmsError::InvalidValue { .. } => "invalid_value",
            DbmsError::RowNotFound => "row_not_found",
            DbmsError::NotFound(_) => "not_found",
            DbmsError::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for DbmsError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        crate::metrics::BrowserMetrics::record_error(self.kind());
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DbmsError>;
