use askama::Template;
use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{info, warn};

use crate::browser::{self, DeleteOutcome, TableData};
use crate::constants;
use crate::error::{DbmsError, Result};
use crate::metrics::{self, BrowserMetrics};
use crate::ordering::{Direction, SortOrder};
use crate::schema;
use crate::session::{set_cookie_header, SessionData};
use crate::web::forms::{AnalyticsForm, ColumnsQuery, RowForm};
use crate::web::state::AppState;
use crate::web::templates::{
    AnalyticsTemplate, ErrorTemplate, IndexTemplate, TableDetailTemplate, TableListTemplate,
};

/// Error rendered as an HTML page instead of a JSON payload
pub struct HtmlError(DbmsError);

impl From<DbmsError> for HtmlError {
    fn from(err: DbmsError) -> Self {
        HtmlError(err)
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            DbmsError::UnknownTable(_) => StatusCode::NOT_FOUND,
            ref other => other.status(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "page failed");
        } else {
            warn!(error = %self.0, "page rejected");
        }
        BrowserMetrics::record_error(self.0.kind());
        let message = match &self.0 {
            DbmsError::UnknownTable(name) => format!("Table '{name}' not found"),
            other => other.to_string(),
        };
        let page = ErrorTemplate {
            status: status.as_u16(),
            message,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, page.message).into_response(),
        }
    }
}

type PageResult = std::result::Result<Html<String>, HtmlError>;

fn render<T: Template>(template: &T) -> PageResult {
    Ok(Html(template.render().map_err(DbmsError::from)?))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "dbms_browser",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn metrics_text() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

/// Landing page
pub async fn index() -> PageResult {
    render(&IndexTemplate {
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn table_list(State(state): State<AppState>) -> PageResult {
    let excluded = state.excluded_prefixes();
    let table_names = state
        .run(move |conn| schema::list_tables(conn, &excluded))
        .await?;
    render(&TableListTemplate::new(table_names))
}

pub async fn table_detail(State(state): State<AppState>, Path(table): Path<String>) -> PageResult {
    let max_rows = state.max_rows();
    let (info, data) = state
        .run(move |conn| {
            let info = browser::require_table(conn, &table)?;
            let data = browser::load_table(conn, &info.name, None, max_rows)?;
            Ok((info, data))
        })
        .await?;
    BrowserMetrics::record_table_view(&data.table_name, data.rows.len());
    render(&TableDetailTemplate::new(&info, data, None))
}

/// Sort a table by a header click, flipping direction on repeated clicks.
///
/// The preference is kept in the session; binary columns cannot be ordered
/// and render the page without rows.
pub async fn order_table(
    State(state): State<AppState>,
    Path((table, column)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response> {
    let info = state
        .run(move |conn| browser::require_table(conn, &table))
        .await?;
    let column_info = info
        .column(&column)
        .ok_or_else(|| DbmsError::InvalidColumn(column.clone()))?
        .clone();

    let mut session = state.sessions.load(&headers);
    let order = SortOrder::next(session.data.order.as_ref(), &info.name, &column_info.name);
    session.data = SessionData {
        order: Some(order.clone()),
    };
    state.sessions.save(session.id, session.data.clone());

    let page = if column_info.kind.is_binary() {
        warn!(table = %info.name, column = %column_info.name, "refusing to order by binary column");
        TableDetailTemplate::new(&info, TableData::empty(&info), None)
            .with_message(constants::DETAIL_BINARY_ORDER_MESSAGE)
    } else {
        let max_rows = state.max_rows();
        let table_name = info.name.clone();
        let column_name = column_info.name.clone();
        let direction = order.direction;
        let data = state
            .run(move |conn| {
                browser::load_table(conn, &table_name, Some((&column_name, direction)), max_rows)
            })
            .await?;
        BrowserMetrics::record_table_view(&data.table_name, data.rows.len());
        TableDetailTemplate::new(&info, data, Some(&order))
    };

    let html = page.render()?;
    let mut response = Html(html).into_response();
    if session.is_new {
        let (name, value) = set_cookie_header(session.id);
        response.headers_mut().insert(name, value);
    }
    Ok(response)
}

pub async fn table_columns(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<Vec<String>>> {
    columns_for(state, Some(table)).await
}

pub async fn columns_query(
    State(state): State<AppState>,
    Query(query): Query<ColumnsQuery>,
) -> Result<Json<Vec<String>>> {
    columns_for(state, query.table).await
}

async fn columns_for(state: AppState, table: Option<String>) -> Result<Json<Vec<String>>> {
    let table = table
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DbmsError::BadRequest("Table name is required".to_string()))?;
    let columns = state
        .run(move |conn| {
            schema::column_names(conn, &table)?
                .ok_or_else(|| DbmsError::NotFound("Table not found".to_string()))
        })
        .await?;
    Ok(Json(columns))
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("X-Requested-With")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Save an edited row; only accepted from the page's AJAX call
pub async fn update_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Json<serde_json::Value>> {
    if !is_ajax(&headers) {
        return Err(DbmsError::BadRequest("Invalid request".to_string()));
    }
    let form = RowForm::from_pairs(pairs);
    let table = form
        .table()
        .ok_or_else(|| DbmsError::BadRequest("Invalid request".to_string()))?
        .to_string();

    let audit_table = table.clone();
    let row_data = form.row_data;
    state
        .run(move |conn| browser::update_row(conn, &table, &row_data))
        .await?;

    BrowserMetrics::record_row_updated(&audit_table);
    Ok(Json(json!({ "success": constants::TABLE_UPDATED })))
}

/// Delete a row, answering with a cascade warning first when other rows
/// reference it and the request is not confirmed
pub async fn delete_row(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Json<serde_json::Value>> {
    let form = RowForm::from_pairs(pairs);
    let table = form
        .table()
        .ok_or_else(|| DbmsError::UnknownTable(String::new()))?
        .to_string();

    let audit_table = table.clone();
    let RowForm {
        row_data, confirm, ..
    } = form;
    let outcome = state
        .run(move |conn| browser::delete_row(conn, &table, &row_data, confirm))
        .await?;

    match outcome {
        DeleteOutcome::Cascade {
            message,
            impacts,
            blocked,
        } => {
            BrowserMetrics::record_cascade_warning(&audit_table);
            Ok(Json(json!({
                "cascade": true,
                "blocked": blocked,
                "message": message,
                "tables": impacts,
            })))
        }
        DeleteOutcome::Deleted => {
            info!(table = %audit_table, "row deleted via web");
            BrowserMetrics::record_row_deleted(&audit_table);
            Ok(Json(json!({ "success": constants::ROW_DELETED })))
        }
    }
}

pub async fn update_wrong_method() -> DbmsError {
    DbmsError::BadRequest("Invalid request".to_string())
}

pub async fn delete_wrong_method() -> DbmsError {
    DbmsError::BadRequest("Invalid request method".to_string())
}

/// Table picker with optional ordering, rendered for both the plain GET and
/// the form POST
pub async fn analytics(State(state): State<AppState>, Form(form): Form<AnalyticsForm>) -> PageResult {
    let excluded = state.excluded_prefixes();
    let tables = state
        .run(move |conn| schema::list_tables(conn, &excluded))
        .await?;
    let page = AnalyticsTemplate::picker(tables);

    let Some(table) = form.table().map(str::to_string) else {
        return render(&page);
    };
    let order = form
        .column()
        .map(|c| (c.to_string(), Direction::parse(form.column_order.as_deref().unwrap_or(""))));

    let max_rows = state.max_rows();
    let order_for_query = order.clone();
    let loaded = state
        .run(move |conn| {
            let info = browser::require_table(conn, &table)?;
            let data = browser::load_table(
                conn,
                &info.name,
                order_for_query.as_ref().map(|(c, d)| (c.as_str(), *d)),
                max_rows,
            )?;
            Ok((info, data))
        })
        .await;

    let page = match loaded {
        Ok((info, data)) => {
            BrowserMetrics::record_table_view(&data.table_name, data.rows.len());
            page.with_data(&info, data, order.as_ref().map(|(c, d)| (c.as_str(), *d)))
        }
        Err(
            err @ (DbmsError::BinaryOrdering(_)
            | DbmsError::InvalidColumn(_)
            | DbmsError::UnknownTable(_)),
        ) => {
            warn!(error = %err, "analytics request rejected");
            BrowserMetrics::record_error(err.kind());
            page.with_message(err.to_string())
        }
        Err(err) => return Err(err.into()),
    };
    render(&page)
}
