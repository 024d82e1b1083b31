use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::web::handlers::{
    analytics, columns_query, delete_row, delete_wrong_method, health, index, metrics_text,
    order_table, table_columns, table_detail, table_list, update_table, update_wrong_method,
};
use crate::web::state::AppState;

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/tables", get(table_list))
        .route("/tables/:table", get(table_detail))
        .route("/tables/:table/columns", get(table_columns))
        .route("/tables/:table/order/:column", get(order_table))
        .route("/columns", get(columns_query))
        .route("/update", post(update_table).fallback(update_wrong_method))
        .route("/delete", post(delete_row).fallback(delete_wrong_method))
        .route("/analytics", get(analytics).post(analytics))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}
