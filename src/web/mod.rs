//! HTTP front end: router, handlers and templates

pub mod forms;
pub mod handlers;
pub mod router;
pub mod state;
pub mod templates;

pub use router::app_router;
pub use state::AppState;

use tracing::info;

/// Bind `addr` and serve until the process is stopped
pub async fn start_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Database browser listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
