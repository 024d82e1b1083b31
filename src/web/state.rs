use rusqlite::Connection;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::metrics::BrowserMetrics;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: SessionStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let sessions = SessionStore::with_limits(
            Duration::from_secs(config.session.ttl_secs),
            config.session.max_entries,
        );
        Self {
            db,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Run database work off the async runtime and time it
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let started = Instant::now();
        let result = self.db.with_conn(f).await;
        BrowserMetrics::record_query_duration(started.elapsed().as_secs_f64());
        result
    }

    pub fn excluded_prefixes(&self) -> Vec<String> {
        self.config.browser.excluded_prefixes.clone()
    }

    pub fn max_rows(&self) -> usize {
        self.config.browser.max_rows
    }
}
