//! Prometheus metrics for the browser
//!
//! A recorder is installed once per process and its handle kept so the web
//! layer can render the exposition text on `/metrics` without a separate
//! listener.

pub mod browser;
pub mod registry;

pub use browser::BrowserMetrics;

use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder and register every metric. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("METRICS: handle already stored");
                }
                registry::register_all_metrics();
                info!("Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Current exposition text, empty when no recorder is installed
pub fn render() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

/// Implemented by each group of metrics so they can be pre-registered and
/// documented in one place
pub trait MetricGroup {
    fn register_metrics();

    fn group_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Metric names follow `dbms_{group}_{name}[_total]`
macro_rules! group_metric {
    (counter, $group:literal, $name:literal) => {
        concat!("dbms_", $group, "_", $name, "_total")
    };
    (histogram, $group:literal, $name:literal) => {
        concat!("dbms_", $group, "_", $name)
    };
}

pub(crate) use group_metric;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_convention() {
        assert_eq!(
            group_metric!(counter, "browser", "rows_deleted"),
            "dbms_browser_rows_deleted_total"
        );
        assert_eq!(
            group_metric!(histogram, "browser", "query_duration_seconds"),
            "dbms_browser_query_duration_seconds"
        );
    }

    #[test]
    fn render_exposes_recorded_series() {
        init_metrics();
        assert!(HANDLE.get().is_some());
        BrowserMetrics::record_table_view("customer", 3);
        BrowserMetrics::record_row_deleted("purchase");
        let text = render();
        assert!(text.contains("dbms_browser_table_views_total{table=\"customer\"} 1"));
        assert!(text.contains("dbms_browser_rows_deleted_total{table=\"purchase\"} 1"));
        assert!(text.contains("dbms_browser_rows_rendered"));
    }
}
