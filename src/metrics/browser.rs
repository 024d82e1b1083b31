use crate::metrics::{group_metric, MetricDoc, MetricGroup, MetricType};

/// Counters for what users do with tables
pub struct BrowserMetrics;

impl BrowserMetrics {
    pub fn record_table_view(table: &str, rows: usize) {
        ::metrics::counter!(group_metric!(counter, "browser", "table_views"), "table" => table.to_string())
            .increment(1);
        ::metrics::histogram!(group_metric!(histogram, "browser", "rows_rendered"))
            .record(rows as f64);
    }

    pub fn record_row_updated(table: &str) {
        ::metrics::counter!(group_metric!(counter, "browser", "rows_updated"), "table" => table.to_string())
            .increment(1);
    }

    pub fn record_row_deleted(table: &str) {
        ::metrics::counter!(group_metric!(counter, "browser", "rows_deleted"), "table" => table.to_string())
            .increment(1);
    }

    pub fn record_cascade_warning(table: &str) {
        ::metrics::counter!(
            group_metric!(counter, "browser", "cascade_warnings"),
            "table" => table.to_string()
        )
        .increment(1);
    }

    pub fn record_query_duration(duration_secs: f64) {
        ::metrics::histogram!(group_metric!(histogram, "browser", "query_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_error(kind: &'static str) {
        ::metrics::counter!(group_metric!(counter, "browser", "errors"), "kind" => kind)
            .increment(1);
    }
}

impl MetricGroup for BrowserMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        // Pre-register so the series show up before first use
        let _ = counter!(group_metric!(counter, "browser", "table_views"));
        let _ = counter!(group_metric!(counter, "browser", "rows_updated"));
        let _ = counter!(group_metric!(counter, "browser", "rows_deleted"));
        let _ = counter!(group_metric!(counter, "browser", "cascade_warnings"));
        let _ = counter!(group_metric!(counter, "browser", "errors"));
        let _ = histogram!(group_metric!(histogram, "browser", "rows_rendered"));
        let _ = histogram!(group_metric!(histogram, "browser", "query_duration_seconds"));
    }

    fn group_name() -> &'static str {
        "browser"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: group_metric!(counter, "browser", "table_views"),
                metric_type: MetricType::Counter,
                help: "Table pages rendered, sorted or not, by table",
            },
            MetricDoc {
                name: group_metric!(counter, "browser", "rows_updated"),
                metric_type: MetricType::Counter,
                help: "Rows saved from the edit form, by table",
            },
            MetricDoc {
                name: group_metric!(counter, "browser", "rows_deleted"),
                metric_type: MetricType::Counter,
                help: "Rows deleted, including confirmed cascades, by table",
            },
            MetricDoc {
                name: group_metric!(counter, "browser", "cascade_warnings"),
                metric_type: MetricType::Counter,
                help: "Deletes held back pending cascade confirmation, by table",
            },
            MetricDoc {
                name: group_metric!(counter, "browser", "errors"),
                metric_type: MetricType::Counter,
                help: "Requests answered with an error, by kind",
            },
            MetricDoc {
                name: group_metric!(histogram, "browser", "rows_rendered"),
                metric_type: MetricType::Histogram,
                help: "Rows loaded per table page",
            },
            MetricDoc {
                name: group_metric!(histogram, "browser", "query_duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent in database work per request",
            },
        ]
    }
}
