//! Registration of every metric group, with duplicate-name detection

use crate::metrics::{MetricDoc, MetricGroup};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();
    register_group::<super::browser::BrowserMetrics>(&mut all_metrics);

    info!("Registered {} metrics", all_metrics.len());
    for doc in all_metrics.values() {
        debug!(name = doc.name, kind = ?doc.metric_type, "{}", doc.help);
    }
}

fn register_group<T: MetricGroup>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    for doc in T::metrics_documentation() {
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict: '{}' registered twice (group '{}')",
                doc.name,
                T::group_name()
            );
        } else {
            all_metrics.insert(doc.name, doc);
        }
    }
}
