use crate::metrics_core::MetricsRecorder;

use super::METRICS;

/// Delegates to the global METRICS singleton so it can be injected as
/// `Arc<dyn MetricsRecorder>`.
pub struct PrometheusMetrics;

impl MetricsRecorder for PrometheusMetrics {
    fn inc_redirect(&self, route: &str, source: &str) {
        METRICS
            .redirects_total
            .with_label_values(&[route, source])
            .inc();
    }

    fn inc_enrichment(&self, outcome: &str) {
        METRICS.enrichment_total.with_label_values(&[outcome]).inc();
    }

    fn inc_mutation(&self, operation: &str, outcome: &str) {
        METRICS
            .mutations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    fn set_routes(&self, count: f64) {
        METRICS.routes.set(count);
    }

    fn observe_storage_operation(&self, operation: &str, duration_secs: f64) {
        METRICS
            .storage_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    fn observe_http_request(&self, method: &str, endpoint: &str, status: &str, duration_secs: f64) {
        METRICS
            .http_request_duration_seconds
            .with_label_values(&[method, endpoint, status])
            .observe(duration_secs);
    }

    fn inc_http_request(&self, method: &str, endpoint: &str, status: &str) {
        METRICS
            .http_requests_total
            .with_label_values(&[method, endpoint, status])
            .inc();
    }
}
