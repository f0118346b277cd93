//! Core metrics traits (always compiled, no feature gate).
//!
//! Provides `MetricsRecorder` trait and `NoopMetrics` so that the route
//! service and middleware can accept `Arc<dyn MetricsRecorder>`
//! unconditionally. When the `metrics` feature is disabled, `NoopMetrics` is
//! injected and every call compiles to a no-op.

use std::sync::Arc;

/// Trait for recording application metrics.
///
/// All methods are no-op by default, allowing partial implementation.
/// Implementations must be thread-safe (Send + Sync).
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync {
    // ===== Redirect =====

    /// Record a served redirect.
    ///
    /// `route` is the matched key (`host/path` or `path`), or `default` when
    /// nothing matched; `source` is `host`, `global` or `default`.
    fn inc_redirect(&self, route: &str, source: &str) {}

    /// Record an enrichment attempt outcome (`enriched`, `degraded`, `disabled`)
    fn inc_enrichment(&self, outcome: &str) {}

    // ===== Route table =====

    /// Record a mutation (`put`, `delete`, `reload`) and its outcome
    fn inc_mutation(&self, operation: &str, outcome: &str) {}

    /// Set current number of routes in the table
    fn set_routes(&self, count: f64) {}

    /// Observe storage call duration
    fn observe_storage_operation(&self, operation: &str, duration_secs: f64) {}

    // ===== HTTP (timing middleware) =====

    /// Observe HTTP request duration
    fn observe_http_request(&self, method: &str, endpoint: &str, status: &str, duration_secs: f64) {
    }

    /// Record HTTP request
    fn inc_http_request(&self, method: &str, endpoint: &str, status: &str) {}
}

/// Noop metrics implementation for testing and non-metrics builds.
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {}

impl NoopMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn arc() -> Arc<dyn MetricsRecorder> {
        Arc::new(Self::new())
    }
}

impl Default for NoopMetrics {
    fn default() -> Self {
        Self::new()
    }
}
