//! Global metrics registry
//!
//! Defines all Prometheus metrics used by the bridge.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

/// Global metrics instance
pub static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Application metrics container
pub struct Metrics {
    /// Internal Prometheus registry
    registry: Registry,

    // ===== Redirect metrics =====
    /// Redirects by matched route key and resolution source
    pub redirects_total: CounterVec,
    /// Enrichment attempts by outcome
    pub enrichment_total: CounterVec,

    // ===== Route table metrics =====
    /// Mutations by operation and outcome
    pub mutations_total: CounterVec,
    /// Current number of routes
    pub routes: Gauge,
    /// Storage call latency
    pub storage_duration_seconds: HistogramVec,

    // ===== HTTP metrics =====
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let redirects_total = CounterVec::new(
            Opts::new(
                "bridge_redirects_total",
                "Total redirects by matched route and resolution source",
            ),
            &["route", "source"],
        )
        .expect("Failed to create redirects_total metric");

        let enrichment_total = CounterVec::new(
            Opts::new("bridge_enrichment_total", "Enrichment attempts by outcome"),
            &["outcome"],
        )
        .expect("Failed to create enrichment_total metric");

        let mutations_total = CounterVec::new(
            Opts::new(
                "bridge_mutations_total",
                "Route mutations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("Failed to create mutations_total metric");

        let routes = Gauge::new("bridge_routes", "Current number of routes")
            .expect("Failed to create routes metric");

        let storage_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bridge_storage_duration_seconds",
                "Storage operation duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )
        .expect("Failed to create storage_duration_seconds metric");

        let http_requests_total = CounterVec::new(
            Opts::new("bridge_http_requests_total", "Total HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bridge_http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        // Register all metrics
        registry
            .register(Box::new(redirects_total.clone()))
            .expect("Failed to register redirects_total");
        registry
            .register(Box::new(enrichment_total.clone()))
            .expect("Failed to register enrichment_total");
        registry
            .register(Box::new(mutations_total.clone()))
            .expect("Failed to register mutations_total");
        registry
            .register(Box::new(routes.clone()))
            .expect("Failed to register routes");
        registry
            .register(Box::new(storage_duration_seconds.clone()))
            .expect("Failed to register storage_duration_seconds");
        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds");

        Self {
            registry,
            redirects_total,
            enrichment_total,
            mutations_total,
            routes,
            storage_duration_seconds,
            http_requests_total,
            http_request_duration_seconds,
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("Failed to encode metrics: {}", e))?;
        String::from_utf8(buffer).map_err(|e| format!("Metrics output is not valid UTF-8: {}", e))
    }
}
