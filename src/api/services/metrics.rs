//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus text format at `/metrics`.

use actix_web::{HttpResponse, Responder};
use tracing::error;

use crate::metrics::METRICS;

/// Metrics service handler
pub struct MetricsService;

impl MetricsService {
    pub async fn metrics() -> impl Responder {
        match METRICS.export() {
            Ok(output) => HttpResponse::Ok()
                .content_type("text/plain; version=0.0.4; charset=utf-8")
                .body(output),
            Err(e) => {
                error!("{}", e);
                HttpResponse::InternalServerError().body("failed to export metrics")
            }
        }
    }
}
