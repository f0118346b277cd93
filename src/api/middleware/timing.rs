//! HTTP timing middleware
//!
//! Records HTTP request duration and request count through the injected
//! `MetricsRecorder` (a no-op unless the `metrics` feature wires Prometheus).

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics_core::MetricsRecorder;

/// HTTP timing middleware factory
#[derive(Clone)]
pub struct TimingMiddleware {
    metrics: Arc<dyn MetricsRecorder>,
}

impl TimingMiddleware {
    pub fn new(metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TimingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TimingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TimingService {
            service: Rc::new(service),
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct TimingService<S> {
    service: Rc<S>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<S, B> Service<ServiceRequest> for TimingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let metrics = self.metrics.clone();
        let start = Instant::now();

        // Labels are static strings to keep cardinality bounded
        let method = method_str(req.method());
        let endpoint = classify_endpoint(req.path());

        Box::pin(async move {
            let result = srv.call(req).await;

            let duration = start.elapsed().as_secs_f64();
            let status = match &result {
                Ok(response) => status_str(response.status()),
                Err(_) => "500",
            };
            metrics.observe_http_request(method, endpoint, status, duration);
            metrics.inc_http_request(method, endpoint, status);

            result
        })
    }
}

/// Map HTTP method to a static string (avoids allocation).
fn method_str(method: &actix_web::http::Method) -> &'static str {
    match method.as_str() {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        _ => "OTHER",
    }
}

/// Map HTTP status code to a static string (avoids allocation for common codes).
fn status_str(status: actix_web::http::StatusCode) -> &'static str {
    match status.as_u16() {
        200 => "200",
        202 => "202",
        301 => "301",
        302 => "302",
        307 => "307",
        308 => "308",
        400 => "400",
        404 => "404",
        413 => "413",
        429 => "429",
        500 => "500",
        503 => "503",
        _ => "other",
    }
}

/// Classify request path into endpoint category
fn classify_endpoint(path: &str) -> &'static str {
    if path.starts_with("/api/") || path == "/api" {
        "api"
    } else if path.starts_with("/health") {
        "health"
    } else if path == "/metrics" {
        "metrics"
    } else {
        "redirect"
    }
}
