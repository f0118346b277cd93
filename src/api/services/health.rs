use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

use crate::api::response::success_response;
use crate::services::RouteService;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub durability: String,
    pub routes: usize,
    pub enrichment: bool,
    pub uptime: u64,
    pub timestamp: String,
}

/// Health Service
///
/// Reports the in-memory view only; it never calls the storage backend.
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        service: web::Data<Arc<RouteService>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let now = chrono::Utc::now();
        let table = service.table();
        success_response(HealthResponse {
            status: "healthy",
            backend: table.backend_name(),
            durability: format!("{:?}", table.durability()),
            routes: table.len(),
            enrichment: service.enrichment_enabled(),
            uptime: (now - app_start_time.start_datetime).num_seconds().max(0) as u64,
            timestamp: now.to_rfc3339(),
        })
    }

    // 活跃性检查
    pub async fn liveness_check() -> impl Responder {
        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
