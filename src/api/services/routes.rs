//! Route management API

use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::warn;

use crate::api::response::{accepted_response, error_response, success_response};
use crate::errors::{BridgeError, Result};
use crate::services::{MutationGuard, RouteService};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub host: Option<String>,
}

/// Read the request body, refusing anything over the guard's payload cap
/// before it is buffered.
pub async fn read_body_capped(
    req: &HttpRequest,
    mut payload: web::Payload,
    guard: &MutationGuard,
) -> Result<web::BytesMut> {
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if let Some(len) = declared {
        guard.check_payload(len)?;
    }

    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            BridgeError::validation(format!("failed to read request body: {}", e))
        })?;
        guard.check_payload(body.len() + chunk.len())?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

pub struct RoutesService;

impl RoutesService {
    pub async fn list_routes(
        query: web::Query<ListQuery>,
        service: web::Data<Arc<RouteService>>,
    ) -> HttpResponse {
        let routes: BTreeMap<String, String> = service
            .list_routes(query.host.as_deref())
            .into_iter()
            .map(|entry| (entry.key, entry.destination))
            .collect();
        success_response(routes)
    }

    pub async fn get_route(
        key: web::Path<String>,
        service: web::Data<Arc<RouteService>>,
    ) -> HttpResponse {
        match service.get_route(&key) {
            Ok(entry) => success_response(entry),
            Err(e) => error_response(&e),
        }
    }

    pub async fn put_route(
        req: HttpRequest,
        payload: web::Payload,
        service: web::Data<Arc<RouteService>>,
    ) -> HttpResponse {
        let result = match read_body_capped(&req, payload, service.guard()).await {
            Ok(body) => service.put_route(&body).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(entry) => accepted_response(entry),
            Err(e) => {
                warn!("PUT /api/routes rejected: {}", e);
                error_response(&e)
            }
        }
    }

    pub async fn delete_route(
        req: HttpRequest,
        payload: web::Payload,
        service: web::Data<Arc<RouteService>>,
    ) -> HttpResponse {
        let result = match read_body_capped(&req, payload, service.guard()).await {
            Ok(body) => service.delete_route(&body).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(key) => success_response(serde_json::json!({ "key": key })),
            Err(e) => {
                warn!("DELETE /api/routes rejected: {}", e);
                error_response(&e)
            }
        }
    }

    pub async fn reload(service: web::Data<Arc<RouteService>>) -> HttpResponse {
        match service.reload().await {
            Ok(count) => accepted_response(serde_json::json!({ "routes": count })),
            Err(e) => error_response(&e),
        }
    }
}

/// `/api/routes` 路由配置
pub fn routes_routes() -> actix_web::Scope {
    web::scope("/api/routes")
        .route("", web::get().to(RoutesService::list_routes))
        .route("", web::put().to(RoutesService::put_route))
        .route("", web::delete().to(RoutesService::delete_route))
        .route("/reload", web::post().to(RoutesService::reload))
        .route("/{key:.*}", web::get().to(RoutesService::get_route))
}
