use actix_web::http::{Method, header};
use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;
use tracing::trace;

use crate::services::{RedirectRequest, RenderedRedirect, RouteService};

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        service: web::Data<Arc<RouteService>>,
    ) -> HttpResponse {
        let request = Self::redirect_request(&req);
        trace!(
            "Resolving host={:?} path={}",
            request.host.as_deref(),
            request.path
        );

        match service.redirect(&request).await {
            RenderedRedirect::Redirect { status, location } => HttpResponse::build(status)
                .insert_header((header::LOCATION, location))
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .finish(),
            RenderedRedirect::Html { body, .. } => HttpResponse::Ok()
                .insert_header((header::CONTENT_TYPE, "text/html; charset=utf-8"))
                .insert_header((header::CACHE_CONTROL, "no-store"))
                .body(body),
        }
    }

    /// 只提取原始字符串，解析留给 RouteService
    fn redirect_request(req: &HttpRequest) -> RedirectRequest {
        let raw_path = req.path();
        let path = urlencoding::decode(raw_path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());

        let host = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(String::from)
            .or_else(|| req.uri().authority().map(|a| a.to_string()));

        let header_str = |name: header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(String::from)
        };

        RedirectRequest {
            host,
            path,
            head_only: req.method() == Method::HEAD,
            user_agent: header_str(header::USER_AGENT),
            referer: header_str(header::REFERER),
            remote_addr: req
                .connection_info()
                .realip_remote_addr()
                .map(String::from),
        }
    }
}

/// Catch-all redirect routes; register after every other service.
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("")
        .route("/{path:.*}", web::get().to(RedirectService::handle_redirect))
        .route("/{path:.*}", web::head().to(RedirectService::handle_redirect))
}
