//! HTTP API tests
//!
//! Drives the full service configuration through actix's test harness.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{Method, StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use bridge::api::middleware::TimingMiddleware;
use bridge::api::services::{AppStartTime, configure};
use bridge::config::RedirectStatus;
use bridge::metrics_core::NoopMetrics;
use bridge::services::{MutationGuard, RedirectRenderer, RouteService, RouteTable};
use bridge::storage::{MemoryObjectClient, MemoryStorage, ObjectStorage, RouteStore};

const DEFAULT: &str = "https://default.example/";

// =============================================================================
// Test Setup
// =============================================================================

fn route_service(store: Arc<dyn RouteStore>, guard: MutationGuard) -> Arc<RouteService> {
    let table = RouteTable::new(store, DEFAULT, Duration::from_secs(2));
    Arc::new(RouteService::new(
        Arc::new(table),
        guard,
        RedirectRenderer::new(RedirectStatus::Found),
        NoopMetrics::arc(),
    ))
}

fn unpaced() -> MutationGuard {
    MutationGuard::new(Duration::ZERO, Duration::ZERO, 1024)
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .wrap(TimingMiddleware::new(NoopMetrics::arc()))
                .app_data(web::Data::new($service.clone()))
                .app_data(web::Data::new(AppStartTime::now()))
                .configure(configure),
        )
        .await
    };
}

fn put(body: Value) -> TestRequest {
    TestRequest::put().uri("/api/routes").set_json(body)
}

// =============================================================================
// Redirects
// =============================================================================

#[actix_rt::test]
async fn test_unknown_path_redirects_to_default() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    let resp = test::call_service(&app, TestRequest::get().uri("/whatever").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), DEFAULT);
}

#[actix_rt::test]
async fn test_host_route_wins_over_global() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    for body in [
        json!({"key": "a", "destination": "https://global.example/"}),
        json!({"key": "a", "destination": "https://host.example/", "host": "h.example"}),
    ] {
        let resp = test::call_service(&app, put(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/a")
            .insert_header((header::HOST, "h.example"))
            .to_request(),
    )
    .await;
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://host.example/"
    );

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/a")
            .insert_header((header::HOST, "elsewhere.example"))
            .to_request(),
    )
    .await;
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://global.example/"
    );
}

#[actix_rt::test]
async fn test_percent_encoded_path_is_decoded() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    service
        .put_route(r#"{"key": "café", "destination": "https://cafe.example/"}"#.as_bytes())
        .await
        .unwrap();
    let app = app!(service);

    let resp = test::call_service(&app, TestRequest::get().uri("/caf%C3%A9").to_request()).await;
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://cafe.example/"
    );
}

#[actix_rt::test]
async fn test_head_request_redirects() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    let resp = test::call_service(
        &app,
        TestRequest::default()
            .method(Method::HEAD)
            .uri("/x")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

// =============================================================================
// Route management
// =============================================================================

#[actix_rt::test]
async fn test_put_list_get_delete() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    let resp = test::call_service(
        &app,
        put(json!({"path": "/docs", "url": "https://docs.example/"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["key"], "docs");

    let list: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get().uri("/api/routes").to_request(),
    )
    .await;
    assert_eq!(list["data"]["docs"], "https://docs.example/");

    let one: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get().uri("/api/routes/docs").to_request(),
    )
    .await;
    assert_eq!(one["data"]["destination"], "https://docs.example/");

    let resp = test::call_service(
        &app,
        TestRequest::delete()
            .uri("/api/routes")
            .set_json(json!({"key": "docs"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        TestRequest::delete()
            .uri("/api/routes")
            .set_json(json!({"key": "docs"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3000);
}

#[actix_rt::test]
async fn test_list_by_host() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    for body in [
        json!({"key": "a", "destination": "https://a.example/"}),
        json!({"key": "b", "destination": "https://b.example/", "host": "h.example"}),
    ] {
        test::call_service(&app, put(body).to_request()).await;
    }

    let list: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri("/api/routes?host=h.example")
            .to_request(),
    )
    .await;
    let data = list["data"].as_object().unwrap();
    assert_eq!(data.len(), 1);
    assert!(data.contains_key("h.example/b"));
}

#[actix_rt::test]
async fn test_invalid_destination_rejected() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    let resp = test::call_service(
        &app,
        put(json!({"key": "x", "destination": "javascript:alert(1)"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3002);
    assert!(service.list_routes(None).is_empty());
}

#[actix_rt::test]
async fn test_malformed_body_rejected() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    let resp = test::call_service(
        &app,
        TestRequest::put()
            .uri("/api/routes")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"key\": ")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_oversized_body_rejected() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    let app = app!(service);

    let padding = "x".repeat(4096);
    let resp = test::call_service(
        &app,
        put(json!({"key": "big", "destination": format!("https://big.example/{}", padding)}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(service.get_route("big").is_err());
}

#[actix_rt::test]
async fn test_updates_are_paced() {
    let guard = MutationGuard::new(Duration::ZERO, Duration::from_secs(60), 1024);
    let service = route_service(Arc::new(MemoryStorage::new()), guard);
    let app = app!(service);

    let first = test::call_service(
        &app,
        put(json!({"key": "a", "destination": "https://a.example/"})).to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = test::call_service(
        &app,
        put(json!({"key": "b", "destination": "https://b.example/"})).to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = test::read_body_json(second).await;
    assert_eq!(body["code"], 1029);
}

#[actix_rt::test]
async fn test_reload_is_paced() {
    let guard = MutationGuard::new(Duration::from_secs(20), Duration::ZERO, 1024);
    let service = route_service(Arc::new(MemoryStorage::new()), guard);
    let app = app!(service);

    let first =
        test::call_service(&app, TestRequest::post().uri("/api/routes/reload").to_request()).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second =
        test::call_service(&app, TestRequest::post().uri("/api/routes/reload").to_request()).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[actix_rt::test]
async fn test_unpersisted_change_reported_but_live() {
    let client = Arc::new(MemoryObjectClient::new());
    let store = ObjectStorage::open(client.clone()).await.unwrap();
    let service = route_service(Arc::new(store), unpaced());
    let app = app!(service);

    client.set_offline(true);
    let resp = test::call_service(
        &app,
        put(json!({"key": "a", "destination": "https://a.example/"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3010);

    let resp = test::call_service(&app, TestRequest::get().uri("/a").to_request()).await;
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://a.example/"
    );
}

// =============================================================================
// Health
// =============================================================================

#[actix_rt::test]
async fn test_health_reports_table() {
    let service = route_service(Arc::new(MemoryStorage::new()), unpaced());
    service
        .put_route(br#"{"key": "a", "destination": "https://a.example/"}"#)
        .await
        .unwrap();
    let app = app!(service);

    let body: Value =
        test::call_and_read_body_json(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["backend"], "memory");
    assert_eq!(body["data"]["routes"], 1);

    let resp = test::call_service(&app, TestRequest::get().uri("/health/live").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
