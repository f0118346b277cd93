//! Server mode
//!
//! Configures and starts the HTTP server with all routes.

use actix_web::{App, HttpServer, web};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::middleware::TimingMiddleware;
use crate::api::services::{AppStartTime, configure};
use crate::config::get_config;
use crate::runtime::lifetime;

/// Run the HTTP server until it stops or a shutdown signal arrives.
///
/// **Note**: Logging must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime::now();
    let config = get_config();

    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let route_service = startup.route_service.clone();
    let metrics = startup.metrics.clone();

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TimingMiddleware::new(metrics.clone()))
            .app_data(web::Data::new(route_service.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .configure(configure)
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();
    let handle = server.handle();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown() => {
            handle.stop(true).await;
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
