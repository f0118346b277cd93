use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::StaticConfig;
use crate::metrics_core::MetricsRecorder;
use crate::services::RouteService;
use crate::storage::StorageFactory;

#[cfg(feature = "metrics")]
use crate::metrics::PrometheusMetrics;
#[cfg(not(feature = "metrics"))]
use crate::metrics_core::NoopMetrics;

pub struct StartupContext {
    pub route_service: Arc<RouteService>,
    pub metrics: Arc<dyn MetricsRecorder>,
}

/// 准备服务器启动的上下文：校验配置、打开存储、加载路由表
///
/// Any failure here is fatal.
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    config.validate().context("Invalid configuration")?;

    #[cfg(feature = "metrics")]
    let metrics: Arc<dyn MetricsRecorder> = Arc::new(PrometheusMetrics);
    #[cfg(not(feature = "metrics"))]
    let metrics: Arc<dyn MetricsRecorder> = NoopMetrics::arc();

    let store = StorageFactory::create(&config.storage)
        .await
        .with_context(|| format!("Failed to open storage '{}'", config.storage.url))?;

    let route_service = RouteService::start(config, store, metrics.clone())
        .await
        .context("Failed to load routes")?;

    info!(
        "Startup completed in {:?}: {} routes on {} backend, default destination {}, enrichment {}",
        start_time.elapsed(),
        route_service.table().len(),
        route_service.table().backend_name(),
        config.redirect.default_url,
        if route_service.enrichment_enabled() {
            "on"
        } else {
            "off"
        }
    );

    Ok(StartupContext {
        route_service: Arc::new(route_service),
        metrics,
    })
}
