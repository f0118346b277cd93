//! Route service
//!
//! Wires the route table, mutation guard and renderer into the operations
//! the HTTP layer exposes. Owns the process-lifetime `RouteTable`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::StaticConfig;
use crate::errors::{BridgeError, Result};
use crate::metrics_core::MetricsRecorder;
use crate::storage::{RouteEntry, RouteStore, host_key, normalize_key};
use crate::utils::validate_destination;

use super::guard::MutationGuard;
use super::renderer::{Enrichment, RedirectRenderer, RenderedRedirect};
use super::route_table::RouteTable;

/// Inbound request to resolve
#[derive(Debug, Clone, Default)]
pub struct RedirectRequest {
    pub host: Option<String>,
    pub path: String,
    /// HEAD requests never trigger enrichment
    pub head_only: bool,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub remote_addr: Option<String>,
}

/// Body of `PUT`/`DELETE /api/routes`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteMutation {
    #[serde(default, alias = "path")]
    pub key: String,
    #[serde(default, alias = "url", alias = "target")]
    pub destination: Option<String>,
    /// Scope the key to this host
    #[serde(default)]
    pub host: Option<String>,
}

impl RouteMutation {
    /// Stored key: `host/key` when a host is given, `key` otherwise.
    fn scoped_key(&self) -> Result<String> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(BridgeError::validation("key is required"));
        }
        match self.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => normalize_key(&host_key(host, key)),
            None => normalize_key(key),
        }
    }

    fn destination(&self) -> Result<&str> {
        self.destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| BridgeError::validation("destination is required"))
    }
}

pub struct RouteService {
    table: Arc<RouteTable>,
    guard: MutationGuard,
    renderer: RedirectRenderer,
    metrics: Arc<dyn MetricsRecorder>,
}

impl RouteService {
    pub fn new(
        table: Arc<RouteTable>,
        guard: MutationGuard,
        renderer: RedirectRenderer,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            table,
            guard,
            renderer,
            metrics,
        }
    }

    /// Build the service over an opened store and hydrate the table.
    ///
    /// A failing initial load is fatal.
    pub async fn start(
        config: &StaticConfig,
        store: Arc<dyn RouteStore>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Result<Self> {
        let table = RouteTable::new(
            store,
            config.redirect.default_url.clone(),
            config.storage.timeout(),
        )
        .with_metrics(metrics.clone());
        table.reload().await?;

        Ok(Self::new(
            Arc::new(table),
            MutationGuard::from_config(&config.guard),
            RedirectRenderer::from_config(&config.redirect),
            metrics,
        ))
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    pub fn guard(&self) -> &MutationGuard {
        &self.guard
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.renderer.enrichment_enabled()
    }

    // ============ Redirect ============

    pub async fn redirect(&self, req: &RedirectRequest) -> RenderedRedirect {
        let resolution = self.table.resolve(req.host.as_deref(), &req.path);

        let (rendered, enrichment) = if req.head_only {
            (self.renderer.plain(&resolution.destination), Enrichment::Disabled)
        } else {
            self.renderer.render(&resolution.destination).await
        };

        // 未命中统一记为 default，标签基数受路由表大小约束
        self.metrics.inc_redirect(
            resolution.key.as_deref().unwrap_or("default"),
            resolution.source.as_str(),
        );
        if self.renderer.enrichment_enabled() && !req.head_only {
            self.metrics.inc_enrichment(enrichment.as_str());
        }

        info!(
            target: "bridge::access",
            key = resolution.key.as_deref().unwrap_or(""),
            source = resolution.source.as_str(),
            host = req.host.as_deref().unwrap_or(""),
            path = %req.path,
            destination = %resolution.destination,
            enrichment = enrichment.as_str(),
            user_agent = req.user_agent.as_deref().unwrap_or(""),
            referer = req.referer.as_deref().unwrap_or(""),
            remote_addr = req.remote_addr.as_deref().unwrap_or(""),
            timestamp = %chrono::Utc::now().to_rfc3339(),
            "redirect"
        );

        rendered
    }

    // ============ Mutations ============

    fn decode(&self, body: &[u8]) -> Result<RouteMutation> {
        self.guard.check_payload(body.len())?;
        serde_json::from_slice(body)
            .map_err(|e| BridgeError::serialization(format!("invalid request body: {}", e)))
    }

    fn record<T>(&self, operation: &str, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(e) => e.error_type(),
        };
        self.metrics.inc_mutation(operation, outcome);
    }

    /// Add or overwrite a route from a JSON body.
    pub async fn put_route(&self, body: &[u8]) -> Result<RouteEntry> {
        let result = self.put_route_inner(body).await;
        self.record("put", &result);
        result
    }

    async fn put_route_inner(&self, body: &[u8]) -> Result<RouteEntry> {
        let mutation = self.decode(body)?;
        let key = mutation.scoped_key()?;
        let destination = mutation.destination()?;
        validate_destination(destination)?;
        self.guard.admit_update()?;

        self.table.set(&key, destination).await?;
        info!("Route '{}' set to '{}'", key, destination);
        Ok(RouteEntry::new(key, destination))
    }

    /// Remove a route named by a JSON body; returns the removed key.
    pub async fn delete_route(&self, body: &[u8]) -> Result<String> {
        let result = self.delete_route_inner(body).await;
        self.record("delete", &result);
        result
    }

    async fn delete_route_inner(&self, body: &[u8]) -> Result<String> {
        let mutation = self.decode(body)?;
        let key = mutation.scoped_key()?;
        self.guard.admit_update()?;

        self.table.delete(&key).await?;
        info!("Route '{}' deleted", key);
        Ok(key)
    }

    /// Re-read the backend, subject to reload pacing.
    pub async fn reload(&self) -> Result<usize> {
        let result = match self.guard.admit_reload() {
            Ok(()) => self.table.reload().await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!("Reload not applied: {}", e);
        }
        self.record("reload", &result);
        result
    }

    // ============ Reads ============

    pub fn list_routes(&self, host: Option<&str>) -> Vec<RouteEntry> {
        self.table.list(host)
    }

    pub fn get_route(&self, key: &str) -> Result<RouteEntry> {
        let key = normalize_key(key)?;
        self.table
            .get(&key)
            .map(|destination| RouteEntry::new(key.clone(), destination))
            .ok_or_else(|| BridgeError::not_found(format!("route '{}' not found", key)))
    }
}
