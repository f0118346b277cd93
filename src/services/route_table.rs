//! In-memory route table
//!
//! Readers load an immutable `Arc<HashMap>` snapshot through `ArcSwap` and
//! never block. Mutations are serialized by an async mutex, publish a new
//! snapshot (copy, modify, swap) and then persist to the backend.
//!
//! Persistence failure handling depends on [`Durability`]:
//! - `WriteThrough`: the previous value is restored and `StorageUnavailable`
//!   is returned.
//! - `ApplyThenPersist`: the mutation lock is released before the upload;
//!   on failure the change stays visible and `ReconciliationPending` is
//!   returned. `reload` brings the table back in line with the remote copy.
//!
//! A store call that hits the storage timeout is dropped, not cancelled on
//! disk: a `tokio::fs` write already handed to the blocking pool may still
//! land after the table rolled back. The file then holds the change until
//! the next `reload` picks it up.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{BridgeError, Result};
use crate::metrics_core::{MetricsRecorder, NoopMetrics};
use crate::storage::{Durability, RouteEntry, RouteStore, host_key, normalize_key, path_key};
use crate::utils::validate_destination;

/// Which rule produced a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// `host/path` matched
    Host,
    /// `path` matched
    Global,
    /// Nothing matched, configured default
    Default,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Host => "host",
            ResolutionSource::Global => "global",
            ResolutionSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Matched key, `None` for the default destination
    pub key: Option<String>,
    pub destination: String,
    pub source: ResolutionSource,
}

type Snapshot = HashMap<String, String>;

pub struct RouteTable {
    store: Arc<dyn RouteStore>,
    routes: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
    default_destination: String,
    storage_timeout: Duration,
    metrics: Arc<dyn MetricsRecorder>,
}

impl RouteTable {
    /// Empty table over `store`; call [`RouteTable::reload`] to hydrate it.
    pub fn new(
        store: Arc<dyn RouteStore>,
        default_destination: impl Into<String>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            store,
            routes: ArcSwap::from_pointee(HashMap::new()),
            write_lock: Mutex::new(()),
            default_destination: default_destination.into(),
            storage_timeout,
            metrics: NoopMetrics::arc(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn durability(&self) -> Durability {
        self.store.durability()
    }

    pub fn default_destination(&self) -> &str {
        &self.default_destination
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }

    /// Current snapshot; stays valid (and unchanged) across later swaps.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.routes.load_full()
    }

    // ============ Reads ============

    /// Resolve an inbound request: `host/path`, then `path`, then default.
    pub fn resolve(&self, host: Option<&str>, path: &str) -> Resolution {
        let routes = self.routes.load();

        if let Some(host) = host.filter(|h| !h.is_empty()) {
            let key = host_key(host, path);
            if let Some(destination) = routes.get(&key) {
                return Resolution {
                    key: Some(key),
                    destination: destination.clone(),
                    source: ResolutionSource::Host,
                };
            }
        }

        let key = path_key(path);
        if let Some(destination) = routes.get(key) {
            return Resolution {
                key: Some(key.to_string()),
                destination: destination.clone(),
                source: ResolutionSource::Global,
            };
        }

        Resolution {
            key: None,
            destination: self.default_destination.clone(),
            source: ResolutionSource::Default,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let key = normalize_key(key).ok()?;
        self.routes.load().get(&key).cloned()
    }

    /// All routes sorted by key, optionally only those scoped to `host`.
    pub fn list(&self, host: Option<&str>) -> Vec<RouteEntry> {
        let routes = self.routes.load();
        let prefix = host.filter(|h| !h.is_empty()).map(|h| format!("{}/", h));

        let mut entries: Vec<RouteEntry> = routes
            .iter()
            .filter(|(k, _)| prefix.as_deref().is_none_or(|p| k.starts_with(p)))
            .map(|(k, v)| RouteEntry::new(k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    // ============ Mutations ============

    /// Replace the whole table with the backend's current content.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn reload(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        self.persist("reload", self.store.reload()).await?;
        let entries = self.persist("list", self.store.list()).await?;

        let routes: Snapshot = entries
            .into_iter()
            .map(|entry| (entry.key, entry.destination))
            .collect();
        let count = routes.len();
        self.routes.store(Arc::new(routes));
        self.metrics.set_routes(count as f64);

        info!(
            "Route table reloaded from {} backend: {} routes",
            self.store.backend_name(),
            count
        );
        Ok(count)
    }

    /// Insert or overwrite `key`.
    pub async fn set(&self, key: &str, destination: &str) -> Result<()> {
        validate_destination(destination)?;
        let key = normalize_key(key)?;
        let destination = destination.trim().to_string();

        let guard = self.write_lock.lock().await;
        let previous = self.routes.load().get(&key).cloned();
        self.publish(|routes| {
            routes.insert(key.clone(), destination.clone());
        });

        match self.store.durability() {
            Durability::WriteThrough => {
                let result = self.persist("set", self.store.set(&key, &destination)).await;
                if let Err(e) = result {
                    warn!("Persisting '{}' failed, rolling back: {}", key, e);
                    self.restore(&key, previous);
                    return Err(e);
                }
                drop(guard);
            }
            Durability::ApplyThenPersist => {
                drop(guard);
                let result = self.persist("set", self.store.set(&key, &destination)).await;
                if let Err(e) = result {
                    warn!("Route '{}' applied but not persisted: {}", key, e);
                    return Err(BridgeError::reconciliation_pending(format!(
                        "route '{}' is live but was not persisted ({}); reload to reconcile",
                        key,
                        e.message()
                    )));
                }
            }
        }

        debug!("Route '{}' -> '{}'", key, destination);
        Ok(())
    }

    /// Remove `key`; `NotFound` when the table does not hold it.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let key = normalize_key(key)?;

        let guard = self.write_lock.lock().await;
        let Some(previous) = self.routes.load().get(&key).cloned() else {
            return Err(BridgeError::not_found(format!("route '{}' not found", key)));
        };
        self.publish(|routes| {
            routes.remove(&key);
        });

        match self.store.durability() {
            Durability::WriteThrough => {
                let result = self.persist("delete", self.store.delete(&key)).await;
                if let Err(e) = result {
                    warn!("Deleting '{}' failed, rolling back: {}", key, e);
                    self.restore(&key, Some(previous));
                    return Err(e);
                }
                drop(guard);
            }
            Durability::ApplyThenPersist => {
                drop(guard);
                let result = self.persist("delete", self.store.delete(&key)).await;
                if let Err(e) = result {
                    warn!("Route '{}' removed but not persisted: {}", key, e);
                    return Err(BridgeError::reconciliation_pending(format!(
                        "route '{}' is removed but the removal was not persisted ({}); reload to reconcile",
                        key,
                        e.message()
                    )));
                }
            }
        }

        debug!("Route '{}' deleted", key);
        Ok(())
    }

    /// Copy the current snapshot, modify it and swap it in.
    ///
    /// Callers hold `write_lock`, so there is no concurrent writer to race.
    fn publish<F>(&self, apply: F)
    where
        F: FnOnce(&mut Snapshot),
    {
        let mut next = HashMap::clone(&self.routes.load());
        apply(&mut next);
        let count = next.len();
        self.routes.store(Arc::new(next));
        self.metrics.set_routes(count as f64);
    }

    fn restore(&self, key: &str, previous: Option<String>) {
        self.publish(|routes| match previous {
            Some(destination) => {
                routes.insert(key.to_string(), destination);
            }
            None => {
                routes.remove(key);
            }
        });
    }

    /// Run a backend call under the storage timeout. Any failure comes back
    /// as `StorageUnavailable`.
    async fn persist<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.storage_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e @ BridgeError::StorageUnavailable(_))) => Err(e),
            Ok(Err(e)) => Err(BridgeError::storage_unavailable(format!(
                "{} backend {} failed: {}",
                self.store.backend_name(),
                operation,
                e.message()
            ))),
            Err(_) => Err(BridgeError::storage_unavailable(format!(
                "{} backend {} timed out after {}ms",
                self.store.backend_name(),
                operation,
                self.storage_timeout.as_millis()
            ))),
        };
        self.metrics
            .observe_storage_operation(operation, start.elapsed().as_secs_f64());
        result
    }
}
