use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::errors::{BridgeError, Result};
use crate::storage::{Durability, RouteEntry, RouteStore};

/// Remote location of the single route object.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// `Ok(None)` when the object does not exist yet.
    async fn download(&self) -> Result<Option<Vec<u8>>>;

    async fn upload(&self, body: Vec<u8>) -> Result<()>;

    fn location(&self) -> String;
}

/// Plain HTTP GET/PUT against an object URL (S3-compatible gateways,
/// presigned or public buckets, WebDAV).
pub struct HttpObjectClient {
    url: String,
    token: Option<String>,
    agent: Agent,
}

impl HttpObjectClient {
    pub fn new(url: &str, token: Option<String>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            url: url.to_string(),
            token,
            agent,
        }
    }

    fn download_sync(agent: Agent, url: String, token: Option<String>) -> Result<Option<Vec<u8>>> {
        let mut request = agent.get(&url);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        match request.call() {
            Ok(mut resp) => resp.body_mut().read_to_vec().map(Some).map_err(|e| {
                BridgeError::storage_unavailable(format!("failed to read {}: {}", url, e))
            }),
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(BridgeError::storage_unavailable(format!(
                "failed to download {}: {}",
                url, e
            ))),
        }
    }

    fn upload_sync(agent: Agent, url: String, token: Option<String>, body: Vec<u8>) -> Result<()> {
        let mut request = agent.put(&url).header("Content-Type", "application/json");
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        request.send(&body[..]).map(|_| ()).map_err(|e| {
            BridgeError::storage_unavailable(format!("failed to upload {}: {}", url, e))
        })
    }
}

#[async_trait]
impl ObjectClient for HttpObjectClient {
    async fn download(&self) -> Result<Option<Vec<u8>>> {
        let (agent, url, token) = (self.agent.clone(), self.url.clone(), self.token.clone());
        tokio::task::spawn_blocking(move || Self::download_sync(agent, url, token))
            .await
            .map_err(|e| BridgeError::storage_unavailable(format!("download task failed: {}", e)))?
    }

    async fn upload(&self, body: Vec<u8>) -> Result<()> {
        let (agent, url, token) = (self.agent.clone(), self.url.clone(), self.token.clone());
        tokio::task::spawn_blocking(move || Self::upload_sync(agent, url, token, body))
            .await
            .map_err(|e| BridgeError::storage_unavailable(format!("upload task failed: {}", e)))?
    }

    fn location(&self) -> String {
        self.url.clone()
    }
}

/// In-process object client; can be switched offline to simulate an
/// unreachable object store.
#[derive(Default)]
pub struct MemoryObjectClient {
    object: RwLock<Option<Vec<u8>>>,
    offline: AtomicBool,
    uploads: AtomicUsize,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(body: impl Into<Vec<u8>>) -> Self {
        Self {
            object: RwLock::new(Some(body.into())),
            ..Self::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Stored object decoded as a route map (empty when absent)
    pub fn stored_routes(&self) -> HashMap<String, String> {
        self.object
            .read()
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
            .unwrap_or_default()
    }

    /// Replace the remote object, as another writer would.
    pub fn put_external(&self, body: impl Into<Vec<u8>>) {
        *self.object.write() = Some(body.into());
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::storage_unavailable("object store unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn download(&self) -> Result<Option<Vec<u8>>> {
        self.check_online()?;
        Ok(self.object.read().clone())
    }

    async fn upload(&self, body: Vec<u8>) -> Result<()> {
        self.check_online()?;
        *self.object.write() = Some(body);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory://object".to_string()
    }
}

/// Whole route map stored as one remote JSON object.
///
/// Mutations are applied to the last successfully downloaded copy first and
/// the full object is uploaded afterwards. When the upload fails the change
/// stays in the local copy (and is carried by the next successful upload);
/// `reload` drops it by downloading the remote object again.
pub struct ObjectStorage {
    client: Arc<dyn ObjectClient>,
    routes: RwLock<HashMap<String, String>>,
    write_lock: Mutex<()>,
}

impl ObjectStorage {
    /// Download the object, uploading `{}` when it does not exist yet.
    pub async fn open(client: Arc<dyn ObjectClient>) -> Result<Self> {
        let routes = match client.download().await? {
            Some(body) => decode(&body)?,
            None => {
                info!("Route object {} not found, initializing", client.location());
                client.upload(b"{}".to_vec()).await?;
                HashMap::new()
            }
        };
        info!("Loaded {} routes from {}", routes.len(), client.location());

        Ok(Self {
            client,
            routes: RwLock::new(routes),
            write_lock: Mutex::new(()),
        })
    }

    async fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self.write_lock.lock().await;

        let body = {
            let mut routes = self.routes.write();
            apply(&mut routes);
            encode(&routes)?
        };

        match self.client.upload(body).await {
            Ok(()) => {
                debug!("Uploaded route object to {}", self.client.location());
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Upload to {} failed, local copy is ahead of the remote object: {}",
                    self.client.location(),
                    e
                );
                Err(e)
            }
        }
    }
}

fn decode(body: &[u8]) -> Result<HashMap<String, String>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }
    serde_json::from_slice(body)
        .map_err(|e| BridgeError::serialization(format!("failed to parse route object: {}", e)))
}

fn encode(routes: &HashMap<String, String>) -> Result<Vec<u8>> {
    let sorted: BTreeMap<&String, &String> = routes.iter().collect();
    Ok(serde_json::to_vec_pretty(&sorted)?)
}

#[async_trait]
impl RouteStore for ObjectStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.routes.read().get(key).cloned())
    }

    async fn set(&self, key: &str, destination: &str) -> Result<()> {
        self.mutate(|routes| {
            routes.insert(key.to_string(), destination.to_string());
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.mutate(|routes| {
            routes.remove(key);
        })
        .await
    }

    async fn list(&self) -> Result<Vec<RouteEntry>> {
        Ok(self
            .routes
            .read()
            .iter()
            .map(|(k, v)| RouteEntry::new(k.clone(), v.clone()))
            .collect())
    }

    async fn reload(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let routes = match self.client.download().await? {
            Some(body) => decode(&body)?,
            None => HashMap::new(),
        };
        info!(
            "Reloaded {} routes from {}",
            routes.len(),
            self.client.location()
        );
        *self.routes.write() = routes;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "object"
    }

    fn durability(&self) -> Durability {
        Durability::ApplyThenPersist
    }
}
