use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{BridgeError, Result};
use crate::storage::{Durability, RouteEntry, RouteStore};

/// Whole-file JSON snapshot: one flat `{"key": "destination"}` object.
///
/// Every mutation re-reads the file, applies exactly one change and
/// rewrites it, so edits made to the file by hand (or by another instance)
/// since the last load survive the write. Concurrent writers in different
/// processes are not coordinated; the last rename wins.
pub struct JsonFileStorage {
    path: PathBuf,
    routes: RwLock<HashMap<String, String>>,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Open the snapshot at `path`, creating `{}` (and parent directories)
    /// when it does not exist yet. A `.json` suffix is appended when missing.
    pub async fn open(path: &str) -> Result<Self> {
        let mut path = PathBuf::from(path);
        if path.extension().is_none_or(|ext| ext != "json") {
            let mut name = path.as_os_str().to_owned();
            name.push(".json");
            path = PathBuf::from(name);
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                BridgeError::file_operation(format!(
                    "failed to create storage directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        if fs::metadata(&path).await.is_err() {
            info!("Route file not found, creating {}", path.display());
            fs::write(&path, "{}").await.map_err(|e| {
                BridgeError::file_operation(format!(
                    "failed to create route file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        let routes = read_snapshot(&path).await?;
        info!("Loaded {} routes from {}", routes.len(), path.display());

        Ok(Self {
            path,
            routes: RwLock::new(routes),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self.write_lock.lock().await;

        let mut on_disk = read_snapshot(&self.path).await?;
        apply(&mut on_disk);
        write_snapshot(&self.path, &on_disk).await?;

        *self.routes.write() = on_disk;
        Ok(())
    }
}

async fn read_snapshot(path: &Path) -> Result<HashMap<String, String>> {
    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Route file {} disappeared, treating as empty", path.display());
            return Ok(HashMap::new());
        }
        Err(e) => {
            return Err(BridgeError::storage_unavailable(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )));
        }
    };

    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(HashMap::new());
    }

    serde_json::from_slice(&content).map_err(|e| {
        BridgeError::serialization(format!("failed to parse {}: {}", path.display(), e))
    })
}

async fn write_snapshot(path: &Path, routes: &HashMap<String, String>) -> Result<()> {
    let sorted: BTreeMap<&String, &String> = routes.iter().collect();
    let json = serde_json::to_vec_pretty(&sorted)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, &json).await.map_err(|e| {
        BridgeError::storage_unavailable(format!("failed to write {}: {}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).await.map_err(|e| {
        BridgeError::storage_unavailable(format!(
            "failed to replace {}: {}",
            path.display(),
            e
        ))
    })?;

    debug!("Wrote {} routes to {}", routes.len(), path.display());
    Ok(())
}

#[async_trait]
impl RouteStore for JsonFileStorage {
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
        let routes = read_snapshot(&self.path).await?;
        info!("Reloaded {} routes from {}", routes.len(), self.path.display());
        *self.routes.write() = routes;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "json_file"
    }

    fn durability(&self) -> Durability {
        Durability::WriteThrough
    }
}
