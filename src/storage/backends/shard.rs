use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::{BridgeError, Result};
use crate::storage::{Durability, RouteEntry, RouteStore};

/// One file per route inside a directory.
///
/// The file name is the URL-escaped key and the content is the raw
/// destination. Unrelated keys never touch the same file, so there is no
/// read-merge-write of a shared document.
pub struct ShardStorage {
    dir: PathBuf,
}

impl ShardStorage {
    pub async fn open(dir: &str) -> Result<Self> {
        let dir = PathBuf::from(dir);
        fs::create_dir_all(&dir).await.map_err(|e| {
            BridgeError::file_operation(format!(
                "failed to create storage directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        info!("Shard storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn shard_path(&self, key: &str) -> PathBuf {
        self.dir.join(shard_file_name(key))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Query-escape `key` (space as `+`, literal `+` as `%2B`); a leading `.`
/// is escaped too so a key can never name `.`/`..` or collide with hidden
/// files.
pub(crate) fn shard_file_name(key: &str) -> String {
    let encoded = urlencoding::encode(key).replace("%20", "+");
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded,
    }
}

/// Inverse of [`shard_file_name`]; `+` decodes to a space.
pub(crate) fn shard_key(file_name: &str) -> std::result::Result<String, std::string::FromUtf8Error> {
    urlencoding::decode(&file_name.replace('+', " ")).map(|key| key.into_owned())
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> BridgeError {
    BridgeError::storage_unavailable(format!("failed to {} {}: {}", action, path.display(), e))
}

#[async_trait]
impl RouteStore for ShardStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.shard_path(key);
        match fs::read_to_string(&path).await {
            Ok(destination) => Ok(Some(destination)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    async fn set(&self, key: &str, destination: &str) -> Result<()> {
        let path = self.shard_path(key);
        fs::write(&path, destination)
            .await
            .map_err(|e| io_error("write", &path, e))?;
        debug!("Wrote shard {}", path.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.shard_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<RouteEntry>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error("list", &self.dir, e))?;

        let mut routes = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list", &self.dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| io_error("stat", &entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!("Skipping non UTF-8 shard name: {:?}", name);
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let key = match shard_key(name) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Skipping undecodable shard name '{}': {}", name, e);
                    continue;
                }
            };

            let destination = fs::read_to_string(entry.path())
                .await
                .map_err(|e| io_error("read", &entry.path(), e))?;
            routes.push(RouteEntry::new(key, destination));
        }

        Ok(routes)
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "shard"
    }

    fn durability(&self) -> Durability {
        Durability::WriteThrough
    }
}
