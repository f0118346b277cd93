//! Durable route storage
//!
//! Every backend implements [`RouteStore`] and documents its own
//! consistency model through [`RouteStore::durability`]:
//!
//! | backend      | durability         | write strategy                              |
//! |--------------|--------------------|---------------------------------------------|
//! | `memory`     | write-through      | none, lost on restart                       |
//! | `json_file`  | write-through      | read file, apply one change, rewrite        |
//! | `shard`      | write-through      | one file per key, no shared document        |
//! | `object`     | apply-then-persist | merge into last download, re-upload object  |
//!
//! The object backend talks to S3 with signed requests (`s3://`) or to a
//! plain HTTP object URL with an optional bearer token (`http(s)://`).
//!
//! The JSON snapshot backend assumes a single writer process: two processes
//! writing the same file race and the last rename wins.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::{BridgeError, Result};

pub mod backends;
pub mod models;

pub use backends::{
    HttpObjectClient, JsonFileStorage, MemoryObjectClient, MemoryStorage, ObjectClient,
    ObjectStorage, S3ObjectClient, ShardStorage,
};
pub use models::{Durability, RouteEntry, host_key, normalize_key, path_key};

#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, destination: &str) -> Result<()>;

    /// Removing a key the medium does not hold is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Fresh enumeration of every stored route, in no particular order.
    async fn list(&self) -> Result<Vec<RouteEntry>>;

    /// Re-read the durable medium, dropping unsynced local state.
    async fn reload(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;

    fn durability(&self) -> Durability;
}

/// Parsed form of `storage.url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Memory,
    JsonFile(String),
    Shard(String),
    /// Plain HTTP object URL
    Object(String),
    S3(S3Target),
}

/// Bucket and object named by an `s3://` storage URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Target {
    pub bucket: String,
    pub object: String,
    pub region: Option<String>,
    /// S3-compatible endpoint (MinIO, R2, ...); AWS when absent
    pub endpoint: Option<String>,
}

impl S3Target {
    pub fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.object)
    }
}

impl StorageTarget {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "memory" || raw == "memory://" {
            return Ok(Self::Memory);
        }

        if let Some(path) = raw.strip_prefix("file://") {
            if path.is_empty() {
                return Err(BridgeError::storage_config("file:// storage needs a path"));
            }
            return Ok(Self::JsonFile(path.to_string()));
        }

        if let Some(dir) = raw.strip_prefix("shard://") {
            if dir.is_empty() {
                return Err(BridgeError::storage_config(
                    "shard:// storage needs a directory",
                ));
            }
            return Ok(Self::Shard(dir.to_string()));
        }

        if raw.starts_with("s3://") {
            return Self::parse_s3(raw);
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            url::Url::parse(raw).map_err(|e| {
                BridgeError::storage_config(format!("invalid object URL '{}': {}", raw, e))
            })?;
            return Ok(Self::Object(raw.to_string()));
        }

        Err(BridgeError::storage_config(format!(
            "unsupported storage scheme in '{}'. Supported: memory://, file://, shard://, s3://, http(s)://",
            raw
        )))
    }

    /// `s3://<bucket>[?region=<region>][&endpoint=<base>][&object=<name>]`
    fn parse_s3(raw: &str) -> Result<Self> {
        let parsed = url::Url::parse(raw)
            .map_err(|e| BridgeError::storage_config(format!("invalid s3 URL '{}': {}", raw, e)))?;
        let bucket = parsed
            .host_str()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| BridgeError::storage_config("s3 storage needs a bucket name"))?;

        let mut endpoint = None;
        let mut region = None;
        let mut object = "routes.json".to_string();
        for (k, v) in parsed.query_pairs() {
            match k.as_ref() {
                "endpoint" => endpoint = Some(v.into_owned()),
                "region" => region = Some(v.into_owned()),
                "object" => object = v.into_owned(),
                _ => {}
            }
        }

        Ok(Self::S3(S3Target {
            bucket: bucket.to_string(),
            object,
            region,
            endpoint,
        }))
    }
}

pub struct StorageFactory;

impl StorageFactory {
    /// Build the configured backend. Failures here are fatal at startup.
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn RouteStore>> {
        let target = StorageTarget::parse(&config.url)?;

        let store: Arc<dyn RouteStore> = match target {
            StorageTarget::Memory => Arc::new(MemoryStorage::new()),
            StorageTarget::JsonFile(path) => Arc::new(JsonFileStorage::open(&path).await?),
            StorageTarget::Shard(dir) => Arc::new(ShardStorage::open(&dir).await?),
            StorageTarget::Object(url) => {
                let client = HttpObjectClient::new(&url, config.token.clone(), config.timeout());
                Arc::new(ObjectStorage::open(Arc::new(client)).await?)
            }
            StorageTarget::S3(target) => {
                let client = S3ObjectClient::new(&target, config.timeout())?;
                Arc::new(ObjectStorage::open(Arc::new(client)).await?)
            }
        };

        info!(
            "Route storage ready: {} ({:?})",
            store.backend_name(),
            store.durability()
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory() {
        assert_eq!(StorageTarget::parse("").unwrap(), StorageTarget::Memory);
        assert_eq!(StorageTarget::parse("memory://").unwrap(), StorageTarget::Memory);
    }

    #[test]
    fn test_parse_file_and_shard() {
        assert_eq!(
            StorageTarget::parse("file://./routes.json").unwrap(),
            StorageTarget::JsonFile("./routes.json".into())
        );
        assert_eq!(
            StorageTarget::parse("shard:///var/lib/bridge").unwrap(),
            StorageTarget::Shard("/var/lib/bridge".into())
        );
        assert!(StorageTarget::parse("file://").is_err());
    }

    #[test]
    fn test_parse_s3() {
        assert_eq!(
            StorageTarget::parse("s3://links?endpoint=http://minio:9000").unwrap(),
            StorageTarget::S3(S3Target {
                bucket: "links".into(),
                object: "routes.json".into(),
                region: None,
                endpoint: Some("http://minio:9000".into()),
            })
        );
        assert_eq!(
            StorageTarget::parse("s3://links?region=eu-west-1&object=data.json").unwrap(),
            StorageTarget::S3(S3Target {
                bucket: "links".into(),
                object: "data.json".into(),
                region: Some("eu-west-1".into()),
                endpoint: None,
            })
        );
        // Region may come from the environment
        assert!(matches!(
            StorageTarget::parse("s3://links"),
            Ok(StorageTarget::S3(_))
        ));
        assert!(matches!(
            StorageTarget::parse("s3://?region=eu-west-1"),
            Err(BridgeError::StorageConfig(_))
        ));
    }

    #[test]
    fn test_s3_client_location() {
        let target = StorageTarget::parse("s3://bkt?region=eu-west-1").unwrap();
        let StorageTarget::S3(target) = target else {
            panic!("expected an s3 target, got {:?}", target);
        };
        let client = S3ObjectClient::new(&target, std::time::Duration::from_secs(1)).unwrap();
        assert_eq!(client.location(), "s3://bkt/routes.json");
    }

    #[test]
    fn test_parse_unknown_scheme() {
        assert!(matches!(
            StorageTarget::parse("redis://localhost"),
            Err(BridgeError::StorageConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_factory_memory() {
        let config = StorageConfig {
            url: "memory://".into(),
            ..Default::default()
        };
        let store = StorageFactory::create(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert_eq!(store.durability(), Durability::WriteThrough);
    }
}
