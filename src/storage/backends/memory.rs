use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::Result;
use crate::storage::{Durability, RouteEntry, RouteStore};

/// Process-local storage, used when no persistence is configured.
#[derive(Default)]
pub struct MemoryStorage {
    routes: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.routes.read().get(key).cloned())
    }

    async fn set(&self, key: &str, destination: &str) -> Result<()> {
        self.routes
            .write()
            .insert(key.to_string(), destination.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.routes.write().remove(key);
        Ok(())
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
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn durability(&self) -> Durability {
        Durability::WriteThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "https://a.example").await.unwrap();
        assert_eq!(
            store.get("a").await.unwrap().as_deref(),
            Some("https://a.example")
        );

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reload_keeps_state() {
        let store = MemoryStorage::new();
        store.set("a", "https://a.example").await.unwrap();
        store.reload().await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
