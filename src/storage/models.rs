use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, Result};

/// 一条路由：key → 目标地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteEntry {
    pub key: String,
    pub destination: String,
}

impl RouteEntry {
    pub fn new(key: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            destination: destination.into(),
        }
    }
}

/// 存储后端的持久化语义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// `set`/`delete` 返回成功即已落盘；失败时路由表回滚
    WriteThrough,
    /// 先改本地副本再上传；上传失败时路由表保留变更，需要 reload 对账
    ApplyThenPersist,
}

/// Canonical form of a route key: no leading `/`, no surrounding whitespace.
///
/// `"/a"` and `"a"` are the same global key, `"example.com/a"` is a
/// host-scoped key.
pub fn normalize_key(raw: &str) -> Result<String> {
    let key = raw.trim().trim_start_matches('/');
    if key.is_empty() {
        return Err(BridgeError::validation("route key cannot be empty"));
    }
    if key.chars().any(char::is_control) {
        return Err(BridgeError::validation(format!(
            "route key '{}' contains control characters",
            key.escape_debug()
        )));
    }
    Ok(key.to_string())
}

/// Key looked up for an inbound request on `host`.
pub fn host_key(host: &str, path: &str) -> String {
    format!("{}/{}", host, path.trim_start_matches('/'))
}

/// Key looked up for an inbound request regardless of host.
pub fn path_key(path: &str) -> &str {
    path.trim_start_matches('/')
}
