use std::time::Duration;

use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};

/// 重定向状态码
///
/// 只接受 3xx 中语义为"跳转到 Location"的四个状态码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u16", into = "u16")]
pub enum RedirectStatus {
    MovedPermanently,
    #[default]
    Found,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectStatus {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::MovedPermanently => 301,
            Self::Found => 302,
            Self::TemporaryRedirect => 307,
            Self::PermanentRedirect => 308,
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            Self::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
            Self::Found => StatusCode::FOUND,
            Self::TemporaryRedirect => StatusCode::TEMPORARY_REDIRECT,
            Self::PermanentRedirect => StatusCode::PERMANENT_REDIRECT,
        }
    }
}

impl TryFrom<u16> for RedirectStatus {
    type Error = String;
    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            301 => Ok(Self::MovedPermanently),
            302 => Ok(Self::Found),
            307 => Ok(Self::TemporaryRedirect),
            308 => Ok(Self::PermanentRedirect),
            _ => Err(format!(
                "Invalid redirect status: {}. Valid: 301, 302, 307, 308",
                code
            )),
        }
    }
}

impl From<RedirectStatus> for u16 {
    fn from(status: RedirectStatus) -> Self {
        status.as_u16()
    }
}

impl std::fmt::Display for RedirectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl std::str::FromStr for RedirectStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: u16 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid redirect status: '{}'", s))?;
        Self::try_from(code)
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > 配置文件 > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub redirect: RedirectConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 路由存储配置
///
/// `url` 的 scheme 决定后端：
/// - 空 / `memory://`：纯内存
/// - `file://<path>`：整文件 JSON 快照
/// - `shard://<dir>`：每个 key 一个文件
/// - `s3://<bucket>?endpoint=...` 或 `http(s)://...`：对象存储
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_url")]
    pub url: String,
    /// 对象存储的 Bearer token（可选）
    #[serde(default)]
    pub token: Option<String>,
    /// 单次存储调用的超时（毫秒）
    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 重定向与预览配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    #[serde(default = "default_redirect_url")]
    pub default_url: String,
    #[serde(default)]
    pub status: RedirectStatus,
    /// 是否抓取目标页面 `<head>` 中的 meta 标签
    #[serde(default)]
    pub enrich: bool,
    #[serde(default = "default_enrich_timeout_ms")]
    pub enrich_timeout_ms: u64,
}

impl RedirectConfig {
    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_millis(self.enrich_timeout_ms)
    }
}

/// 写操作限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl GuardConfig {
    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_storage_url() -> String {
    "file://./routes.json".to_string()
}

fn default_storage_timeout_ms() -> u64 {
    5000
}

fn default_redirect_url() -> String {
    "https://github.com/".to_string()
}

fn default_enrich_timeout_ms() -> u64 {
    2000
}

fn default_reload_interval_secs() -> u64 {
    20
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_max_payload_bytes() -> usize {
    50 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: default_storage_url(),
            token: None,
            timeout_ms: default_storage_timeout_ms(),
        }
    }
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            default_url: default_redirect_url(),
            status: RedirectStatus::default(),
            enrich: false,
            enrich_timeout_ms: default_enrich_timeout_ms(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            reload_interval_secs: default_reload_interval_secs(),
            update_interval_ms: default_update_interval_ms(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_status_parse() {
        assert_eq!(
            "301".parse::<RedirectStatus>().unwrap(),
            RedirectStatus::MovedPermanently
        );
        assert_eq!(
            RedirectStatus::try_from(308).unwrap(),
            RedirectStatus::PermanentRedirect
        );
        assert!(RedirectStatus::try_from(200).is_err());
        assert!("abc".parse::<RedirectStatus>().is_err());
    }

    #[test]
    fn test_defaults_match_reference_behavior() {
        let config = StaticConfig::default();
        assert_eq!(config.guard.reload_interval(), Duration::from_secs(20));
        assert_eq!(config.guard.update_interval(), Duration::from_secs(1));
        assert_eq!(config.guard.max_payload_bytes, 51200);
        assert_eq!(config.redirect.enrich_timeout(), Duration::from_secs(2));
        assert_eq!(config.redirect.status, RedirectStatus::Found);
    }

    #[test]
    fn test_toml_roundtrip_keeps_status_numeric() {
        let mut config = StaticConfig::default();
        config.redirect.status = RedirectStatus::MovedPermanently;
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("status = 301"));

        let parsed: StaticConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.redirect.status, RedirectStatus::MovedPermanently);
    }
}
