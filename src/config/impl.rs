use std::path::Path;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;
use crate::errors::{BridgeError, Result};
use crate::utils::url_validator::validate_url;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：BRIDGE，分隔符：__
    /// 示例：BRIDGE__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("BRIDGE")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 启动前校验：默认跳转地址必须是合法的绝对 URL
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.redirect.default_url).map_err(|e| {
            BridgeError::invalid_destination(format!(
                "redirect.default_url '{}' rejected: {}",
                self.redirect.default_url, e
            ))
        })?;

        if self.guard.max_payload_bytes == 0 {
            return Err(BridgeError::validation(
                "guard.max_payload_bytes must be greater than zero",
            ));
        }

        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults when `init_config`
/// was never called.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration
pub fn init_config(path: Option<&str>) {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load(path)));
}

/// Replace the global configuration (command-line overrides are applied this way)
pub fn update_config<F>(f: F)
where
    F: FnOnce(&mut StaticConfig),
{
    let slot = CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()));
    let mut next = (*slot.load_full()).clone();
    f(&mut next);
    slot.store(Arc::new(next));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_default_url() {
        let mut config = StaticConfig::default();
        config.redirect.default_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(BridgeError::InvalidDestination(_))
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(StaticConfig::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(
            &path,
            "[redirect]\ndefault_url = \"https://example.org/\"\nstatus = 307\n",
        )
        .unwrap();

        let config = StaticConfig::load(path.to_str());
        assert_eq!(config.redirect.default_url, "https://example.org/");
        assert_eq!(config.redirect.status.as_u16(), 307);
        assert_eq!(config.guard.reload_interval_secs, 20);
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
    }
}
