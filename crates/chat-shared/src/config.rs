//! Configuration management

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;

use crate::constants::*;
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub redis: RedisSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
}

impl RedisSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Time bounds for every cache family plus the per-operation deadline.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub operation_timeout_ms: u64,
    pub session_ttl_secs: u64,
    pub presence_ttl_secs: u64,
    pub conversation_list_ttl_secs: u64,
    pub unread_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            presence_ttl_secs: DEFAULT_PRESENCE_TTL_SECS,
            conversation_list_ttl_secs: DEFAULT_CONVERSATION_LIST_TTL_SECS,
            unread_ttl_secs: DEFAULT_UNREAD_TTL_SECS,
        }
    }
}

impl CacheSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_secs)
    }

    pub fn conversation_list_ttl(&self) -> Duration {
        Duration::from_secs(self.conversation_list_ttl_secs)
    }

    pub fn unread_ttl(&self) -> Duration {
        Duration::from_secs(self.unread_ttl_secs)
    }
}

impl AppConfig {
    /// Defaults, then `config/default`, then `config/{APP_ENV}`, then `SECTION__KEY` env vars.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        let cfg: Self = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overlaid with an inline TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let cfg: Self = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Every cache family must expire and every call must be bounded.
    pub fn validate(&self) -> Result<(), AppError> {
        let url = &self.redis.url;
        if !["redis://", "rediss://", "redis+unix://", "unix://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            return Err(invalid("redis.url", format!("unsupported scheme in {url}")));
        }
        if self.redis.max_connections == 0 {
            return Err(invalid("redis.max_connections", "must be at least 1".into()));
        }
        let c = &self.cache;
        if c.operation_timeout_ms == 0 {
            return Err(invalid("cache.operation_timeout_ms", "must be greater than zero".into()));
        }
        for (key, value) in [
            ("cache.session_ttl_secs", c.session_ttl_secs),
            ("cache.presence_ttl_secs", c.presence_ttl_secs),
            ("cache.conversation_list_ttl_secs", c.conversation_list_ttl_secs),
            ("cache.unread_ttl_secs", c.unread_ttl_secs),
        ] {
            if value == 0 {
                return Err(invalid(key, "must be greater than zero".into()));
            }
            if value > MAX_CACHE_TTL_SECS {
                return Err(invalid(key, format!("must not exceed {MAX_CACHE_TTL_SECS}")));
            }
        }
        Ok(())
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.name", "chat-cache")?
            .set_default("redis.url", DEFAULT_REDIS_URL)?
            .set_default("redis.max_connections", DEFAULT_REDIS_MAX_CONNECTIONS as i64)?
            .set_default("redis.connect_timeout_ms", DEFAULT_REDIS_CONNECT_TIMEOUT_MS as i64)?
            .set_default("cache.operation_timeout_ms", DEFAULT_OPERATION_TIMEOUT_MS as i64)?
            .set_default("cache.session_ttl_secs", DEFAULT_SESSION_TTL_SECS as i64)?
            .set_default("cache.presence_ttl_secs", DEFAULT_PRESENCE_TTL_SECS as i64)?
            .set_default(
                "cache.conversation_list_ttl_secs",
                DEFAULT_CONVERSATION_LIST_TTL_SECS as i64,
            )?
            .set_default("cache.unread_ttl_secs", DEFAULT_UNREAD_TTL_SECS as i64)
    }
}

fn invalid(key: &'static str, reason: String) -> AppError {
    AppError::InvalidSetting { key, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.cache, CacheSettings::default());
        assert_eq!(cfg.redis.url, DEFAULT_REDIS_URL);
        assert_eq!(cfg.cache.conversation_list_ttl(), Duration::from_secs(300));
        assert_eq!(cfg.cache.presence_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_toml_overrides() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [redis]
            url = "redis://cache.internal:6380"
            max_connections = 4

            [cache]
            operation_timeout_ms = 100
            unread_ttl_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.redis.url, "redis://cache.internal:6380");
        assert_eq!(cfg.redis.max_connections, 4);
        assert_eq!(cfg.redis.connect_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.cache.operation_timeout(), Duration::from_millis(100));
        assert_eq!(cfg.cache.unread_ttl(), Duration::from_secs(60));
        assert_eq!(cfg.cache.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = AppConfig::from_toml_str("[cache]\npresence_ttl_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidSetting { key: "cache.presence_ttl_secs", .. }
        ));
    }

    #[test]
    fn test_unbounded_ttl_rejected() {
        let err = AppConfig::from_toml_str("[cache]\nsession_ttl_secs = 9223372036854775807\n")
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidSetting { key: "cache.session_ttl_secs", .. }
        ));
    }

    #[test]
    fn test_bad_url_rejected() {
        let err = AppConfig::from_toml_str("[redis]\nurl = \"http://localhost\"\n").unwrap_err();
        assert!(matches!(err, AppError::InvalidSetting { key: "redis.url", .. }));
    }
}
