//! Redis connection pool

use chat_shared::RedisSettings;
use deadpool_redis::{Config, CreatePoolError, Pool, PoolConfig, Runtime};

/// Pool creation does not dial; the first checkout does.
pub fn create_pool(settings: &RedisSettings) -> Result<Pool, CreatePoolError> {
    let mut cfg = Config::from_url(settings.url.clone());
    let mut pool_cfg = PoolConfig::new(settings.max_connections as usize);
    pool_cfg.timeouts.wait = Some(settings.connect_timeout());
    pool_cfg.timeouts.create = Some(settings.connect_timeout());
    cfg.pool = Some(pool_cfg);
    cfg.create_pool(Some(Runtime::Tokio1))
}
