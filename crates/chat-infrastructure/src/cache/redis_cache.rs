// ============================================================================
// Chat Infrastructure - Redis Cache
// File: crates/chat-infrastructure/src/cache/redis_cache.rs
// ============================================================================
//! Redis implementation of the cache capability ports

use std::time::Duration;

use async_trait::async_trait;
use chat_core::cache::{Deleter, ExistenceChecker, Getter, HealthCheck, Incrementer, Setter};
use chat_core::{CacheError, OpContext};
use chat_shared::RedisSettings;
use deadpool_redis::redis::{self, ErrorKind, RedisError};
use deadpool_redis::{Connection, CreatePoolError, Pool};
use tracing::debug;

use super::pool::create_pool;

/// Stateless apart from the pool. Atomicity comes from Redis itself:
/// `SET` overwrites atomically and increments run as a single script.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn connect(settings: &RedisSettings) -> Result<Self, CreatePoolError> {
        Ok(Self::new(create_pool(settings)?))
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::StoreUnavailable(format!("pool checkout: {e}")))
    }
}

/// Longest expiry sent to Redis. Anything above is stored without one, which
/// keeps `PX`/`PEXPIRE` clear of Redis' "invalid expire time" range.
const MAX_EXPIRE_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// INCR then set the TTL. `redis.call` aborts the script on a non-integer
/// value, so a foreign value keeps its TTL. ARGV[1] is 0 for no expiry.
const INCR_WITH_TTL: &str = r#"
local n = redis.call('INCR', KEYS[1])
if tonumber(ARGV[1]) > 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
else
    redis.call('PERSIST', KEYS[1])
end
return n
"#;

fn ttl_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

/// `None` means no expiry: zero, or too large for Redis to accept.
fn expiry_ms(ttl: Duration) -> Option<u64> {
    match ttl_ms(ttl) {
        0 => None,
        ms if ms > MAX_EXPIRE_MS => None,
        ms => Some(ms),
    }
}

fn classify(key: &str, e: RedisError) -> CacheError {
    if e.kind() == ErrorKind::TypeError || e.to_string().contains("not an integer") {
        return CacheError::Decode(format!("{key}: {e}"));
    }
    CacheError::StoreUnavailable(e.to_string())
}

#[async_trait]
impl Getter for RedisCache {
    async fn get_raw(&self, ctx: &OpContext, key: &str) -> Result<Vec<u8>, CacheError> {
        ctx.run(async {
            let mut conn = self.conn().await?;
            let value: Option<Vec<u8>> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(key, e))?;
            value.ok_or(CacheError::NotFound)
        })
        .await
    }
}

#[async_trait]
impl Setter for RedisCache {
    async fn set_raw(
        &self,
        ctx: &OpContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        ctx.run(async {
            let mut conn = self.conn().await?;
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value);
            if let Some(ms) = expiry_ms(ttl) {
                cmd.arg("PX").arg(ms);
            }
            let _: () = cmd
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(key, e))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Deleter for RedisCache {
    async fn delete(&self, ctx: &OpContext, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return ctx.check();
        }
        ctx.run(async {
            let mut conn = self.conn().await?;
            let mut cmd = redis::cmd("DEL");
            for key in keys {
                cmd.arg(key.as_str());
            }
            let removed: i64 = cmd
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;
            debug!("DEL {} keys, {} existed", keys.len(), removed);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ExistenceChecker for RedisCache {
    async fn exists(&self, ctx: &OpContext, key: &str) -> Result<bool, CacheError> {
        ctx.run(async {
            let mut conn = self.conn().await?;
            let n: i64 = redis::cmd("EXISTS")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(key, e))?;
            Ok(n > 0)
        })
        .await
    }
}

#[async_trait]
impl Incrementer for RedisCache {
    async fn increment(
        &self,
        ctx: &OpContext,
        key: &str,
        ttl: Duration,
    ) -> Result<i64, CacheError> {
        ctx.run(async {
            let mut conn = self.conn().await?;
            let count: i64 = redis::cmd("EVAL")
                .arg(INCR_WITH_TTL)
                .arg(1)
                .arg(key)
                .arg(expiry_ms(ttl).unwrap_or(0))
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(key, e))?;
            Ok(count)
        })
        .await
    }
}

#[async_trait]
impl HealthCheck for RedisCache {
    async fn ping(&self, ctx: &OpContext) -> Result<(), CacheError> {
        ctx.run(async {
            let mut conn = self.conn().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
