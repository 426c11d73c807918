//! Cache capability ports
//!
//! Components depend only on the operations they use. Adapters (in-memory,
//! Redis) implement all of them; `CacheStore` names the full set.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::context::OpContext;
use crate::error::CacheError;

pub use memory::MemoryStore;

#[async_trait]
pub trait Getter: Send + Sync {
    /// Raw bytes at `key`, or `NotFound` when absent or expired.
    async fn get_raw(&self, ctx: &OpContext, key: &str) -> Result<Vec<u8>, CacheError>;
}

#[async_trait]
pub trait Setter: Send + Sync {
    /// Atomic overwrite. A zero `ttl` stores without expiry.
    async fn set_raw(
        &self,
        ctx: &OpContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError>;
}

#[async_trait]
pub trait Deleter: Send + Sync {
    /// Removes every key in `keys`. Absent keys are not an error.
    async fn delete(&self, ctx: &OpContext, keys: &[String]) -> Result<(), CacheError>;
}

#[async_trait]
pub trait ExistenceChecker: Send + Sync {
    async fn exists(&self, ctx: &OpContext, key: &str) -> Result<bool, CacheError>;
}

#[async_trait]
pub trait Incrementer: Send + Sync {
    /// Atomically adds 1 (absent counts as 0) and sets the expiry to `ttl` in
    /// the same step. Returns the new value.
    async fn increment(&self, ctx: &OpContext, key: &str, ttl: Duration)
        -> Result<i64, CacheError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self, ctx: &OpContext) -> Result<(), CacheError>;
}

/// Every capability at once.
pub trait CacheStore: Getter + Setter + Deleter + ExistenceChecker + Incrementer + HealthCheck {}

impl<T> CacheStore for T where
    T: Getter + Setter + Deleter + ExistenceChecker + Incrementer + HealthCheck
{
}

/// Reads `key` and decodes it as JSON.
pub async fn get_json<T, S>(store: &S, ctx: &OpContext, key: &str) -> Result<T, CacheError>
where
    T: DeserializeOwned,
    S: Getter + ?Sized,
{
    let raw = store.get_raw(ctx, key).await?;
    serde_json::from_slice(&raw).map_err(|e| CacheError::Decode(format!("{key}: {e}")))
}

/// Encodes `value` as JSON and stores it under `key`.
pub async fn set_json<T, S>(
    store: &S,
    ctx: &OpContext,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError>
where
    T: Serialize + Sync + ?Sized,
    S: Setter + ?Sized,
{
    let raw = serde_json::to_vec(value).map_err(|e| CacheError::Encode(format!("{key}: {e}")))?;
    store.set_raw(ctx, key, raw, ttl).await
}

/// Parses the decimal form shared by `set_json(0)` and store-side increments.
pub(crate) fn parse_counter(key: &str, raw: &[u8]) -> Result<i64, CacheError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| CacheError::Decode(format!("{key}: not an integer counter")))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        let p = Profile { name: "ayu".into(), age: 30 };

        set_json(&store, &ctx, "p:1", &p, Duration::from_secs(60)).await.unwrap();
        let back: Profile = get_json(&store, &ctx, "p:1").await.unwrap();
        assert_eq!(back, p);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_decode_error() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        set_json(&store, &ctx, "p:1", "just a string", Duration::from_secs(60))
            .await
            .unwrap();

        let res: Result<Profile, _> = get_json(&store, &ctx, "p:1").await;
        assert!(matches!(res, Err(CacheError::Decode(_))));
    }

    #[tokio::test]
    async fn test_zero_written_as_json_is_a_counter() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        set_json(&store, &ctx, "n", &0i64, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.increment(&ctx, "n", Duration::from_secs(60)).await, Ok(1));
        assert_eq!(parse_counter("n", b" 12 "), Ok(12));
        assert!(parse_counter("n", b"\"x\"").is_err());
    }
}
