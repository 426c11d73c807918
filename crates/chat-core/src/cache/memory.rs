//! In-process cache store
//!
//! DashMap-backed store with lazy expiry. Stands in for Redis in tests and
//! in single-process deployments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::{parse_counter, Deleter, ExistenceChecker, Getter, HealthCheck, Incrementer, Setter};
use crate::context::OpContext;
use crate::error::CacheError;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>, // None = no expiry
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            expires_at: expiry(ttl, now),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// A TTL too large to represent as an instant never expires.
fn expiry(ttl: Duration, now: Instant) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        now.checked_add(ttl)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    map: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.map.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time left on a live key. `None` if absent, expired, or without expiry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entry = self.map.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        entry.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.map.len();
        self.map.retain(|_, e| !e.is_expired(now));
        let removed = before.saturating_sub(self.map.len());
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    /// Physical entry count, expired ones included.
    pub fn raw_len(&self) -> usize {
        self.map.len()
    }

    /// Background loop that purges expired entries every `every`. Keys that
    /// are never read again would otherwise stay in the map. Abort the handle
    /// to stop it.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        info!("Starting cache sweeper (interval: {:?})", every);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.purge_expired();
            }
        })
    }

    fn read(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        {
            let entry = self.map.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        self.map.remove_if(key, |_, e| e.is_expired(now));
        None
    }
}

#[async_trait]
impl Getter for MemoryStore {
    async fn get_raw(&self, ctx: &OpContext, key: &str) -> Result<Vec<u8>, CacheError> {
        ctx.run(async { self.read(key).ok_or(CacheError::NotFound) })
            .await
    }
}

#[async_trait]
impl Setter for MemoryStore {
    async fn set_raw(
        &self,
        ctx: &OpContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        ctx.run(async {
            self.map
                .insert(key.to_string(), Entry::new(value, ttl, Instant::now()));
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Deleter for MemoryStore {
    async fn delete(&self, ctx: &OpContext, keys: &[String]) -> Result<(), CacheError> {
        ctx.run(async {
            for key in keys {
                self.map.remove(key);
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ExistenceChecker for MemoryStore {
    async fn exists(&self, ctx: &OpContext, key: &str) -> Result<bool, CacheError> {
        ctx.run(async {
            let now = Instant::now();
            let live = match self.map.get(key) {
                Some(entry) => !entry.is_expired(now),
                None => return Ok(false),
            };
            if !live {
                self.map.remove_if(key, |_, e| e.is_expired(now));
            }
            Ok(live)
        })
        .await
    }
}

#[async_trait]
impl Incrementer for MemoryStore {
    async fn increment(
        &self,
        ctx: &OpContext,
        key: &str,
        ttl: Duration,
    ) -> Result<i64, CacheError> {
        ctx.run(async {
            let now = Instant::now();
            // The entry guard holds the shard lock for the whole read-modify-write.
            let mut entry = self
                .map
                .entry(key.to_string())
                .or_insert_with(|| Entry::new(b"0".to_vec(), ttl, now));
            let current = if entry.is_expired(now) {
                0
            } else {
                parse_counter(key, &entry.value)?
            };
            let next = current
                .checked_add(1)
                .ok_or_else(|| CacheError::Decode(format!("{key}: counter overflow")))?;
            entry.value = next.to_string().into_bytes();
            entry.expires_at = expiry(ttl, now);
            Ok(next)
        })
        .await
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self, ctx: &OpContext) -> Result<(), CacheError> {
        ctx.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        store.set_raw(&ctx, "k", b"v1".to_vec(), MINUTE).await.unwrap();
        assert_eq!(store.get_raw(&ctx, "k").await.unwrap(), b"v1");

        store.set_raw(&ctx, "k", b"v2".to_vec(), MINUTE).await.unwrap();
        assert_eq!(store.get_raw(&ctx, "k").await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_unwritten_key_is_not_found() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        assert_eq!(store.get_raw(&ctx, "nope").await, Err(CacheError::NotFound));
        assert_eq!(store.exists(&ctx, "nope").await, Ok(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_key_is_indistinguishable_from_absent() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        store.set_raw(&ctx, "k", b"v".to_vec(), MINUTE).await.unwrap();
        assert_eq!(store.exists(&ctx, "k").await, Ok(true));

        tokio::time::advance(MINUTE).await;

        assert_eq!(store.get_raw(&ctx, "k").await, Err(CacheError::NotFound));
        assert_eq!(store.exists(&ctx, "k").await, Ok(false));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        store.set_raw(&ctx, "k", b"v".to_vec(), Duration::ZERO).await.unwrap();
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(store.get_raw(&ctx, "k").await.is_ok());
        assert_eq!(store.ttl_remaining("k"), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_batched() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        for k in ["a", "b", "c"] {
            store.set_raw(&ctx, k, b"1".to_vec(), MINUTE).await.unwrap();
        }

        let keys = vec!["a".to_string(), "b".to_string(), "missing".to_string()];
        store.delete(&ctx, &keys).await.unwrap();
        store.delete(&ctx, &keys).await.unwrap();
        store.delete(&ctx, &[]).await.unwrap();

        assert_eq!(store.exists(&ctx, "a").await, Ok(false));
        assert_eq!(store.exists(&ctx, "b").await, Ok(false));
        assert_eq!(store.exists(&ctx, "c").await, Ok(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_initializes_and_renews_ttl() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        let ttl = Duration::from_secs(3600);

        assert_eq!(store.increment(&ctx, "n", ttl).await, Ok(1));
        tokio::time::advance(Duration::from_secs(1800)).await;
        assert_eq!(store.increment(&ctx, "n", ttl).await, Ok(2));
        assert_eq!(store.ttl_remaining("n"), Some(ttl));

        // Expired counters restart from zero.
        tokio::time::advance(ttl).await;
        assert_eq!(store.increment(&ctx, "n", ttl).await, Ok(1));
    }

    #[tokio::test]
    async fn test_increment_on_non_integer_is_decode_error() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        store.set_raw(&ctx, "n", b"\"online\"".to_vec(), MINUTE).await.unwrap();

        let res = store.increment(&ctx, "n", MINUTE).await;
        assert!(matches!(res, Err(CacheError::Decode(_))));
        assert_eq!(store.get_raw(&ctx, "n").await.unwrap(), b"\"online\"");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let n = 500;

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let ctx = OpContext::with_timeout(Duration::from_secs(5));
                    store.increment(&ctx, "hot", MINUTE).await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let ctx = OpContext::background();
        assert_eq!(store.get_raw(&ctx, "hot").await.unwrap(), n.to_string().into_bytes());
    }

    #[tokio::test]
    async fn test_cancelled_context_leaves_store_untouched() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        ctx.cancel();

        assert_eq!(
            store.set_raw(&ctx, "k", b"v".to_vec(), MINUTE).await,
            Err(CacheError::Cancelled)
        );
        assert_eq!(store.increment(&ctx, "n", MINUTE).await, Err(CacheError::Cancelled));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        store.set_raw(&ctx, "short", b"1".to_vec(), MINUTE).await.unwrap();
        store.set_raw(&ctx, "long", b"1".to_vec(), 10 * MINUTE).await.unwrap();

        tokio::time::advance(2 * MINUTE).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_stored_without_expiry() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        let forever = Duration::from_secs(u64::MAX);

        store.set_raw(&ctx, "k", b"v".to_vec(), forever).await.unwrap();
        assert_eq!(store.increment(&ctx, "n", forever).await, Ok(1));

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert_eq!(store.get_raw(&ctx, "k").await.unwrap(), b"v");
        assert_eq!(store.increment(&ctx, "n", forever).await, Ok(2));
        assert_eq!(store.ttl_remaining("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exists_drops_expired_entry() {
        let store = MemoryStore::new();
        let ctx = OpContext::background();
        store.set_raw(&ctx, "k", b"v".to_vec(), MINUTE).await.unwrap();

        tokio::time::advance(MINUTE).await;
        assert_eq!(store.exists(&ctx, "k").await, Ok(false));
        assert_eq!(store.raw_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_frees_unread_expired_keys() {
        let store = Arc::new(MemoryStore::new());
        let ctx = OpContext::background();
        for i in 0..1000 {
            store
                .set_raw(&ctx, &format!("k{i}"), b"1".to_vec(), Duration::from_secs(1))
                .await
                .unwrap();
        }
        store.set_raw(&ctx, "keep", b"1".to_vec(), Duration::ZERO).await.unwrap();

        let sweeper = store.spawn_sweeper(MINUTE);
        for _ in 0..60 {
            tokio::time::advance(MINUTE).await;
        }
        tokio::task::yield_now().await;

        assert_eq!(store.raw_len(), 1);
        assert_eq!(store.len(), 1);
        sweeper.abort();
    }
}
