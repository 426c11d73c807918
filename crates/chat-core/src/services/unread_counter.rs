// ============================================================================
// Chat Core - Unread Counter
// File: crates/chat-core/src/services/unread_counter.rs
// ============================================================================
//! Per (user, conversation) unread message counter
//!
//! Absent counters read as zero. Every mutation renews the TTL, so counters
//! for conversations nobody touches evaporate after the horizon.
//!
//! `reset` writes `0` with a fresh TTL rather than deleting the key. The two
//! differ only to `exists`, which nothing in this layer consults.
//!
//! Increments are not deduplicated: a redelivered message counts twice.
//! Excluding the sender and suppressing retries is the delivery path's job.

use std::sync::Arc;
use std::time::Duration;

use chat_shared::{constants::DEFAULT_UNREAD_TTL_SECS, CacheSettings};
use tracing::{debug, error};

use crate::cache::{parse_counter, set_json, Getter, Incrementer, Setter};
use crate::context::OpContext;
use crate::domain::{ConversationId, UserId};
use crate::error::CacheError;
use crate::keys;

pub struct UnreadCounter<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> UnreadCounter<S>
where
    S: Getter + Setter + Incrementer,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(DEFAULT_UNREAD_TTL_SECS),
        }
    }

    pub fn from_settings(store: Arc<S>, settings: &CacheSettings) -> Self {
        Self {
            store,
            ttl: settings.unread_ttl(),
        }
    }

    /// Atomic +1. Returns the new count.
    pub async fn increment(
        &self,
        ctx: &OpContext,
        user: UserId,
        conversation: &ConversationId,
    ) -> Result<i64, CacheError> {
        let count = self
            .store
            .increment(ctx, &keys::unread(user, conversation), self.ttl)
            .await?;
        debug!("Unread for user {} in {} is now {}", user, conversation, count);
        Ok(count)
    }

    pub async fn get(
        &self,
        ctx: &OpContext,
        user: UserId,
        conversation: &ConversationId,
    ) -> Result<i64, CacheError> {
        let key = keys::unread(user, conversation);
        let raw = match self.store.get_raw(ctx, &key).await {
            Ok(raw) => raw,
            Err(CacheError::NotFound) => return Ok(0),
            Err(e) => return Err(e),
        };
        match parse_counter(&key, &raw) {
            Ok(n) if n >= 0 => Ok(n),
            Ok(n) => {
                error!("Negative unread counter {} at {}", n, key);
                Err(CacheError::Decode(format!("{key}: negative counter {n}")))
            }
            Err(e) => {
                error!("Unread counter does not decode: {}", e);
                Err(e)
            }
        }
    }

    /// Counts for several conversations of one user, in input order.
    pub async fn get_many(
        &self,
        ctx: &OpContext,
        user: UserId,
        conversations: &[ConversationId],
    ) -> Result<Vec<(ConversationId, i64)>, CacheError> {
        let mut out = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let count = self.get(ctx, user, conversation).await?;
            out.push((conversation.clone(), count));
        }
        Ok(out)
    }

    pub async fn reset(
        &self,
        ctx: &OpContext,
        user: UserId,
        conversation: &ConversationId,
    ) -> Result<(), CacheError> {
        set_json(
            self.store.as_ref(),
            ctx,
            &keys::unread(user, conversation),
            &0i64,
            self.ttl,
        )
        .await?;
        debug!("Unread for user {} in {} reset", user, conversation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    fn counter() -> (Arc<MemoryStore>, UnreadCounter<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), UnreadCounter::new(store))
    }

    #[tokio::test]
    async fn test_absent_counter_reads_zero() {
        let (_, unread) = counter();
        let ctx = OpContext::background();
        assert_eq!(unread.get(&ctx, UserId(1), &"c".into()).await, Ok(0));
    }

    #[tokio::test]
    async fn test_increment_then_reset() {
        let (store, unread) = counter();
        let ctx = OpContext::background();
        let conv = ConversationId::from("c");

        for expected in 1..=3 {
            assert_eq!(unread.increment(&ctx, UserId(1), &conv).await, Ok(expected));
        }
        assert_eq!(unread.get(&ctx, UserId(1), &conv).await, Ok(3));

        unread.reset(&ctx, UserId(1), &conv).await.unwrap();
        assert_eq!(unread.get(&ctx, UserId(1), &conv).await, Ok(0));
        // Reset keeps the key with a fresh TTL.
        assert_eq!(
            store.ttl_remaining(&keys::unread(UserId(1), &conv)),
            Some(Duration::from_secs(DEFAULT_UNREAD_TTL_SECS))
        );

        assert_eq!(unread.increment(&ctx, UserId(1), &conv).await, Ok(1));
    }

    #[tokio::test]
    async fn test_counters_are_per_user_and_conversation() {
        let (_, unread) = counter();
        let ctx = OpContext::background();
        let a = ConversationId::from("a");
        let b = ConversationId::from("b");

        unread.increment(&ctx, UserId(1), &a).await.unwrap();
        unread.increment(&ctx, UserId(1), &a).await.unwrap();
        unread.increment(&ctx, UserId(2), &a).await.unwrap();

        let counts = unread
            .get_many(&ctx, UserId(1), &[a.clone(), b.clone()])
            .await
            .unwrap();
        assert_eq!(counts, vec![(a.clone(), 2), (b, 0)]);
        assert_eq!(unread.get(&ctx, UserId(2), &a).await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_counter_evaporates() {
        let (_, unread) = counter();
        let ctx = OpContext::background();
        let conv = ConversationId::from("c");
        unread.increment(&ctx, UserId(1), &conv).await.unwrap();

        tokio::time::advance(Duration::from_secs(DEFAULT_UNREAD_TTL_SECS)).await;
        assert_eq!(unread.get(&ctx, UserId(1), &conv).await, Ok(0));
    }

    #[tokio::test]
    async fn test_garbage_counter_is_decode_error() {
        let (store, unread) = counter();
        let ctx = OpContext::background();
        let conv = ConversationId::from("c");
        store
            .set_raw(&ctx, &keys::unread(UserId(1), &conv), b"-4".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            unread.get(&ctx, UserId(1), &conv).await,
            Err(CacheError::Decode(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_senders_are_all_counted() {
        let (_, unread) = counter();
        let unread = Arc::new(unread);
        let conv = ConversationId::from("busy");

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let unread = unread.clone();
                let conv = conv.clone();
                tokio::spawn(async move {
                    unread
                        .increment(&OpContext::with_timeout(Duration::from_secs(5)), UserId(1), &conv)
                        .await
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(unread.get(&OpContext::background(), UserId(1), &conv).await, Ok(200));
    }
}
