// ============================================================================
// Chat Core - Conversation List Cache
// File: crates/chat-core/src/services/conversation_cache.rs
// ============================================================================
//! Per-user memoized conversation list (cache-aside, bounded staleness)

use std::sync::Arc;
use std::time::Duration;

use chat_shared::{constants::DEFAULT_CONVERSATION_LIST_TTL_SECS, CacheSettings};
use tracing::debug;

use crate::cache::{get_json, set_json, Deleter, Getter, Setter};
use crate::context::OpContext;
use crate::domain::{ConversationSummary, UserId};
use crate::error::CacheError;
use crate::keys;

/// A missed invalidation leaves a list stale for at most `ttl`.
/// `NotFound` means "recompute", never "empty".
pub struct ConversationListCache<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> ConversationListCache<S>
where
    S: Getter + Setter + Deleter,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(DEFAULT_CONVERSATION_LIST_TTL_SECS),
        }
    }

    pub fn from_settings(store: Arc<S>, settings: &CacheSettings) -> Self {
        Self {
            store,
            ttl: settings.conversation_list_ttl(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn put(
        &self,
        ctx: &OpContext,
        user: UserId,
        conversations: &[ConversationSummary],
    ) -> Result<(), CacheError> {
        self.put_with_ttl(ctx, user, conversations, self.ttl).await
    }

    pub async fn put_with_ttl(
        &self,
        ctx: &OpContext,
        user: UserId,
        conversations: &[ConversationSummary],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        set_json(
            self.store.as_ref(),
            ctx,
            &keys::conversation_list(user),
            conversations,
            ttl,
        )
        .await?;
        debug!("Cached {} conversations for user {}", conversations.len(), user);
        Ok(())
    }

    pub async fn get(
        &self,
        ctx: &OpContext,
        user: UserId,
    ) -> Result<Vec<ConversationSummary>, CacheError> {
        get_json(self.store.as_ref(), ctx, &keys::conversation_list(user)).await
    }

    /// Drops the cached lists of `users` in one store call.
    pub async fn invalidate(&self, ctx: &OpContext, users: &[UserId]) -> Result<(), CacheError> {
        if users.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = users.iter().map(|u| keys::conversation_list(*u)).collect();
        self.store.delete(ctx, &keys).await?;
        debug!("Invalidated conversation lists for {} users", users.len());
        Ok(())
    }
}
