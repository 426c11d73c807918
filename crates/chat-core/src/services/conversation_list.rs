//! Cache-aside conversation list reads
//!
//! The cache is an optimization only. Misses, undecodable entries, and store
//! outages all fall through to the repository.

use std::sync::Arc;

use chat_shared::CacheSettings;
use tracing::{debug, error, warn};

use crate::cache::{Deleter, Getter, Setter};
use crate::context::OpContext;
use crate::domain::{ConversationSummary, UserId};
use crate::error::{CacheError, DomainError};
use crate::repositories::ConversationRepository;
use crate::services::conversation_cache::ConversationListCache;

pub struct ConversationListService<S, R> {
    cache: ConversationListCache<S>,
    repo: Arc<R>,
}

impl<S, R> ConversationListService<S, R>
where
    S: Getter + Setter + Deleter,
    R: ConversationRepository,
{
    pub fn new(store: Arc<S>, repo: Arc<R>) -> Self {
        Self {
            cache: ConversationListCache::new(store),
            repo,
        }
    }

    pub fn from_settings(store: Arc<S>, repo: Arc<R>, settings: &CacheSettings) -> Self {
        Self {
            cache: ConversationListCache::from_settings(store, settings),
            repo,
        }
    }

    pub async fn conversations_for(
        &self,
        ctx: &OpContext,
        user: UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        let repopulate = match self.cache.get(ctx, user).await {
            Ok(list) => return Ok(list),
            Err(CacheError::NotFound) => {
                debug!("Conversation list miss for user {}", user);
                true
            }
            Err(CacheError::Decode(msg)) => {
                error!("Cached conversation list for user {} is corrupt: {}", user, msg);
                true
            }
            Err(CacheError::StoreUnavailable(msg)) => {
                warn!("Cache unavailable, reading conversations from store: {}", msg);
                false
            }
            Err(e) => {
                debug!("Conversation list read for user {} abandoned: {}", user, e);
                return Err(e.into());
            }
        };

        let list = self.repo.list_for_user(user).await?;
        if repopulate {
            if let Err(e) = self.cache.put(ctx, user, &list).await {
                warn!("Could not repopulate conversation list for user {}: {}", user, e);
            }
        }
        Ok(list)
    }

    /// Recompute from the repository and overwrite the cached copy.
    pub async fn refresh(
        &self,
        ctx: &OpContext,
        user: UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        let list = self.repo.list_for_user(user).await?;
        match self.cache.put(ctx, user, &list).await {
            Ok(()) => {}
            Err(CacheError::StoreUnavailable(msg)) => {
                warn!("Cache unavailable, refresh not stored: {}", msg);
            }
            Err(e) => {
                debug!("Conversation list refresh for user {} abandoned: {}", user, e);
                return Err(e.into());
            }
        }
        Ok(list)
    }
}
