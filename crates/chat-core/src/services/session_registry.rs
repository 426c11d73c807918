// ============================================================================
// Chat Core - Session Registry
// File: crates/chat-core/src/services/session_registry.rs
// ============================================================================
//! Session id to user id mapping with TTL expiry

use std::sync::Arc;
use std::time::Duration;

use chat_shared::{constants::DEFAULT_SESSION_TTL_SECS, CacheSettings};
use tracing::{debug, error, info};

use crate::cache::{get_json, set_json, Deleter, Getter, Setter};
use crate::context::OpContext;
use crate::domain::{Session, SessionId, UserId};
use crate::error::CacheError;
use crate::keys;

/// Sessions live only in the cache. Expiry is the store's TTL.
pub struct SessionRegistry<S> {
    store: Arc<S>,
    default_ttl: Duration,
}

impl<S> SessionRegistry<S>
where
    S: Getter + Setter + Deleter,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            default_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }

    pub fn from_settings(store: Arc<S>, settings: &CacheSettings) -> Self {
        Self {
            store,
            default_ttl: settings.session_ttl(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Stores `user` under `id`, replacing any earlier session with that id.
    pub async fn create_session(
        &self,
        ctx: &OpContext,
        id: &SessionId,
        user: UserId,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        set_json(self.store.as_ref(), ctx, &keys::session(id), &user, ttl).await?;
        debug!("Session created for user {}", user);
        Ok(())
    }

    /// Issues a fresh session id for `user` with the default TTL.
    pub async fn open_session(&self, ctx: &OpContext, user: UserId) -> Result<Session, CacheError> {
        let session = Session::new(user, self.default_ttl);
        self.create_session(ctx, &session.id, user, self.default_ttl)
            .await?;
        info!("Opened session for user {}", user);
        Ok(session)
    }

    /// Wholesale overwrite with a new default-length TTL.
    pub async fn refresh_session(
        &self,
        ctx: &OpContext,
        id: &SessionId,
        user: UserId,
    ) -> Result<(), CacheError> {
        self.create_session(ctx, id, user, self.default_ttl).await
    }

    /// `SessionNotFound` means the same as never having logged in.
    pub async fn resolve_session(
        &self,
        ctx: &OpContext,
        id: &SessionId,
    ) -> Result<UserId, CacheError> {
        match get_json::<UserId, _>(self.store.as_ref(), ctx, &keys::session(id)).await {
            Ok(user) => Ok(user),
            Err(CacheError::NotFound) => Err(CacheError::SessionNotFound),
            Err(CacheError::Decode(msg)) => {
                error!("Session payload does not decode: {}", msg);
                Err(CacheError::Decode(msg))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn invalidate_session(&self, ctx: &OpContext, id: &SessionId) -> Result<(), CacheError> {
        self.store.delete(ctx, &[keys::session(id)]).await?;
        debug!("Session invalidated");
        Ok(())
    }
}
