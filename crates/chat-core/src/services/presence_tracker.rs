//! User presence with a fixed horizon per write
//!
//! Values are the bare status word (`online`, `offline`, `away`), not JSON.

use std::sync::Arc;
use std::time::Duration;

use chat_shared::{constants::DEFAULT_PRESENCE_TTL_SECS, CacheSettings};
use tracing::{debug, error};

use crate::cache::{Getter, Setter};
use crate::context::OpContext;
use crate::domain::{PresenceStatus, UserId};
use crate::error::CacheError;
use crate::keys;

/// Each write replaces the TTL, so presence lapses exactly one horizon after
/// the last update. `NotFound` means unknown, not offline; mapping it to a
/// display value is the caller's call.
pub struct PresenceTracker<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> PresenceTracker<S>
where
    S: Getter + Setter,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(DEFAULT_PRESENCE_TTL_SECS),
        }
    }

    pub fn from_settings(store: Arc<S>, settings: &CacheSettings) -> Self {
        Self {
            store,
            ttl: settings.presence_ttl(),
        }
    }

    pub async fn set_status(
        &self,
        ctx: &OpContext,
        user: UserId,
        status: PresenceStatus,
    ) -> Result<(), CacheError> {
        let value = status.as_str().as_bytes().to_vec();
        self.store
            .set_raw(ctx, &keys::presence(user), value, self.ttl)
            .await?;
        debug!("Presence of user {} set to {}", user, status);
        Ok(())
    }

    pub async fn get_status(&self, ctx: &OpContext, user: UserId) -> Result<PresenceStatus, CacheError> {
        let key = keys::presence(user);
        let raw = self.store.get_raw(ctx, &key).await?;
        decode_status(&key, &raw).inspect_err(|e| error!("Presence payload does not decode: {}", e))
    }
}

fn decode_status(key: &str, raw: &[u8]) -> Result<PresenceStatus, CacheError> {
    std::str::from_utf8(raw)
        .map_err(|e| CacheError::Decode(format!("{key}: {e}")))?
        .parse()
        .map_err(|e| CacheError::Decode(format!("{key}: {e}")))
}
