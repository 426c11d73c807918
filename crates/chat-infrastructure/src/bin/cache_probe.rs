//! Smoke test for a live cache deployment.
//!
//! Loads configuration the same way the backend does, pings Redis, then walks
//! one session / presence / delivery / read cycle under a throwaway user id and
//! cleans up after itself.

use std::sync::Arc;

use chat_core::cache::{Deleter, HealthCheck};
use chat_core::{
    keys, CacheError, ChatSyncService, ConversationId, OpContext, PresenceStatus, PresenceTracker,
    SessionRegistry, UserId,
};
use chat_infrastructure::RedisCache;
use chat_shared::{telemetry, AppConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let timeout = config.cache.operation_timeout();
    let ctx = || OpContext::with_timeout(timeout);

    info!("Connecting to cache at {}...", config.redis.url);
    let store = Arc::new(RedisCache::connect(&config.redis)?);
    store.ping(&ctx()).await?;
    info!("Cache reachable.");

    let sessions = SessionRegistry::from_settings(store.clone(), &config.cache);
    let presence = PresenceTracker::from_settings(store.clone(), &config.cache);
    let sync = ChatSyncService::from_settings(store.clone(), &config.cache);

    let user = UserId(u64::MAX - u64::from(std::process::id()));
    let peer = UserId(user.0 - 1);
    let conv = ConversationId::from(format!("probe-{}", std::process::id()));

    let session = sessions.open_session(&ctx(), user).await?;
    let resolved = sessions.resolve_session(&ctx(), &session.id).await?;
    info!(user = %resolved, "Session resolves");

    presence.set_status(&ctx(), user, PresenceStatus::Online).await?;
    let status = presence.get_status(&ctx(), user).await?;
    info!(%status, "Presence stored");

    let report = sync
        .on_message_delivered(&ctx(), &conv, peer, &[user, peer])
        .await?;
    if report.degraded {
        warn!("Delivery sync degraded: {:?}", report);
    }
    let unread = sync.unread().get(&ctx(), user, &conv).await?;
    info!(unread, "After delivery");

    sync.on_conversation_read(&ctx(), user, &conv).await?;
    let unread = sync.unread().get(&ctx(), user, &conv).await?;
    info!(unread, "After read");

    sessions.invalidate_session(&ctx(), &session.id).await?;
    match sessions.resolve_session(&ctx(), &session.id).await {
        Err(CacheError::SessionNotFound) => info!("Session invalidated"),
        other => warn!("Unexpected session state after logout: {:?}", other),
    }

    store
        .delete(
            &ctx(),
            &[
                keys::presence(user),
                keys::unread(user, &conv),
                keys::unread(peer, &conv),
            ],
        )
        .await?;
    info!("Probe finished.");
    Ok(())
}
