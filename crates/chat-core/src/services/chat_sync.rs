// ============================================================================
// Chat Core - Chat Sync Service
// File: crates/chat-core/src/services/chat_sync.rs
// Description: Keeps unread counters and conversation lists in step with
//              message delivery, reads, and membership changes
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use chat_shared::CacheSettings;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::cache::{Deleter, Getter, Incrementer, Setter};
use crate::context::OpContext;
use crate::domain::{ConversationId, UserId};
use crate::error::CacheError;
use crate::services::conversation_cache::ConversationListCache;
use crate::services::unread_counter::UnreadCounter;

/// What a sync step managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub counters_incremented: usize,
    pub counters_reset: usize,
    pub lists_invalidated: usize,
    /// Some step was skipped because the store was unreachable.
    pub degraded: bool,
}

/// Entry points called by the message and read paths after their
/// authoritative writes commit.
///
/// A store outage never fails a sync step; the report is marked degraded and
/// list staleness falls back to the TTL bound. Cancellation, deadline, and
/// decode errors propagate.
pub struct ChatSyncService<S> {
    unread: UnreadCounter<S>,
    lists: ConversationListCache<S>,
}

impl<S> ChatSyncService<S>
where
    S: Getter + Setter + Deleter + Incrementer,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            unread: UnreadCounter::new(store.clone()),
            lists: ConversationListCache::new(store),
        }
    }

    pub fn from_settings(store: Arc<S>, settings: &CacheSettings) -> Self {
        Self {
            unread: UnreadCounter::from_settings(store.clone(), settings),
            lists: ConversationListCache::from_settings(store, settings),
        }
    }

    pub fn unread(&self) -> &UnreadCounter<S> {
        &self.unread
    }

    pub fn lists(&self) -> &ConversationListCache<S> {
        &self.lists
    }

    /// One new message: +1 for every participant except the sender, and every
    /// participant's list is dropped. Call once per message, never on retry.
    pub async fn on_message_delivered(
        &self,
        ctx: &OpContext,
        conversation: &ConversationId,
        sender: UserId,
        participants: &[UserId],
    ) -> Result<SyncReport, CacheError> {
        let members = dedup(participants);
        let recipients: Vec<UserId> = members.iter().copied().filter(|u| *u != sender).collect();

        let mut report = SyncReport::default();
        let mut failure = None;

        let results = join_all(
            recipients
                .iter()
                .map(|user| self.unread.increment(ctx, *user, conversation)),
        )
        .await;
        for res in results {
            match res {
                Ok(_) => report.counters_incremented += 1,
                Err(e) => absorb(e, "unread increment", &mut report, &mut failure),
            }
        }
        if let Some(e) = failure.as_ref().filter(|e| e.is_cancellation()) {
            return Err(e.clone());
        }

        match self.lists.invalidate(ctx, &members).await {
            Ok(()) => report.lists_invalidated = members.len(),
            Err(e) => absorb(e, "conversation list invalidation", &mut report, &mut failure),
        }

        finish(report, failure)
    }

    /// `reader` has read `conversation` up to the latest message.
    pub async fn on_conversation_read(
        &self,
        ctx: &OpContext,
        reader: UserId,
        conversation: &ConversationId,
    ) -> Result<SyncReport, CacheError> {
        let mut report = SyncReport::default();
        let mut failure = None;

        match self.unread.reset(ctx, reader, conversation).await {
            Ok(()) => report.counters_reset = 1,
            Err(e) => absorb(e, "unread reset", &mut report, &mut failure),
        }
        if let Some(e) = failure.as_ref().filter(|e| e.is_cancellation()) {
            return Err(e.clone());
        }

        match self.lists.invalidate(ctx, &[reader]).await {
            Ok(()) => report.lists_invalidated = 1,
            Err(e) => absorb(e, "conversation list invalidation", &mut report, &mut failure),
        }

        finish(report, failure)
    }

    /// A group was created, joined, or left, or a direct chat was opened.
    pub async fn on_membership_changed(
        &self,
        ctx: &OpContext,
        users: &[UserId],
    ) -> Result<SyncReport, CacheError> {
        let users = dedup(users);
        let mut report = SyncReport::default();
        let mut failure = None;

        match self.lists.invalidate(ctx, &users).await {
            Ok(()) => report.lists_invalidated = users.len(),
            Err(e) => absorb(e, "conversation list invalidation", &mut report, &mut failure),
        }
        if report.lists_invalidated > 0 {
            info!("Membership change invalidated {} conversation lists", report.lists_invalidated);
        }

        finish(report, failure)
    }
}

fn dedup(users: &[UserId]) -> Vec<UserId> {
    let mut seen = HashSet::with_capacity(users.len());
    users.iter().copied().filter(|u| seen.insert(*u)).collect()
}

/// Outages degrade the report; anything else is kept to return (first wins).
fn absorb(e: CacheError, step: &str, report: &mut SyncReport, failure: &mut Option<CacheError>) {
    match &e {
        CacheError::StoreUnavailable(msg) => {
            warn!("Skipping {} while cache is unavailable: {}", step, msg);
            report.degraded = true;
            return;
        }
        CacheError::Decode(msg) => error!("{} hit undecodable value: {}", step, msg),
        e if e.is_cancellation() => debug!("{} abandoned: {}", step, e),
        _ => {}
    }
    if failure.is_none() {
        *failure = Some(e);
    }
}

fn finish(report: SyncReport, failure: Option<CacheError>) -> Result<SyncReport, CacheError> {
    match failure {
        Some(e) => Err(e),
        None => Ok(report),
    }
}
