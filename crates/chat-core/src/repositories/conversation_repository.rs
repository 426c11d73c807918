//! Conversation repository trait (port)

use async_trait::async_trait;

use crate::domain::{ConversationSummary, UserId};
use crate::error::DomainError;

/// Authoritative conversation membership, backed by the document store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Every conversation `user` participates in, most recent activity first.
    async fn list_for_user(&self, user: UserId) -> Result<Vec<ConversationSummary>, DomainError>;
}
