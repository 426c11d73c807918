// ============================================================================
// Chat Core - Conversation Summary
// File: crates/chat-core/src/domain/conversation.rs
// Description: Denormalized conversation row shown in a user's chat list
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, UserId};

/// Conversation summary as read from the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,

    /// Two users for a direct chat, all members for a group.
    pub participants: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,

    // Last message info
    pub last_message_id: Option<String>,
    pub last_message_text: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_sender_id: Option<UserId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSummary {
    pub fn direct(id: ConversationId, a: UserId, b: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            participants: vec![a, b],
            group_id: None,
            last_message_id: None,
            last_message_text: String::new(),
            last_message_at: None,
            last_sender_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn group(id: ConversationId, group_id: u64, members: Vec<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            participants: members,
            group_id: Some(group_id),
            last_message_id: None,
            last_message_text: String::new(),
            last_message_at: None,
            last_sender_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_group(&self) -> bool {
        self.group_id.is_some()
    }

    pub fn has_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    /// Advances the last-message pointer.
    pub fn record_message(&mut self, message_id: String, sender: UserId, text: String) {
        let now = Utc::now();
        self.last_message_id = Some(message_id);
        self.last_sender_id = Some(sender);
        self.last_message_text = text;
        self.last_message_at = Some(now);
        self.updated_at = now;
    }
}
