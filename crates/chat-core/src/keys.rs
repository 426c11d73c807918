//! Cache key namespaces
//!
//! Each logical family gets its own prefix. User ids are numeric, so
//! `user:status:*`, `user:conversations:*` and `user:{id}:unread:*` cannot
//! collide with each other, and `session:*` sits outside `user:*` entirely.

use chat_shared::constants::{
    CONVERSATION_LIST_KEY_PREFIX, PRESENCE_KEY_PREFIX, SESSION_KEY_PREFIX, UNREAD_KEY_SEGMENT,
};

use crate::domain::{ConversationId, SessionId, UserId};

pub fn session(id: &SessionId) -> String {
    format!("{SESSION_KEY_PREFIX}{id}")
}

pub fn presence(user: UserId) -> String {
    format!("{PRESENCE_KEY_PREFIX}{user}")
}

pub fn conversation_list(user: UserId) -> String {
    format!("{CONVERSATION_LIST_KEY_PREFIX}{user}")
}

pub fn unread(user: UserId, conversation: &ConversationId) -> String {
    format!("user:{user}{UNREAD_KEY_SEGMENT}{conversation}")
}
