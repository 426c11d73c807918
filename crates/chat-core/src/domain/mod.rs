//! # Chat Core - Domain Module
//! 
//! Identifiers and cache-resident entities of the chat backend.

pub mod ids;
pub mod presence;
pub mod conversation;
pub mod session;

pub use ids::{ConversationId, SessionId, UserId};
pub use presence::PresenceStatus;
pub use conversation::ConversationSummary;
pub use session::Session;
