//! Cache components and the flows that keep them in step

pub mod session_registry;
pub mod presence_tracker;
pub mod conversation_cache;
pub mod unread_counter;
pub mod chat_sync;
pub mod conversation_list;

pub use session_registry::SessionRegistry;
pub use presence_tracker::PresenceTracker;
pub use conversation_cache::ConversationListCache;
pub use unread_counter::UnreadCounter;
pub use chat_sync::{ChatSyncService, SyncReport};
pub use conversation_list::ConversationListService;
