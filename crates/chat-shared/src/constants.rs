//! Application-wide constants

/// Session lifetime when the caller does not pick one.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
/// Presence expires this long after the last status write.
pub const DEFAULT_PRESENCE_TTL_SECS: u64 = 24 * 60 * 60;
/// Upper bound on conversation list staleness.
pub const DEFAULT_CONVERSATION_LIST_TTL_SECS: u64 = 5 * 60;
/// Unread counters evaporate after this much inactivity.
pub const DEFAULT_UNREAD_TTL_SECS: u64 = 24 * 60 * 60;
/// Upper bound accepted for any configured TTL.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_REDIS_MAX_CONNECTIONS: u32 = 16;
pub const DEFAULT_REDIS_CONNECT_TIMEOUT_MS: u64 = 500;

pub const SESSION_KEY_PREFIX: &str = "session:";
pub const PRESENCE_KEY_PREFIX: &str = "user:status:";
pub const CONVERSATION_LIST_KEY_PREFIX: &str = "user:conversations:";
pub const UNREAD_KEY_SEGMENT: &str = ":unread:";
