//! Repository traits (ports)

pub mod conversation_repository;

pub use conversation_repository::ConversationRepository;

#[cfg(test)]
pub use conversation_repository::MockConversationRepository;
