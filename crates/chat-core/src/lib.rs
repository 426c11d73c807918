//! # Chat Core
//! 
//! Cache synchronization layer of the chat backend: sessions, presence,
//! conversation lists, and unread counters over a narrow key-value port.

pub mod cache;
pub mod context;
pub mod domain;
pub mod error;
pub mod keys;
pub mod repositories;
pub mod services;

pub use cache::{CacheStore, MemoryStore};
pub use context::OpContext;
pub use domain::*;
pub use error::{CacheError, DomainError};
pub use services::*;
