//! # Chat Infrastructure
//! 
//! Cache store adapters.

pub mod cache;

pub use cache::{create_pool, RedisCache};
