//! # Chat Shared
//! 
//! Configuration, telemetry, and constants shared by the chat cache crates.

pub mod constants;
pub mod telemetry;
pub mod config;
pub mod error;

pub use config::{AppConfig, CacheSettings, RedisSettings};
pub use error::AppError;
