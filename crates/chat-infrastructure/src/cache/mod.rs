//! Cache module (Redis adapter)

pub mod pool;
pub mod redis_cache;

pub use pool::create_pool;
pub use redis_cache::RedisCache;
