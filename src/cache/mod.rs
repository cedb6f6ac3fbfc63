// 缓存模块
// 用户快照缓存和会话存储，均为带 TTL 的键值存储

pub mod keys;
pub mod memory;
pub mod operations;

use thiserror::Error;

use crate::context::ContextError;

pub use memory::{MemoryKv, MemorySessionStore, MemoryUserCache};
pub use operations::session::{RedisSessionStore, SessionError, SessionStore};
pub use operations::user::{RedisUserCache, UserCache};

/// 缓存传输或序列化失败；调用方把它当作未命中处理
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Context(#[from] ContextError),
}
