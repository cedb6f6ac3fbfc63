/// 缓存操作
/// 能力接口及其 Redis 实现

// 用户快照缓存
pub mod user;

// 会话存储
pub mod session;

pub use session::{RedisSessionStore, SessionError, SessionStore};
pub use user::{RedisUserCache, UserCache};
