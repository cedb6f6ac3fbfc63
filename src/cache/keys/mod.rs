/// 缓存键模块
/// 所有键都带固定前缀，避免与同一 Redis 实例里的其他数据冲突

pub mod session_keys;
pub mod user_keys;

pub use session_keys::session_key;
pub use user_keys::user_info_key;
