use uuid::Uuid;

/// 用户快照缓存键前缀
const USER_INFO_PREFIX: &str = "api-user:";

/// 生成用户快照缓存键
pub fn user_info_key(user_id: Uuid) -> String {
    format!("{}{}", USER_INFO_PREFIX, user_id)
}
