use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 会话记录，令牌既是存储键也作为字段自描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: Uuid,
}
