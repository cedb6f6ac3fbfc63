/// 会话键前缀
const SESSION_PREFIX: &str = "api-session:";

pub fn session_key(token: &str) -> String {
    format!("{}{}", SESSION_PREFIX, token)
}
