use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use thiserror::Error;
use uuid::Uuid;

use crate::cache::CacheError;
use crate::cache::keys::session_key;
use crate::context::RequestContext;
use crate::models::Session;

/// 生成令牌时允许的碰撞重试次数
const MAX_TOKEN_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum SessionError {
    /// 令牌从未存在或已过期，两者不可区分
    #[error("session not found")]
    NotFound,
    #[error("could not allocate a unique session token")]
    TokenExhausted,
    #[error(transparent)]
    Backend(#[from] CacheError),
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        SessionError::Backend(err.into())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Backend(err.into())
    }
}

impl From<crate::context::ContextError> for SessionError {
    fn from(err: crate::context::ContextError) -> Self {
        SessionError::Backend(err.into())
    }
}

/// 会话存储，过期由存储自身负责，没有外部清理任务
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 生成新令牌并以 `ttl_secs` 的绝对过期时间保存会话，返回令牌
    async fn create(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        ttl_secs: u64,
    ) -> Result<String, SessionError>;

    async fn get(&self, ctx: &RequestContext, token: &str) -> Result<Session, SessionError>;

    /// 幂等删除
    async fn delete(&self, ctx: &RequestContext, token: &str) -> Result<(), SessionError>;
}

/// 生成新的会话令牌（128 位随机 UUID）
pub fn new_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// 会话存储 Redis 实现
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: Arc<RedisClient>,
}

impl RedisSessionStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        ttl_secs: u64,
    ) -> Result<String, SessionError> {
        ctx.run(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;

            for _ in 0..MAX_TOKEN_ATTEMPTS {
                let session = Session {
                    session_id: new_session_token(),
                    user_id,
                };
                let json = serde_json::to_string(&session)?;

                // SET NX：已存在同名键时不覆盖，返回 nil
                let stored: Option<String> = redis::cmd("SET")
                    .arg(session_key(&session.session_id))
                    .arg(json)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs.max(1))
                    .query_async(&mut conn)
                    .await?;

                if stored.is_some() {
                    return Ok(session.session_id);
                }
                tracing::warn!("session token collision, regenerating");
            }

            Err(SessionError::TokenExhausted)
        })
        .await?
    }

    async fn get(&self, ctx: &RequestContext, token: &str) -> Result<Session, SessionError> {
        if token.is_empty() {
            return Err(SessionError::NotFound);
        }

        ctx.run(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;

            let result: Option<String> = conn.get(session_key(token)).await?;
            match result {
                Some(json) => Ok(serde_json::from_str(&json)?),
                None => Err(SessionError::NotFound),
            }
        })
        .await?
    }

    async fn delete(&self, ctx: &RequestContext, token: &str) -> Result<(), SessionError> {
        ctx.run(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;

            let _: i64 = conn.del(session_key(token)).await?;

            Ok::<_, SessionError>(())
        })
        .await?
    }
}
