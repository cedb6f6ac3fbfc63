use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use uuid::Uuid;

use crate::cache::CacheError;
use crate::cache::keys::user_keys;
use crate::context::RequestContext;
use crate::models::User;

/// 用户快照缓存
///
/// 未命中是正常结果（`Ok(None)`），不是错误。`invalidate` 幂等。
#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get(&self, ctx: &RequestContext, user_id: Uuid) -> Result<Option<User>, CacheError>;

    /// 覆盖写入并设置过期时间
    async fn set(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        ttl_secs: u64,
        user: &User,
    ) -> Result<(), CacheError>;

    async fn invalidate(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), CacheError>;
}

/// 用户缓存 Redis 实现
#[derive(Clone)]
pub struct RedisUserCache {
    redis: Arc<RedisClient>,
}

impl RedisUserCache {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, ctx: &RequestContext, user_id: Uuid) -> Result<Option<User>, CacheError> {
        ctx.run(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;

            let key = user_keys::user_info_key(user_id);
            let result: Option<String> = conn.get(key).await?;

            match result {
                Some(json) => Ok::<_, CacheError>(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
        .await?
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        ttl_secs: u64,
        user: &User,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(user)?;
        ctx.run(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;

            let key = user_keys::user_info_key(user_id);
            let _: () = conn.set_ex(key, json, ttl_secs.max(1)).await?;

            Ok::<_, CacheError>(())
        })
        .await?
    }

    async fn invalidate(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), CacheError> {
        ctx.run(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;

            // DEL 对不存在的键返回 0，不算错误
            let _: i64 = conn.del(user_keys::user_info_key(user_id)).await?;

            Ok::<_, CacheError>(())
        })
        .await?
    }
}
