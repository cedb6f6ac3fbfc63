// 内存键值存储
// 语义与 Redis 的 SET EX / GET / DEL 一致，过期按 tokio 时钟判断，测试中可暂停和推进时间

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use uuid::Uuid;

use crate::cache::keys::{session_key, user_info_key};
use crate::cache::operations::session::{SessionError, SessionStore, new_session_token};
use crate::cache::operations::user::UserCache;
use crate::cache::CacheError;
use crate::context::RequestContext;
use crate::models::{Session, User};

#[derive(Debug, Clone)]
struct KvEntry {
    value: String,
    expires_at: Instant,
}

/// 带 TTL 的内存键值表，过期条目在读取时惰性清除
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, KvEntry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖写入
    pub fn set_ex(&self, key: String, value: String, ttl: Duration) {
        self.entries.insert(
            key,
            KvEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// 仅在键不存在（或已过期）时写入，返回是否写入成功
    pub fn set_nx_ex(&self, key: String, value: String, ttl: Duration) -> bool {
        let now = Instant::now();
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) if slot.get().expires_at <= now => {
                slot.insert(KvEntry {
                    value,
                    expires_at: now + ttl,
                });
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(KvEntry {
                    value,
                    expires_at: now + ttl,
                });
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        None
    }

    /// 返回是否删除了未过期的条目
    pub fn del(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove(key)
            .is_some_and(|(_, e)| e.expires_at > now)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// 用户缓存内存实现
#[derive(Debug, Default)]
pub struct MemoryUserCache {
    kv: MemoryKv,
}

impl MemoryUserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 不经过反序列化直接查看条目是否存在
    pub fn contains(&self, user_id: Uuid) -> bool {
        self.kv.contains(&user_info_key(user_id))
    }

    /// 直接读取原始快照（测试用于检查缓存内容）
    pub fn raw(&self, user_id: Uuid) -> Option<String> {
        self.kv.get(&user_info_key(user_id))
    }
}

#[async_trait]
impl UserCache for MemoryUserCache {
    async fn get(&self, ctx: &RequestContext, user_id: Uuid) -> Result<Option<User>, CacheError> {
        ctx.run(async {
            match self.kv.get(&user_info_key(user_id)) {
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
            self.kv.set_ex(
                user_info_key(user_id),
                json,
                Duration::from_secs(ttl_secs.max(1)),
            );
        })
        .await?;
        Ok(())
    }

    async fn invalidate(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), CacheError> {
        ctx.run(async {
            self.kv.del(&user_info_key(user_id));
        })
        .await?;
        Ok(())
    }
}

/// 会话存储内存实现
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    kv: MemoryKv,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        ttl_secs: u64,
    ) -> Result<String, SessionError> {
        ctx.run(async {
            let session = Session {
                session_id: new_session_token(),
                user_id,
            };
            let json = serde_json::to_string(&session)?;
            let ttl = Duration::from_secs(ttl_secs.max(1));

            if self.kv.set_nx_ex(session_key(&session.session_id), json, ttl) {
                Ok(session.session_id)
            } else {
                Err(SessionError::TokenExhausted)
            }
        })
        .await?
    }

    async fn get(&self, ctx: &RequestContext, token: &str) -> Result<Session, SessionError> {
        if token.is_empty() {
            return Err(SessionError::NotFound);
        }

        ctx.run(async {
            match self.kv.get(&session_key(token)) {
                Some(json) => Ok(serde_json::from_str(&json)?),
                None => Err(SessionError::NotFound),
            }
        })
        .await?
    }

    async fn delete(&self, ctx: &RequestContext, token: &str) -> Result<(), SessionError> {
        ctx.run(async {
            self.kv.del(&session_key(token));
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let kv = MemoryKv::new();
        kv.set_ex("k".into(), "v".into(), Duration::from_secs(2));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(kv.get("k").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(kv.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_key_can_be_claimed_with_nx() {
        let kv = MemoryKv::new();
        assert!(kv.set_nx_ex("k".into(), "a".into(), Duration::from_secs(1)));
        assert!(!kv.set_nx_ex("k".into(), "b".into(), Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(kv.set_nx_ex("k".into(), "c".into(), Duration::from_secs(1)));
        assert_eq!(kv.get("k").as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let cache = MemoryUserCache::new();
        let ctx = RequestContext::background();
        let id = Uuid::new_v4();

        cache.invalidate(&ctx, id).await.unwrap();
        cache.invalidate(&ctx, id).await.unwrap();
        assert!(!cache.contains(id));
    }

    #[tokio::test]
    async fn miss_is_not_an_error() {
        let cache = MemoryUserCache::new();
        let ctx = RequestContext::background();
        assert!(cache.get(&ctx, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_a_distinct_error() {
        let cache = MemoryUserCache::new();
        let id = Uuid::new_v4();
        cache
            .kv
            .set_ex(user_info_key(id), "{not json".into(), Duration::from_secs(60));

        let err = cache
            .get(&RequestContext::background(), id)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
