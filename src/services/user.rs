//! 用户编排器
//!
//! 读走缓存旁路：先查缓存，未命中再查存储并回填。写操作只写存储，
//! 随后同步使缓存条目失效，从不直接改写缓存。缓存的任何失败都只记日志，
//! 不影响主结果，也从不重试。

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::UserCache;
use crate::context::RequestContext;
use crate::database::{StoreError, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::pagination::{has_more, total_pages};
use crate::models::{NewUser, PaginationQuery, User, UserUpdate, UsersList};
use crate::utils::{hash_password, normalize_email, verify_password};

/// 用户快照的默认缓存时长（秒）
pub const USER_CACHE_TTL_SECS: u64 = 3600;

const BAD_CREDENTIALS: &str = "邮箱或密码错误";

pub struct UserService {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn UserCache>,
    cache_ttl_secs: u64,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        cache: Arc<dyn UserCache>,
        cache_ttl_secs: u64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            store,
            cache,
            cache_ttl_secs,
            bcrypt_cost,
        }
    }

    /// 注册新用户
    ///
    /// 预先按邮箱查重只是为了给出友好的错误；并发注册同一邮箱时
    /// 以存储的唯一约束为准，同样报告为 `Conflict`。
    pub async fn register(&self, ctx: &RequestContext, mut input: NewUser) -> AppResult<User> {
        input.prepare();

        match self.store.find_by_email(ctx, &input.email).await {
            Ok(_) => return Err(AppError::Conflict("邮箱已被注册".to_string())),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let plain = std::mem::take(&mut input.password);
        let cost = self.bcrypt_cost;
        input.password =
            tokio::task::spawn_blocking(move || hash_password(&plain, cost)).await??;

        let created = self.store.register(ctx, &input).await?;
        tracing::info!(user_id = %created.user_id, "registered user");

        Ok(created.sanitized())
    }

    /// 校验邮箱和密码
    ///
    /// 邮箱不存在与密码错误返回同一个 `Unauthenticated`，不泄露邮箱是否已注册。
    /// 密码与注册时一样先去掉两端空白再校验。
    /// 成功后由调用方创建会话。
    pub async fn login(&self, ctx: &RequestContext, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);

        let found = match self.store.find_by_email(ctx, &email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                return Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        // 与注册时的规范化一致
        let password = password.trim().to_string();
        let hash = found.password.clone();
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;

        match verified {
            Ok(true) => Ok(found.sanitized()),
            Ok(false) => Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string())),
            Err(e) => {
                tracing::error!(user_id = %found.user_id, error = %e, "stored password hash is unreadable");
                Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()))
            }
        }
    }

    /// 按 ID 读取，缓存旁路
    pub async fn get_by_id(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<User> {
        match self.cache.get(ctx, user_id).await {
            Ok(Some(cached)) => return Ok(cached.sanitized()),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "user cache read failed, falling back to store");
            }
        }

        let user = self.store.get_by_id(ctx, user_id).await?;

        // 缓存里保存完整快照，只有返回给调用方的副本去掉密码
        if let Err(e) = self
            .cache
            .set(ctx, user_id, self.cache_ttl_secs, &user)
            .await
        {
            tracing::warn!(%user_id, error = %e, "failed to populate user cache");
        }

        Ok(user.sanitized())
    }

    /// 部分更新，成功后使缓存失效
    pub async fn update(&self, ctx: &RequestContext, update: UserUpdate) -> AppResult<User> {
        let update = update.normalize();
        let user_id = update.user_id;

        let updated = self.store.update(ctx, &update).await?;
        self.invalidate(ctx, user_id, "update").await;

        Ok(updated.sanitized())
    }

    /// 只更新角色，成功后使缓存失效
    pub async fn update_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: &str,
    ) -> AppResult<User> {
        let updated = self.store.update_role(ctx, user_id, role.trim()).await?;
        self.invalidate(ctx, user_id, "update_role").await;

        Ok(updated.sanitized())
    }

    /// 删除用户；存储报告不存在时直接返回，不触碰缓存
    pub async fn delete(&self, ctx: &RequestContext, user_id: Uuid) -> AppResult<()> {
        self.store.delete(ctx, user_id).await?;
        self.invalidate(ctx, user_id, "delete").await;

        tracing::info!(%user_id, "deleted user");
        Ok(())
    }

    /// 按名字分页查找
    pub async fn find_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
        pq: &PaginationQuery,
    ) -> AppResult<UsersList> {
        let name = name.trim();
        let total_count = self.store.count_by_name(ctx, name).await?;
        if total_count == 0 {
            return Ok(users_list(total_count, pq, Vec::new()));
        }

        let users = self.store.find_by_name(ctx, name, pq).await?;
        Ok(users_list(total_count, pq, users))
    }

    /// 分页列出全部用户
    pub async fn get_users(&self, ctx: &RequestContext, pq: &PaginationQuery) -> AppResult<UsersList> {
        let total_count = self.store.count(ctx).await?;
        if total_count == 0 {
            return Ok(users_list(total_count, pq, Vec::new()));
        }

        let users = self.store.list(ctx, pq).await?;
        Ok(users_list(total_count, pq, users))
    }

    async fn invalidate(&self, ctx: &RequestContext, user_id: Uuid, op: &'static str) {
        if let Err(e) = self.cache.invalidate(ctx, user_id).await {
            tracing::error!(%user_id, op, error = %e, "failed to invalidate user cache");
        }
    }
}

fn users_list(total_count: i64, pq: &PaginationQuery, users: Vec<User>) -> UsersList {
    let size = pq.size();
    let page = pq.page();
    UsersList {
        total_count,
        total_pages: total_pages(total_count, size),
        page,
        size,
        has_more: has_more(page, total_count, size),
        users: users.into_iter().map(User::sanitized).collect(),
    }
}
