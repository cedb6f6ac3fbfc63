// 数据库模块
// 用户记录的权威存储：能力接口 + Postgres 实现 + 内存实现

pub mod memory;
pub mod repositories;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::context::{ContextError, RequestContext};
use crate::models::{NewUser, PaginationQuery, User, UserUpdate};

pub use memory::MemoryUserStore;
pub use repositories::user::PgUserRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// 用户存储能力接口
///
/// 所有实现都必须可被多个请求并发调用。邮箱唯一性由存储自身保证，
/// 冲突以 `StoreError::Conflict` 报告。
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 插入新用户，空角色存为默认角色
    async fn register(&self, ctx: &RequestContext, user: &NewUser) -> Result<User, StoreError>;

    /// 部分更新，`None` 字段保持原值
    async fn update(&self, ctx: &RequestContext, update: &UserUpdate) -> Result<User, StoreError>;

    /// 只更新角色，空角色保持原值
    async fn update_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: &str,
    ) -> Result<User, StoreError>;

    /// 删除用户，没有行受影响时返回 `NotFound`
    async fn delete(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), StoreError>;

    async fn get_by_id(&self, ctx: &RequestContext, user_id: Uuid) -> Result<User, StoreError>;

    /// `email` 必须已规范化
    async fn find_by_email(&self, ctx: &RequestContext, email: &str) -> Result<User, StoreError>;

    async fn count_by_name(&self, ctx: &RequestContext, name: &str) -> Result<i64, StoreError>;

    /// 按名字（first_name 或 last_name，忽略大小写的包含匹配）分页查找
    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
        pq: &PaginationQuery,
    ) -> Result<Vec<User>, StoreError>;

    async fn count(&self, ctx: &RequestContext) -> Result<i64, StoreError>;

    async fn list(&self, ctx: &RequestContext, pq: &PaginationQuery)
    -> Result<Vec<User>, StoreError>;
}
