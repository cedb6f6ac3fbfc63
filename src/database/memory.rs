// 内存用户存储
// 无需 Postgres 即可运行和测试编排逻辑，语义与 Postgres 实现保持一致

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::database::{StoreError, UserStore};
use crate::models::user::DEFAULT_ROLE;
use crate::models::{NewUser, PaginationQuery, User, UserOrder, UserUpdate};

const EMAIL_CONSTRAINT: &str = "users_email_key";

/// 需要同时持有两把 guard 时，顺序固定为先 `users` 后 `emails`；
/// 任何路径都不在持有 `emails` guard 时访问 `users`
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn matches_name(user: &User, pattern: &str) -> bool {
        let pattern = pattern.to_lowercase();
        user.first_name.to_lowercase().contains(&pattern)
            || user.last_name.to_lowercase().contains(&pattern)
    }

    fn sort(users: &mut [User], order: UserOrder) {
        match order {
            UserOrder::Name => users.sort_by(|a, b| {
                (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
            }),
            UserOrder::LastName => users.sort_by(|a, b| {
                (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
            }),
            UserOrder::Email => users.sort_by(|a, b| a.email.cmp(&b.email)),
            UserOrder::CreatedAt => users.sort_by_key(|u| u.created_at),
        }
    }

    fn page(mut users: Vec<User>, pq: &PaginationQuery) -> Vec<User> {
        Self::sort(&mut users, pq.order());
        users
            .into_iter()
            .skip(pq.offset() as usize)
            .take(pq.limit() as usize)
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn register(&self, ctx: &RequestContext, user: &NewUser) -> Result<User, StoreError> {
        ctx.run(async {
            let now = Utc::now();
            let user_id = Uuid::new_v4();

            match self.emails.entry(user.email.clone()) {
                Entry::Occupied(_) => return Err(StoreError::Conflict(EMAIL_CONSTRAINT.into())),
                Entry::Vacant(slot) => {
                    slot.insert(user_id);
                }
            }

            let role = user
                .role
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE.to_string());
            let created = User {
                user_id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
                password: user.password.clone(),
                role: Some(role),
                about: user.about.clone(),
                avatar: user.avatar.clone(),
                phone_number: user.phone_number.clone(),
                address: user.address.clone(),
                city: user.city.clone(),
                country: user.country.clone(),
                gender: user.gender.clone(),
                postcode: user.postcode,
                birthday: user.birthday,
                created_at: now,
                updated_at: now,
                login_date: now,
            };
            self.users.insert(user_id, created.clone());
            Ok::<_, StoreError>(created)
        })
        .await?
    }

    async fn update(&self, ctx: &RequestContext, update: &UserUpdate) -> Result<User, StoreError> {
        ctx.run(async {
            // 整个更新期间持有该用户的写 guard，同一用户的并发更新串行执行
            let mut user = self
                .users
                .get_mut(&update.user_id)
                .ok_or(StoreError::NotFound)?;

            if let Some(new_email) = update.email.as_ref().filter(|e| **e != user.email) {
                match self.emails.entry(new_email.clone()) {
                    Entry::Occupied(_) => {
                        return Err(StoreError::Conflict(EMAIL_CONSTRAINT.into()));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(update.user_id);
                    }
                }
                self.emails
                    .remove_if(&user.email, |_, owner| *owner == update.user_id);
            }

            update.apply_to(&mut user);
            user.updated_at = Utc::now();
            Ok::<_, StoreError>(user.clone())
        })
        .await?
    }

    async fn update_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: &str,
    ) -> Result<User, StoreError> {
        ctx.run(async {
            let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
            if !role.is_empty() {
                user.role = Some(role.to_string());
            }
            user.updated_at = Utc::now();
            Ok::<_, StoreError>(user.clone())
        })
        .await?
    }

    async fn delete(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), StoreError> {
        ctx.run(async {
            let (_, removed) = self.users.remove(&user_id).ok_or(StoreError::NotFound)?;
            self.emails.remove_if(&removed.email, |_, owner| *owner == user_id);
            Ok::<_, StoreError>(())
        })
        .await?
    }

    async fn get_by_id(&self, ctx: &RequestContext, user_id: Uuid) -> Result<User, StoreError> {
        ctx.run(async {
            self.users
                .get(&user_id)
                .map(|u| u.value().clone())
                .ok_or(StoreError::NotFound)
        })
        .await?
    }

    async fn find_by_email(&self, ctx: &RequestContext, email: &str) -> Result<User, StoreError> {
        ctx.run(async {
            let user_id = self
                .emails
                .get(email)
                .map(|id| *id.value())
                .ok_or(StoreError::NotFound)?;
            self.users
                .get(&user_id)
                .map(|u| u.value().clone())
                .ok_or(StoreError::NotFound)
        })
        .await?
    }

    async fn count_by_name(&self, ctx: &RequestContext, name: &str) -> Result<i64, StoreError> {
        ctx.run(async {
            let count = self
                .users
                .iter()
                .filter(|u| Self::matches_name(u.value(), name))
                .count();
            Ok::<_, StoreError>(count as i64)
        })
        .await?
    }

    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
        pq: &PaginationQuery,
    ) -> Result<Vec<User>, StoreError> {
        ctx.run(async {
            let matched: Vec<User> = self
                .users
                .iter()
                .filter(|u| Self::matches_name(u.value(), name))
                .map(|u| u.value().clone())
                .collect();
            Ok::<_, StoreError>(Self::page(matched, pq))
        })
        .await?
    }

    async fn count(&self, ctx: &RequestContext) -> Result<i64, StoreError> {
        ctx.run(async { Ok::<_, StoreError>(self.users.len() as i64) }).await?
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        pq: &PaginationQuery,
    ) -> Result<Vec<User>, StoreError> {
        ctx.run(async {
            let all: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
            Ok::<_, StoreError>(Self::page(all, pq))
        })
        .await?
    }
}
