use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use user_directory::cache::{CacheError, MemoryUserCache, UserCache};
use user_directory::context::{ContextError, RequestContext};
use user_directory::database::{MemoryUserStore, StoreError, UserStore};
use user_directory::error::AppError;
use user_directory::models::{NewUser, PaginationQuery, User, UserUpdate};
use user_directory::services::UserService;

/// 所有操作都失败的缓存
struct BrokenCache;

#[async_trait]
impl UserCache for BrokenCache {
    async fn get(&self, _: &RequestContext, _: Uuid) -> Result<Option<User>, CacheError> {
        Err(CacheError::Context(ContextError::Cancelled))
    }

    async fn set(&self, _: &RequestContext, _: Uuid, _: u64, _: &User) -> Result<(), CacheError> {
        Err(CacheError::Context(ContextError::Cancelled))
    }

    async fn invalidate(&self, _: &RequestContext, _: Uuid) -> Result<(), CacheError> {
        Err(CacheError::Context(ContextError::Cancelled))
    }
}

/// 记录失效调用次数，其余委托给内存缓存
#[derive(Default)]
struct CountingCache {
    inner: MemoryUserCache,
    invalidations: AtomicUsize,
}

#[async_trait]
impl UserCache for CountingCache {
    async fn get(&self, ctx: &RequestContext, id: Uuid) -> Result<Option<User>, CacheError> {
        self.inner.get(ctx, id).await
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        ttl: u64,
        user: &User,
    ) -> Result<(), CacheError> {
        self.inner.set(ctx, id, ttl, user).await
    }

    async fn invalidate(&self, ctx: &RequestContext, id: Uuid) -> Result<(), CacheError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.inner.invalidate(ctx, id).await
    }
}

/// 模拟并发注册：按邮箱查重时看不到对方，插入时才撞上唯一约束
#[derive(Default)]
struct LateConflictStore {
    inner: MemoryUserStore,
    inserts: AtomicUsize,
}

#[async_trait]
impl UserStore for LateConflictStore {
    async fn register(&self, _: &RequestContext, _: &NewUser) -> Result<User, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict("users_email_key".to_string()))
    }

    async fn update(&self, ctx: &RequestContext, update: &UserUpdate) -> Result<User, StoreError> {
        self.inner.update(ctx, update).await
    }

    async fn update_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: &str,
    ) -> Result<User, StoreError> {
        self.inner.update_role(ctx, user_id, role).await
    }

    async fn delete(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), StoreError> {
        self.inner.delete(ctx, user_id).await
    }

    async fn get_by_id(&self, ctx: &RequestContext, user_id: Uuid) -> Result<User, StoreError> {
        self.inner.get_by_id(ctx, user_id).await
    }

    async fn find_by_email(&self, _: &RequestContext, _: &str) -> Result<User, StoreError> {
        Err(StoreError::NotFound)
    }

    async fn count_by_name(&self, ctx: &RequestContext, name: &str) -> Result<i64, StoreError> {
        self.inner.count_by_name(ctx, name).await
    }

    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
        pq: &PaginationQuery,
    ) -> Result<Vec<User>, StoreError> {
        self.inner.find_by_name(ctx, name, pq).await
    }

    async fn count(&self, ctx: &RequestContext) -> Result<i64, StoreError> {
        self.inner.count(ctx).await
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        pq: &PaginationQuery,
    ) -> Result<Vec<User>, StoreError> {
        self.inner.list(ctx, pq).await
    }
}

fn new_user(email: &str, first: &str, last: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password: "correct horse".to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        ..Default::default()
    }
}

fn service_with(store: Arc<MemoryUserStore>, cache: Arc<dyn UserCache>) -> UserService {
    UserService::new(store, cache, 3600, 4)
}

#[tokio::test]
async fn register_returns_sanitized_user_with_default_role() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store.clone(), Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    let user = users
        .register(&ctx, new_user("  Ada@Example.COM ", "Ada", "Lovelace"))
        .await
        .unwrap();

    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.role(), "user");
    assert!(user.password.is_empty());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn register_rejects_duplicate_email_regardless_of_case() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store.clone(), Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();
    let err = users
        .register(&ctx, new_user(" ADA@example.com", "Other", "Person"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();

    let wrong_password = users
        .login(&ctx, "ada@example.com", "wrong")
        .await
        .unwrap_err();
    let unknown_email = users
        .login(&ctx, "nobody@example.com", "correct horse")
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AppError::Unauthenticated(_)));
    assert!(matches!(unknown_email, AppError::Unauthenticated(_)));
    assert_eq!(wrong_password.public_message(), unknown_email.public_message());

    let user = users
        .login(&ctx, " ADA@example.com ", "correct horse")
        .await
        .unwrap();
    assert!(user.password.is_empty());
}

#[tokio::test]
async fn get_by_id_fills_cache_with_full_snapshot() {
    let store = Arc::new(MemoryUserStore::new());
    let cache = Arc::new(MemoryUserCache::new());
    let users = service_with(store, cache.clone());
    let ctx = RequestContext::background();

    let created = users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();
    assert!(!cache.contains(created.user_id));

    let fetched = users.get_by_id(&ctx, created.user_id).await.unwrap();
    assert!(fetched.password.is_empty());

    let raw = cache.raw(created.user_id).unwrap();
    let cached: User = serde_json::from_str(&raw).unwrap();
    assert!(cached.password.starts_with("$2"));

    // 第二次读取命中缓存，仍然不暴露密码
    let again = users.get_by_id(&ctx, created.user_id).await.unwrap();
    assert!(again.password.is_empty());
    assert_eq!(again.email, fetched.email);
}

#[tokio::test]
async fn update_invalidates_cached_snapshot() {
    let store = Arc::new(MemoryUserStore::new());
    let cache = Arc::new(MemoryUserCache::new());
    let users = service_with(store, cache.clone());
    let ctx = RequestContext::background();

    let created = users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();
    users.get_by_id(&ctx, created.user_id).await.unwrap();
    assert!(cache.contains(created.user_id));

    let updated = users
        .update(
            &ctx,
            UserUpdate {
                user_id: created.user_id,
                city: Some("London".to_string()),
                first_name: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.city.as_deref(), Some("London"));
    assert_eq!(updated.first_name, "Ada");
    assert!(updated.password.is_empty());
    assert!(!cache.contains(created.user_id));

    let fetched = users.get_by_id(&ctx, created.user_id).await.unwrap();
    assert_eq!(fetched.city.as_deref(), Some("London"));
}

#[tokio::test]
async fn update_role_keeps_role_when_blank() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    let created = users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();

    let admin = users
        .update_role(&ctx, created.user_id, "admin")
        .await
        .unwrap();
    assert_eq!(admin.role(), "admin");
    assert!(admin.password.is_empty());

    let unchanged = users.update_role(&ctx, created.user_id, "  ").await.unwrap();
    assert_eq!(unchanged.role(), "admin");
    assert!(unchanged.password.is_empty());
}

#[tokio::test]
async fn update_missing_user_is_not_found() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    let err = users
        .update(
            &ctx,
            UserUpdate {
                user_id: Uuid::new_v4(),
                city: Some("Paris".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_missing_user_does_not_touch_cache() {
    let store = Arc::new(MemoryUserStore::new());
    let cache = Arc::new(CountingCache::default());
    let users = service_with(store, cache.clone());
    let ctx = RequestContext::background();

    let err = users.delete(&ctx, Uuid::new_v4()).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(cache.invalidations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn delete_removes_user_and_cache_entry() {
    let store = Arc::new(MemoryUserStore::new());
    let cache = Arc::new(CountingCache::default());
    let users = service_with(store.clone(), cache.clone());
    let ctx = RequestContext::background();

    let created = users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();
    users.get_by_id(&ctx, created.user_id).await.unwrap();

    users.delete(&ctx, created.user_id).await.unwrap();

    assert_eq!(cache.invalidations.load(Ordering::SeqCst), 1);
    assert!(!cache.inner.contains(created.user_id));
    assert!(store.is_empty());
    let err = users.get_by_id(&ctx, created.user_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn cache_failures_never_fail_the_operation() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(BrokenCache));
    let ctx = RequestContext::background();

    let created = users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();

    let fetched = users.get_by_id(&ctx, created.user_id).await.unwrap();
    assert_eq!(fetched.user_id, created.user_id);

    users
        .update_role(&ctx, created.user_id, "admin")
        .await
        .unwrap();
    users.delete(&ctx, created.user_id).await.unwrap();
}

#[tokio::test]
async fn get_users_paginates() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    for i in 0..25 {
        users
            .register(
                &ctx,
                new_user(&format!("user{i:02}@example.com"), &format!("User{i:02}"), "Test"),
            )
            .await
            .unwrap();
    }

    let page = users
        .get_users(&ctx, &PaginationQuery::new(10, 3, None))
        .await
        .unwrap();

    assert_eq!(page.total_count, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 3);
    assert_eq!(page.size, 10);
    assert!(!page.has_more);
    assert_eq!(page.users.len(), 5);
    assert!(page.users.iter().all(|u| u.password.is_empty()));

    let first = users
        .get_users(&ctx, &PaginationQuery::new(10, 1, None))
        .await
        .unwrap();
    assert!(first.has_more);
    assert_eq!(first.users.len(), 10);
}

#[tokio::test]
async fn find_by_name_with_no_matches_is_empty() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap();

    let none = users
        .find_by_name(&ctx, "grace", &PaginationQuery::new(10, 1, None))
        .await
        .unwrap();
    assert_eq!(none.total_count, 0);
    assert_eq!(none.total_pages, 0);
    assert!(!none.has_more);
    assert!(none.users.is_empty());

    let found = users
        .find_by_name(&ctx, "love", &PaginationQuery::new(0, 0, None))
        .await
        .unwrap();
    assert_eq!(found.total_count, 1);
    assert_eq!(found.size, 10);
    assert_eq!(found.page, 1);
    assert_eq!(found.users[0].first_name, "Ada");
    assert!(found.users[0].password.is_empty());
}

#[tokio::test]
async fn cancelled_context_aborts_store_calls() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();
    ctx.cancel();

    let err = users.get_by_id(&ctx, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}

#[tokio::test]
async fn register_reports_conflict_from_store_constraint() {
    let store = Arc::new(LateConflictStore::default());
    let users = UserService::new(store.clone(), Arc::new(MemoryUserCache::new()), 3600, 4);
    let ctx = RequestContext::background();

    let err = users
        .register(&ctx, new_user("ada@example.com", "Ada", "Lovelace"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn padded_password_logs_in_as_registered() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    let mut input = new_user("ada@example.com", "Ada", "Lovelace");
    input.password = " secret ".to_string();
    users.register(&ctx, input).await.unwrap();

    users
        .login(&ctx, "ada@example.com", " secret ")
        .await
        .unwrap();
    users.login(&ctx, "ada@example.com", "secret").await.unwrap();
}

#[tokio::test]
async fn extreme_pagination_values_are_bounded() {
    let store = Arc::new(MemoryUserStore::new());
    let users = service_with(store, Arc::new(MemoryUserCache::new()));
    let ctx = RequestContext::background();

    for i in 0..3 {
        users
            .register(&ctx, new_user(&format!("u{i}@example.com"), "Ada", "Test"))
            .await
            .unwrap();
    }

    let far = users
        .get_users(&ctx, &PaginationQuery::new(10, i64::MAX, None))
        .await
        .unwrap();
    assert_eq!(far.total_count, 3);
    assert!(far.users.is_empty());
    assert!(!far.has_more);

    let wide = users
        .find_by_name(&ctx, "ada", &PaginationQuery::new(i64::MAX, 1, None))
        .await
        .unwrap();
    assert_eq!(wide.size, 100);
    assert_eq!(wide.total_pages, 1);
    assert_eq!(wide.users.len(), 3);
    assert!(!wide.has_more);
}
