use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::database::{StoreError, UserStore};
use crate::models::{NewUser, PaginationQuery, User, UserUpdate};

/// 用户存储库 Postgres 实现
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn register(&self, ctx: &RequestContext, user: &NewUser) -> Result<User, StoreError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email, password, role, about, avatar,
                               phone_number, address, city, country, gender, postcode, birthday)
            VALUES ($1, $2, $3, $4, COALESCE(NULLIF($5, ''), 'user'), $6, $7, $8, $9, $10,
                    $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.role)
        .bind(&user.about)
        .bind(&user.avatar)
        .bind(&user.phone_number)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.country)
        .bind(&user.gender)
        .bind(user.postcode)
        .bind(user.birthday);

        let created = ctx.run(query.fetch_one(&self.pool)).await??;
        tracing::debug!(user_id = %created.user_id, "inserted user row");
        Ok(created)
    }

    async fn update(&self, ctx: &RequestContext, update: &UserUpdate) -> Result<User, StoreError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE(NULLIF($1, ''), first_name),
                last_name = COALESCE(NULLIF($2, ''), last_name),
                email = COALESCE(NULLIF($3, ''), email),
                about = COALESCE(NULLIF($4, ''), about),
                avatar = COALESCE(NULLIF($5, ''), avatar),
                phone_number = COALESCE(NULLIF($6, ''), phone_number),
                address = COALESCE(NULLIF($7, ''), address),
                city = COALESCE(NULLIF($8, ''), city),
                country = COALESCE(NULLIF($9, ''), country),
                gender = COALESCE(NULLIF($10, ''), gender),
                postcode = COALESCE(NULLIF($11, 0), postcode),
                birthday = COALESCE($12, birthday),
                updated_at = now()
            WHERE user_id = $13
            RETURNING *
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(&update.about)
        .bind(&update.avatar)
        .bind(&update.phone_number)
        .bind(&update.address)
        .bind(&update.city)
        .bind(&update.country)
        .bind(&update.gender)
        .bind(update.postcode)
        .bind(update.birthday)
        .bind(update.user_id);

        Ok(ctx.run(query.fetch_one(&self.pool)).await??)
    }

    async fn update_role(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        role: &str,
    ) -> Result<User, StoreError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = COALESCE(NULLIF($1, ''), role),
                updated_at = now()
            WHERE user_id = $2
            RETURNING *
            "#,
        )
        .bind(role)
        .bind(user_id);

        Ok(ctx.run(query.fetch_one(&self.pool)).await??)
    }

    async fn delete(&self, ctx: &RequestContext, user_id: Uuid) -> Result<(), StoreError> {
        let query = sqlx::query("DELETE FROM users WHERE user_id = $1").bind(user_id);

        let result = ctx.run(query.execute(&self.pool)).await??;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn get_by_id(&self, ctx: &RequestContext, user_id: Uuid) -> Result<User, StoreError> {
        let query =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1").bind(user_id);

        Ok(ctx.run(query.fetch_one(&self.pool)).await??)
    }

    async fn find_by_email(&self, ctx: &RequestContext, email: &str) -> Result<User, StoreError> {
        let query = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1").bind(email);

        Ok(ctx.run(query.fetch_one(&self.pool)).await??)
    }

    async fn count_by_name(&self, ctx: &RequestContext, name: &str) -> Result<i64, StoreError> {
        let query = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(user_id) FROM users
            WHERE first_name ILIKE '%' || $1 || '%' OR last_name ILIKE '%' || $1 || '%'
            "#,
        )
        .bind(name);

        Ok(ctx.run(query.fetch_one(&self.pool)).await??)
    }

    async fn find_by_name(
        &self,
        ctx: &RequestContext,
        name: &str,
        pq: &PaginationQuery,
    ) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            r#"
            SELECT * FROM users
            WHERE first_name ILIKE '%' || $1 || '%' OR last_name ILIKE '%' || $1 || '%'
            ORDER BY {}
            OFFSET $2 LIMIT $3
            "#,
            pq.order().as_sql()
        );
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(pq.offset())
            .bind(pq.limit());

        Ok(ctx.run(query.fetch_all(&self.pool)).await??)
    }

    async fn count(&self, ctx: &RequestContext) -> Result<i64, StoreError> {
        let query = sqlx::query_scalar::<_, i64>("SELECT COUNT(user_id) FROM users");

        Ok(ctx.run(query.fetch_one(&self.pool)).await??)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        pq: &PaginationQuery,
    ) -> Result<Vec<User>, StoreError> {
        // 排序列来自白名单，不接受调用方原始输入
        let sql = format!(
            "SELECT * FROM users ORDER BY {} OFFSET $1 LIMIT $2",
            pq.order().as_sql()
        );
        let query = sqlx::query_as::<_, User>(&sql)
            .bind(pq.offset())
            .bind(pq.limit());

        Ok(ctx.run(query.fetch_all(&self.pool)).await??)
    }
}
