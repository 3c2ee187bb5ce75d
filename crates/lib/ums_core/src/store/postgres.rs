//! PostgreSQL user store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{EMAIL_CONFLICT, MOBILE_CONFLICT, StoreError, UserStore};
use crate::models::user::{NewUser, User, UserPage, UserQuery};

const USER_COLUMNS: &str = "id, name, email, mobile, password_hash, profile_pic, role, \
     is_blocked, is_deleted, deleted_at, created_at, updated_at";

/// User store on a sqlx connection pool. Run [`crate::migrate::migrate`]
/// before use.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate unique-constraint violations into `Conflict`.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        let message = match db.constraint() {
            Some(c) if c.contains("mobile") => MOBILE_CONFLICT,
            _ => EMAIL_CONFLICT,
        };
        return StoreError::Conflict(message.into());
    }
    StoreError::DbError(e)
}

/// Escape `%`, `_` and `\` so the search term is matched literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn mobile_taken(&self, mobile: &str, except: Option<Uuid>) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE mobile = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(mobile)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, mobile, password_hash, profile_pic, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.mobile)
        .bind(&new.password_hash)
        .bind(&new.profile_pic)
        .bind(new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, email = $3, mobile = $4, password_hash = $5, \
             profile_pic = $6, role = $7, is_blocked = $8, is_deleted = $9, deleted_at = $10, \
             updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.password_hash)
        .bind(&user.profile_pic)
        .bind(user.role)
        .bind(user.is_blocked)
        .bind(user.is_deleted)
        .bind(user.deleted_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn hard_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET is_deleted = TRUE, deleted_at = $2, updated_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &UserQuery) -> Result<UserPage, StoreError> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        const FILTER: &str = "is_deleted = FALSE AND ($1::text IS NULL \
             OR name ILIKE $1 OR email ILIKE $1 OR mobile ILIKE $1)";

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {FILTER} \
             ORDER BY created_at, id LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(i64::from(query.limit))
        .bind(query.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users WHERE {FILTER}"
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserPage {
            users,
            total: total.max(0) as u64,
        })
    }
}
