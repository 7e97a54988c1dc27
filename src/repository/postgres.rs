/// sqlx/PostgreSQL store implementations
///
/// Row structs keep sqlx column mapping out of the domain types. All reads
/// filter soft-deleted rows; all writes are optimistic-locked on the
/// version column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{hash_token, RefreshToken, User, UserStatus};
use crate::error::{AppError, DatabaseError};
use crate::repository::{RefreshTokenStore, UserStore};

pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    password_salt: String,
    status: String,
    role_id: Option<Uuid>,
    login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i32,
}

impl UserRow {
    fn into_user(self) -> Result<User, AppError> {
        let status = UserStatus::parse(&self.status).ok_or_else(|| {
            AppError::Database(DatabaseError::UnexpectedError(format!(
                "unknown user status '{}' for user {}",
                self.status, self.id
            )))
        })?;
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            password_salt: self.password_salt,
            status,
            role_id: self.role_id,
            login_attempts: self.login_attempts,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            version: self.version,
        })
    }
}

const USER_COLUMNS: &str = r#"
    id, username, email, first_name, last_name,
    password_hash, password_salt, status, role_id,
    login_attempts, locked_until, last_login_at,
    created_at, updated_at, deleted_at, version
"#;

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn update(&self, user: &User, expected_version: i32) -> Result<User, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $1, first_name = $2, last_name = $3,
                password_hash = $4, password_salt = $5, status = $6,
                role_id = $7, login_attempts = $8, locked_until = $9,
                last_login_at = $10, updated_at = $11, version = $12
            WHERE id = $13 AND version = $14 AND deleted_at IS NULL
            "#,
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .bind(user.status.as_str())
        .bind(user.role_id)
        .bind(user.login_attempts)
        .bind(user.locked_until)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .bind(user.version)
        .bind(user.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::VersionConflict("user").into());
        }
        Ok(user.clone())
    }
}

pub struct PostgresRefreshTokenStore {
    pool: PgPool,
}

impl PostgresRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i32,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            revoked: row.revoked,
            revoked_at: row.revoked_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            version: row.version,
        }
    }
}

const REFRESH_TOKEN_COLUMNS: &str = r#"
    id, user_id, token_hash, expires_at, revoked, revoked_at,
    ip_address, user_agent, created_at, updated_at, deleted_at, version
"#;

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, user_id, token_hash, expires_at, revoked, revoked_at,
                ip_address, user_agent, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(token.revoked_at)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .bind(token.created_at)
        .bind(token.updated_at)
        .bind(token.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let token_hash = hash_token(token);

        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            "SELECT {} FROM refresh_tokens WHERE token_hash = $1 AND deleted_at IS NULL",
            REFRESH_TOKEN_COLUMNS
        ))
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshToken::from))
    }

    async fn update(
        &self,
        token: &RefreshToken,
        expected_version: i32,
    ) -> Result<RefreshToken, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET expires_at = $1, revoked = $2, revoked_at = $3,
                updated_at = $4, version = $5
            WHERE id = $6 AND version = $7 AND deleted_at IS NULL
            "#,
        )
        .bind(token.expires_at)
        .bind(token.revoked)
        .bind(token.revoked_at)
        .bind(token.updated_at)
        .bind(token.version)
        .bind(token.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::VersionConflict("refresh token").into());
        }
        Ok(token.clone())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true, revoked_at = $1, updated_at = $1,
                version = version + 1
            WHERE user_id = $2 AND revoked = false AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user_id, revoked = result.rows_affected(), "Revoked all refresh tokens for user");
        Ok(result.rows_affected())
    }

    async fn cleanup_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET deleted_at = $1, updated_at = $1, version = version + 1
            WHERE expires_at < $1 AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!(removed = result.rows_affected(), "Cleaned up expired refresh tokens");
        Ok(result.rows_affected())
    }
}
