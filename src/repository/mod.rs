/// Store contracts
///
/// The authentication flows consume these interfaces and never see the
/// backing database. Updates are compare-and-swap: the caller supplies the
/// version it read, and a mismatch fails with `VersionConflict` instead of
/// silently overwriting a concurrent write.

mod postgres;

pub use postgres::PostgresRefreshTokenStore;
pub use postgres::PostgresUserStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{RefreshToken, User};
use crate::error::AppError;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Full record by username, or `None` when unknown or soft-deleted.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Full record by ID, or `None` when unknown or soft-deleted.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Persists the record iff the stored version equals `expected_version`.
    async fn update(&self, user: &User, expected_version: i32) -> Result<User, AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> Result<(), AppError>;

    /// Looks up the record for a presented (plaintext) token string.
    /// The store hashes it; raw tokens are never query parameters.
    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError>;

    /// Persists the record iff the stored version equals `expected_version`.
    async fn update(
        &self,
        token: &RefreshToken,
        expected_version: i32,
    ) -> Result<RefreshToken, AppError>;

    /// Revokes every live token owned by the user (logout-all-devices).
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// Soft-deletes expired rows. Run by external maintenance, never on the
    /// request path.
    async fn cleanup_expired(&self) -> Result<u64, AppError>;
}
