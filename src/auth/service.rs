/// Authentication flows
///
/// Login, logout, and refresh, orchestrating the stores, the JWT service,
/// and the password service. Each invocation is stateless; the only durable
/// state machines are the refresh token's one-way {valid -> revoked}
/// transition and the user's lockout window.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::claims::TokenAudience;
use crate::auth::jwt::{JwtService, TokenPair};
use crate::auth::password::PasswordService;
use crate::domain::{LockoutPolicy, PublicUser, RefreshToken, User};
use crate::error::{AppError, AuthError};
use crate::repository::{RefreshTokenStore, UserStore};

/// Lifetime of the stored refresh-token row created at login.
/// The JWT refresh expiry (`jwt.refresh_token_expiry`) is configured
/// separately and the two are not unified; see DESIGN.md.
pub const STORED_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Bounded retry for optimistic-lock conflicts on the lockout counter.
const VERSION_CONFLICT_RETRIES: u32 = 3;

/// Outcome of a non-blocking side effect: logged, never surfaced to the
/// caller, but explicit enough for tests to assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    Applied,
    Failed,
}

impl SideEffect {
    pub fn observe<T>(operation: &'static str, result: Result<T, AppError>) -> Self {
        match result {
            Ok(_) => SideEffect::Applied,
            Err(err) => {
                tracing::warn!(
                    operation = operation,
                    error = %err,
                    "Non-blocking side effect failed"
                );
                SideEffect::Failed
            }
        }
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub tokens: TokenPair,
    pub expires_in: i64,
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub tokens: TokenPair,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    jwt: JwtService,
    passwords: PasswordService,
    lockout: LockoutPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt: JwtService,
        passwords: PasswordService,
        lockout: LockoutPolicy,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt,
            passwords,
            lockout,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    /// Verifies credentials and opens a session.
    ///
    /// Unknown usernames and wrong passwords fail identically so the
    /// endpoint cannot be used to enumerate accounts.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<LoginOutcome, AppError> {
        let user = self
            .users
            .get_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.is_locked() {
            return Err(AuthError::AccountLocked {
                locked_until: user.locked_until,
            }
            .into());
        }

        if !user.is_active() {
            return Err(AuthError::AccountNotActive.into());
        }

        if !self
            .passwords
            .verify(password, &user.password_hash, &user.password_salt)
        {
            // Known consistency gap: the counter update is best-effort so a
            // store failure here cannot turn a credential rejection into a
            // 5xx. Concurrent failures may under-count if every retry
            // conflicts.
            SideEffect::observe(
                "record failed login",
                self.update_user_with_retry(user, User::record_failed_login)
                    .await,
            );
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens =
            self.jwt
                .issue_token_pair(user.id, &user.username, &user.email, user.role_id)?;

        let row = RefreshToken::new(
            user.id,
            &tokens.refresh_token,
            Utc::now() + Duration::days(STORED_REFRESH_TOKEN_TTL_DAYS),
            ip_address,
            user_agent,
        );
        self.refresh_tokens.create(&row).await?;

        let public = user.public();
        SideEffect::observe(
            "record successful login",
            self.update_user_with_retry(user, |u, _| u.record_login())
                .await,
        );

        tracing::info!(user_id = %public.id, "User logged in");

        let expires_in = tokens.expires_in;
        Ok(LoginOutcome {
            user: public,
            tokens,
            expires_in,
        })
    }

    /// Revokes the presented refresh token.
    ///
    /// Requires a refresh-audience token; an access token is not a
    /// revocation credential here (see DESIGN.md).
    pub async fn logout(&self, refresh_token: &str) -> Result<String, AppError> {
        let claims = self.jwt.validate(refresh_token)?;
        claims.require_audience(TokenAudience::Refresh)?;

        let mut stored = self
            .refresh_tokens
            .get_by_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !stored.is_valid() {
            return Err(AuthError::InvalidToken.into());
        }

        let expected = stored.version;
        stored.revoke();
        self.refresh_tokens.update(&stored, expected).await?;

        tracing::info!(user_id = %stored.user_id, "User logged out");
        Ok("Successfully logged out".to_string())
    }

    /// Rotates a refresh token into a brand-new pair.
    ///
    /// The new stored row inherits the old row's expiry, so rotation
    /// preserves the absolute session lifetime instead of resetting it.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<RefreshOutcome, AppError> {
        let claims = self.jwt.validate(refresh_token)?;

        let mut stored = self
            .refresh_tokens
            .get_by_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !stored.is_valid() {
            return Err(AuthError::InvalidToken.into());
        }

        let user = self
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active() {
            return Err(AuthError::AccountNotActive.into());
        }

        let tokens =
            self.jwt
                .refresh(refresh_token, &user.username, &user.email, user.role_id)?;

        // Known consistency gap: if this revoke is lost, the old token stays
        // usable until its expiry; the rotation itself still succeeds.
        let session_expires_at = stored.expires_at;
        let expected = stored.version;
        stored.revoke();
        SideEffect::observe(
            "revoke rotated refresh token",
            self.refresh_tokens.update(&stored, expected).await,
        );

        let row = RefreshToken::new(
            user.id,
            &tokens.refresh_token,
            session_expires_at,
            ip_address,
            user_agent,
        );
        self.refresh_tokens.create(&row).await?;

        tracing::info!(user_id = %user.id, "Refresh token rotated");

        let expires_in = tokens.expires_in;
        Ok(RefreshOutcome { tokens, expires_in })
    }

    /// Public record for an authenticated user, looked up by token claims.
    pub async fn current_user(&self, user_id: uuid::Uuid) -> Result<PublicUser, AppError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user.public())
    }

    /// Applies a lockout-state mutation and persists it, re-reading and
    /// re-applying on version conflict up to a small bounded count.
    async fn update_user_with_retry<F>(&self, mut user: User, apply: F) -> Result<User, AppError>
    where
        F: Fn(&mut User, &LockoutPolicy),
    {
        let mut attempt = 0;
        loop {
            let expected = user.version;
            apply(&mut user, &self.lockout);

            match self.users.update(&user, expected).await {
                Ok(updated) => return Ok(updated),
                Err(err) if err.is_version_conflict() && attempt + 1 < VERSION_CONFLICT_RETRIES => {
                    attempt += 1;
                    user = self
                        .users
                        .get_by_id(user.id)
                        .await?
                        .ok_or(AuthError::UserNotFound)?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
