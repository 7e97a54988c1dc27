//! Shared test fixtures: in-memory store doubles with conflict/failure
//! injection, and a pre-wired AuthService.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use staff_api::auth::{AuthService, JwtService, PasswordService};
use staff_api::configuration::JwtSettings;
use staff_api::domain::{hash_token, LockoutPolicy, RefreshToken, User};
use staff_api::error::{AppError, DatabaseError};
use staff_api::repository::{RefreshTokenStore, UserStore};

// Fast KDF for tests; production counts come from configuration.
pub const TEST_PBKDF2_ITERATIONS: u32 = 1_000;
pub const TEST_ACCESS_EXPIRY: i64 = 900;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    /// Fail this many upcoming updates with VersionConflict.
    conflicts_remaining: AtomicU32,
    /// Fail every update outright when set.
    fail_updates: AtomicBool,
}

impl InMemoryUserStore {
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn remove(&self, id: Uuid) {
        self.users.lock().unwrap().remove(&id);
    }

    pub fn mutate<F: FnOnce(&mut User)>(&self, id: Uuid, f: F) {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).expect("user not seeded");
        f(user);
    }

    pub fn inject_version_conflicts(&self, count: u32) {
        self.conflicts_remaining.store(count, Ordering::SeqCst);
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| u.username == username && !u.is_deleted())
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id).filter(|u| !u.is_deleted()).cloned())
    }

    async fn update(&self, user: &User, expected_version: i32) -> Result<User, AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DatabaseError::UnexpectedError("injected failure".to_string()).into());
        }
        if self
            .conflicts_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DatabaseError::VersionConflict("user").into());
        }

        let mut users = self.users.lock().unwrap();
        match users.get(&user.id) {
            Some(stored) if stored.version == expected_version => {
                users.insert(user.id, user.clone());
                Ok(user.clone())
            }
            Some(_) => Err(DatabaseError::VersionConflict("user").into()),
            None => Err(DatabaseError::NotFound("user").into()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<HashMap<Uuid, RefreshToken>>,
    fail_updates: AtomicBool,
}

impl InMemoryRefreshTokenStore {
    pub fn get_stored(&self, raw_token: &str) -> Option<RefreshToken> {
        let hash = hash_token(raw_token);
        let tokens = self.tokens.lock().unwrap();
        tokens.values().find(|t| t.token_hash == hash).cloned()
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> Result<(), AppError> {
        self.tokens.lock().unwrap().insert(token.id, token.clone());
        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let hash = hash_token(token);
        let tokens = self.tokens.lock().unwrap();
        Ok(tokens
            .values()
            .find(|t| t.token_hash == hash && t.deleted_at.is_none())
            .cloned())
    }

    async fn update(
        &self,
        token: &RefreshToken,
        expected_version: i32,
    ) -> Result<RefreshToken, AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DatabaseError::UnexpectedError("injected failure".to_string()).into());
        }

        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get(&token.id) {
            Some(stored) if stored.version == expected_version => {
                tokens.insert(token.id, token.clone());
                Ok(token.clone())
            }
            Some(_) => Err(DatabaseError::VersionConflict("refresh token").into()),
            None => Err(DatabaseError::NotFound("refresh token").into()),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        let mut revoked = 0;
        for token in tokens.values_mut() {
            if token.user_id == user_id && !token.revoked && token.deleted_at.is_none() {
                token.revoke();
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn cleanup_expired(&self) -> Result<u64, AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        let mut removed = 0;
        for token in tokens.values_mut() {
            if token.is_expired() && token.deleted_at.is_none() {
                token.deleted_at = Some(chrono::Utc::now());
                removed += 1;
            }
        }
        Ok(removed)
    }
}

pub struct TestApp {
    pub service: AuthService,
    pub users: Arc<InMemoryUserStore>,
    pub tokens: Arc<InMemoryRefreshTokenStore>,
    pub jwt: JwtService,
    pub passwords: PasswordService,
}

impl TestApp {
    /// Seeds an ACTIVE user with the given credentials, returns it.
    pub fn seed_user(&self, username: &str, password: &str) -> User {
        let (hash, salt) = self.passwords.hash(password).expect("hash password");
        let mut user = User::new(
            username.to_string(),
            format!("{}@example.com", username),
            "Test".to_string(),
            "User".to_string(),
            hash,
            salt,
        );
        user.activate();
        self.users.insert(user.clone());
        user
    }
}

pub fn spawn_service() -> TestApp {
    let jwt_settings = JwtSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_expiry: TEST_ACCESS_EXPIRY,
        refresh_token_expiry: 604_800,
        issuer: "staff-api".to_string(),
    };
    let jwt = JwtService::new(&jwt_settings);
    let passwords = PasswordService::new(TEST_PBKDF2_ITERATIONS);
    let users = Arc::new(InMemoryUserStore::default());
    let tokens = Arc::new(InMemoryRefreshTokenStore::default());

    let service = AuthService::new(
        users.clone(),
        tokens.clone(),
        jwt.clone(),
        passwords.clone(),
        LockoutPolicy::default(),
    );

    TestApp {
        service,
        users,
        tokens,
        jwt,
        passwords,
    }
}
