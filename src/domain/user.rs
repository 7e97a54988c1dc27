/// User entity
///
/// Carries the credential material, account status, and the lockout state
/// machine. Lockout thresholds come from configuration via `LockoutPolicy`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Inactive,
    Pending,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Inactive => "INACTIVE",
            UserStatus::Pending => "PENDING",
            UserStatus::Blocked => "BLOCKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(UserStatus::Active),
            "INACTIVE" => Some(UserStatus::Inactive),
            "PENDING" => Some(UserStatus::Pending),
            "BLOCKED" => Some(UserStatus::Blocked),
            _ => None,
        }
    }
}

/// Failed-login thresholds, sourced from `SecuritySettings`
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration: Duration::minutes(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub status: UserStatus,
    pub role_id: Option<Uuid>,
    pub login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl User {
    pub fn new(
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        password_hash: String,
        password_salt: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            first_name,
            last_name,
            password_hash,
            password_salt,
            status: UserStatus::Pending,
            role_id: None,
            login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            version: 1,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// True iff the lock window is set and has not yet elapsed.
    pub fn is_locked(&self) -> bool {
        match self.locked_until {
            Some(until) => until > Utc::now(),
            None => false,
        }
    }

    /// Increments the failed-attempt counter; reaching the threshold opens
    /// the lock window.
    pub fn record_failed_login(&mut self, policy: &LockoutPolicy) {
        self.login_attempts += 1;
        if self.login_attempts >= policy.max_attempts as i32 {
            self.locked_until = Some(Utc::now() + policy.lockout_duration);
        }
        self.touch();
    }

    /// Marks a successful login: stamps `last_login_at`, zeroes the
    /// attempt counter, and clears any lock window.
    pub fn record_login(&mut self) {
        self.last_login_at = Some(Utc::now());
        self.login_attempts = 0;
        self.locked_until = None;
        self.touch();
    }

    /// Administrative reset of the attempt counter and lock window.
    pub fn unlock(&mut self) {
        self.login_attempts = 0;
        self.locked_until = None;
        self.touch();
    }

    pub fn activate(&mut self) {
        self.status = UserStatus::Active;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.status = UserStatus::Inactive;
        self.touch();
    }

    pub fn block(&mut self) {
        self.status = UserStatus::Blocked;
        self.touch();
    }

    /// Bumps `updated_at` and the optimistic-lock version.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }

    /// Public projection of the record: credential material excluded.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            status: self.status,
        }
    }
}

/// User fields safe to return over the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub status: UserStatus,
}
