/// Refresh token entity
///
/// Server-side record of an issued refresh token. Only the SHA-256 digest
/// of the token string is kept; lookups hash the presented string first.
/// The {valid -> revoked} transition is one-way.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hash a refresh token for storage. Plaintext tokens never hit the database.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl RefreshToken {
    /// Creates a record for a freshly issued token string.
    pub fn new(
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash: hash_token(token),
            expires_at,
            revoked: false,
            revoked_at: None,
            ip_address,
            user_agent,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            version: 1,
        }
    }

    pub fn revoke(&mut self) {
        self.revoked = true;
        self.revoked_at = Some(Utc::now());
        self.touch();
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Usable iff not revoked and not expired.
    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fresh_token() -> RefreshToken {
        RefreshToken::new(
            Uuid::new_v4(),
            "some-opaque-token",
            Utc::now() + Duration::days(7),
            Some("127.0.0.1".to_string()),
            Some("test-agent".to_string()),
        )
    }

    #[test]
    fn new_token_is_valid() {
        let token = fresh_token();
        assert!(token.is_valid());
        assert!(!token.revoked);
        assert!(token.revoked_at.is_none());
    }

    #[test]
    fn revoked_token_is_not_valid() {
        let mut token = fresh_token();
        let before = token.version;
        token.revoke();

        assert!(token.revoked);
        assert!(token.revoked_at.is_some());
        assert!(!token.is_valid());
        assert_eq!(token.version, before + 1);
    }

    #[test]
    fn expired_token_is_not_valid() {
        let mut token = fresh_token();
        token.expires_at = Utc::now() - Duration::seconds(1);
        assert!(token.is_expired());
        assert!(!token.is_valid());
    }

    #[test]
    fn token_hash_is_stable_and_opaque() {
        let raw = "some-opaque-token";
        assert_eq!(hash_token(raw), hash_token(raw));
        assert_ne!(hash_token(raw), raw);
        // SHA-256 hex
        assert_eq!(hash_token(raw).len(), 64);
        assert_ne!(hash_token(raw), hash_token("other-token"));
    }

    #[test]
    fn stored_hash_matches_presented_token() {
        let token = fresh_token();
        assert_eq!(token.token_hash, hash_token("some-opaque-token"));
    }
}
