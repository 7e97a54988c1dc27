/// JWT claims
///
/// Payload of the signed tokens (RFC 7519 registered claims plus identity
/// fields). Access and refresh tokens share the structure; the audience
/// claim is the discriminator and is decoded into `TokenAudience` so a
/// mismatch is a typed error, never a string comparison in flow code.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Token purpose, carried in the `aud` claim.
///
/// Deserialization fails outright for any other audience string, so a token
/// from a foreign issuer family never reaches the flow layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAudience {
    #[serde(rename = "staff-api")]
    Api,
    #[serde(rename = "staff-refresh")]
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    pub aud: TokenAudience,
    /// Issuer
    pub iss: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Not valid before (Unix timestamp)
    pub nbf: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Claims for an access token: full identity, `staff-api` audience.
    pub fn access(
        user_id: Uuid,
        username: &str,
        email: &str,
        role_id: Option<Uuid>,
        expiry_seconds: i64,
        issuer: &str,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            user_id,
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            role_id,
            aud: TokenAudience::Api,
            iss: issuer.to_string(),
            exp: now + expiry_seconds,
            nbf: now,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Claims for a refresh token: user ID only, `staff-refresh` audience.
    /// Identity fields are re-fetched from the user store on use so they
    /// can never go stale inside a long-lived token.
    pub fn refresh(user_id: Uuid, expiry_seconds: i64, issuer: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            user_id,
            username: None,
            email: None,
            role_id: None,
            aud: TokenAudience::Refresh,
            iss: issuer.to_string(),
            exp: now + expiry_seconds,
            nbf: now,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Rejects claims whose audience differs from `expected`.
    pub fn require_audience(&self, expected: TokenAudience) -> Result<(), AppError> {
        if self.aud == expected {
            Ok(())
        } else {
            Err(AuthError::InvalidTokenType.into())
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}
