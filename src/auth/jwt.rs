/// JWT issuance and validation
///
/// Signs and verifies the access/refresh token pair. The signing secret and
/// lifetimes are fixed at construction; the service holds no mutable state
/// and is cheap to clone into handlers.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenAudience};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

const BEARER_PREFIX: &str = "Bearer ";

/// Access/refresh token pair handed back to clients
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    issuer: String,
}

impl JwtService {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            access_token_expiry: settings.access_token_expiry,
            refresh_token_expiry: settings.refresh_token_expiry,
            issuer: settings.issuer.clone(),
        }
    }

    /// Access-token lifetime in seconds, as reported in `expires_in`.
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Issues a signed access/refresh pair for the given identity.
    ///
    /// The refresh token carries only the user ID; username, email, and role
    /// are re-read from the user store when the token is exchanged.
    pub fn issue_token_pair(
        &self,
        user_id: Uuid,
        username: &str,
        email: &str,
        role_id: Option<Uuid>,
    ) -> Result<TokenPair, AppError> {
        let access_claims = Claims::access(
            user_id,
            username,
            email,
            role_id,
            self.access_token_expiry,
            &self.issuer,
        );
        let refresh_claims = Claims::refresh(user_id, self.refresh_token_expiry, &self.issuer);

        let access_token = self.sign(&access_claims)?;
        let refresh_token = self.sign(&refresh_claims)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_token_expiry,
            token_type: "Bearer".to_string(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verifies signature, issuer, expiry, and not-before.
    ///
    /// Only HS256 is accepted; a token whose header names any other
    /// algorithm fails signature validation outright.
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_nbf = true;
        // Audience is a typed claim; callers check it with
        // `require_audience`, not here as a string.
        validation.validate_aud = false;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT validation error: {}", e);
                AuthError::InvalidToken.into()
            })
    }

    /// Exchanges a refresh token for a brand-new pair.
    ///
    /// The presented token must validate and must carry the refresh
    /// audience; an access token presented here is rejected as
    /// `InvalidTokenType`.
    pub fn refresh(
        &self,
        refresh_token: &str,
        username: &str,
        email: &str,
        role_id: Option<Uuid>,
    ) -> Result<TokenPair, AppError> {
        let claims = self.validate(refresh_token)?;
        claims.require_audience(TokenAudience::Refresh)?;
        self.issue_token_pair(claims.user_id, username, email, role_id)
    }

    /// Strips the `"Bearer "` prefix (exact, case-sensitive) from an
    /// Authorization header value.
    pub fn extract_bearer(header: &str) -> Result<&str, AppError> {
        if header.is_empty() {
            return Err(AuthError::MissingAuthHeader.into());
        }
        header
            .strip_prefix(BEARER_PREFIX)
            .ok_or_else(|| AuthError::MalformedAuthHeader.into())
    }
}
