/// Application error handling.
///
/// A unified error type covering input validation, authentication outcomes,
/// store failures, and configuration problems, with a single mapping to
/// HTTP responses and structured logging at the response boundary.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    SuspiciousContent(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and token errors
#[derive(Debug, Clone)]
pub enum AuthError {
    InvalidCredentials,
    AccountLocked { locked_until: Option<DateTime<Utc>> },
    AccountNotActive,
    InvalidToken,
    InvalidTokenType,
    UserNotFound,
    MissingAuthHeader,
    MalformedAuthHeader,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::AccountLocked { locked_until } => match locked_until {
                Some(until) => write!(
                    f,
                    "Account is locked due to too many failed login attempts (until {})",
                    until.to_rfc3339()
                ),
                None => write!(f, "Account is locked due to too many failed login attempts"),
            },
            AuthError::AccountNotActive => write!(f, "Account is not active"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::InvalidTokenType => write!(f, "Invalid token type for this operation"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::MalformedAuthHeader => {
                write!(f, "Authorization header must start with 'Bearer '")
            }
        }
    }
}

impl StdError for AuthError {}

/// Store operation errors
#[derive(Debug)]
pub enum DatabaseError {
    /// An optimistic-locked update found a different version than expected.
    VersionConflict(&'static str),
    NotFound(&'static str),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::VersionConflict(entity) => {
                write!(f, "{} was modified concurrently", entity)
            }
            DatabaseError::NotFound(entity) => write!(f, "{} not found", entity),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Database(DatabaseError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl AppError {
    /// True when the error is the transient concurrent-modification signal.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, AppError::Database(DatabaseError::VersionConflict(_)))
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                AppError::Database(DatabaseError::NotFound("record"))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            sqlx::Error::Database(_) => {
                AppError::Database(DatabaseError::QueryExecution(err.to_string()))
            }
            _ => AppError::Database(DatabaseError::UnexpectedError(err.to_string())),
        }
    }
}

/// Error response body returned to clients
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
    pub timestamp: String,
}

impl AppError {
    fn response_parts(&self) -> (StatusCode, &'static str, String, Option<DateTime<Utc>>) {
        match self {
            AppError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string(), None)
            }
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Invalid credentials".to_string(),
                    None,
                ),
                AuthError::AccountLocked { locked_until } => (
                    StatusCode::LOCKED,
                    "ACCOUNT_LOCKED",
                    "Account is locked due to too many failed login attempts".to_string(),
                    *locked_until,
                ),
                AuthError::AccountNotActive => (
                    StatusCode::UNAUTHORIZED,
                    "ACCOUNT_NOT_ACTIVE",
                    "Account is not active".to_string(),
                    None,
                ),
                AuthError::InvalidToken => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid or expired token".to_string(),
                    None,
                ),
                AuthError::InvalidTokenType => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_TYPE_INVALID",
                    "Invalid token type for this operation".to_string(),
                    None,
                ),
                AuthError::UserNotFound => (
                    StatusCode::UNAUTHORIZED,
                    "USER_NOT_FOUND",
                    "User not found".to_string(),
                    None,
                ),
                AuthError::MissingAuthHeader | AuthError::MalformedAuthHeader => (
                    StatusCode::UNAUTHORIZED,
                    "MISSING_TOKEN",
                    e.to_string(),
                    None,
                ),
            },
            AppError::Database(e) => match e {
                DatabaseError::VersionConflict(_) => {
                    (StatusCode::CONFLICT, "VERSION_CONFLICT", e.to_string(), None)
                }
                DatabaseError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string(), None)
                }
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                    None,
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                ),
            },
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
                None,
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            ),
        }
    }

    fn log(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Database(DatabaseError::VersionConflict(entity)) => {
                tracing::warn!(request_id = request_id, entity = entity, "Version conflict");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log(&request_id);

        let (status, code, message, locked_until) = self.response_parts();
        HttpResponse::build(status).json(ErrorResponse {
            error_id: request_id,
            message,
            code: code.to_string(),
            status: status.as_u16(),
            locked_until,
            timestamp: Utc::now().to_rfc3339(),
        })
    }

    fn status_code(&self) -> StatusCode {
        self.response_parts().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_maps_to_401() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn account_locked_maps_to_423() {
        let err = AppError::Auth(AuthError::AccountLocked {
            locked_until: Some(Utc::now()),
        });
        assert_eq!(err.status_code(), StatusCode::LOCKED);
    }

    #[test]
    fn version_conflict_maps_to_409() {
        let err = AppError::Database(DatabaseError::VersionConflict("user"));
        assert!(err.is_version_conflict());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn token_errors_map_to_401() {
        for err in [
            AppError::Auth(AuthError::InvalidToken),
            AppError::Auth(AuthError::InvalidTokenType),
            AppError::Auth(AuthError::MissingAuthHeader),
            AppError::Auth(AuthError::MalformedAuthHeader),
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::TooShort("username", 3);
        assert_eq!(err.to_string(), "username is too short (minimum 3 characters)");
    }
}
