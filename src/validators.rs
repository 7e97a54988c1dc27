/// Request-field validators
///
/// Screens credential fields before any flow logic runs:
/// length limits against oversized payloads, a charset check for
/// usernames, and a control-character screen for both fields.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 100;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap();
}

/// Validates a login username: trimmed, 3-50 chars, letters/digits/._- only.
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }
    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username", MIN_USERNAME_LENGTH));
    }
    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username", MAX_USERNAME_LENGTH));
    }
    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username"));
    }

    Ok(trimmed.to_string())
}

/// Validates a login password field. Content rules are not enforced here
/// (the stored hash decides); only size and control-character screening.
pub fn is_valid_password_input(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }
    if password.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("password"));
    }

    Ok(())
}

/// Validates a refresh-token field: present and shaped like a compact JWS.
pub fn is_valid_token_input(token: &str) -> Result<(), ValidationError> {
    let trimmed = token.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token"));
    }
    if trimmed.len() > 2048 {
        return Err(ValidationError::TooLong("refresh_token", 2048));
    }
    if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ValidationError::SuspiciousContent("refresh_token"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_usernames() {
        assert_eq!(is_valid_username("alice").unwrap(), "alice");
        assert_eq!(is_valid_username("  alice  ").unwrap(), "alice");
        assert!(is_valid_username("john.doe-01_x").is_ok());
    }

    #[test]
    fn invalid_usernames() {
        assert!(is_valid_username("").is_err());
        assert!(is_valid_username("ab").is_err());
        assert!(is_valid_username(&"a".repeat(51)).is_err());
        assert!(is_valid_username("alice smith").is_err());
        assert!(is_valid_username("alice;drop").is_err());
        assert!(is_valid_username("alice\0").is_err());
    }

    #[test]
    fn valid_password_inputs() {
        assert!(is_valid_password_input("CorrectHorse1!").is_ok());
    }

    #[test]
    fn invalid_password_inputs() {
        assert!(is_valid_password_input("").is_err());
        assert!(is_valid_password_input("short").is_err());
        assert!(is_valid_password_input(&"a".repeat(101)).is_err());
        assert!(is_valid_password_input("password\u{0007}1").is_err());
    }

    #[test]
    fn token_input_rules() {
        assert!(is_valid_token_input("aaa.bbb.ccc").is_ok());
        assert!(is_valid_token_input("").is_err());
        assert!(is_valid_token_input("aaa bbb").is_err());
        assert!(is_valid_token_input(&"a".repeat(3000)).is_err());
    }
}
