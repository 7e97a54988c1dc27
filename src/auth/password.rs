/// Password hashing and verification
///
/// PBKDF2-HMAC-SHA256 with an explicit per-user salt. The salt is stored
/// next to the hash (both hex-encoded) so verification can recompute the
/// digest; comparison is constant-time via `ring::pbkdf2::verify`.
/// The iteration count is configuration, not a compile-time constant.

use std::num::NonZeroU32;

use rand::{Rng, RngCore};
use ring::pbkdf2;

use crate::error::AppError;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const DEFAULT_ITERATIONS: NonZeroU32 = match NonZeroU32::new(600_000) {
    Some(n) => n,
    None => panic!("default iteration count must be nonzero"),
};
const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

#[derive(Clone)]
pub struct PasswordService {
    iterations: NonZeroU32,
}

impl PasswordService {
    pub fn new(iterations: u32) -> Self {
        Self {
            // An iteration count of zero would disable the KDF entirely.
            iterations: NonZeroU32::new(iterations).unwrap_or(DEFAULT_ITERATIONS),
        }
    }

    /// Hashes a password with a fresh 16-byte random salt.
    ///
    /// Returns `(hash, salt)`, both hex-encoded.
    pub fn hash(&self, password: &str) -> Result<(String, String), AppError> {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng()
            .try_fill_bytes(&mut salt)
            .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

        let mut out = [0u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut out,
        );

        Ok((hex::encode(out), hex::encode(salt)))
    }

    /// Recomputes the digest with the stored salt and compares it to the
    /// stored hash in constant time. Undecodable stored material verifies
    /// as false rather than erroring.
    pub fn verify(&self, password: &str, hash: &str, salt: &str) -> bool {
        let salt_bytes = match hex::decode(salt) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let hash_bytes = match hex::decode(hash) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &salt_bytes,
            password.as_bytes(),
            &hash_bytes,
        )
        .is_ok()
    }

    /// Produces a random password of the requested length, drawn uniformly
    /// from letters, digits, and a small symbol set.
    pub fn generate_random_password(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..PASSWORD_CHARSET.len());
                PASSWORD_CHARSET[idx] as char
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keep unit tests fast; production iteration count comes from config.
    const TEST_ITERATIONS: u32 = 1_000;

    fn service() -> PasswordService {
        PasswordService::new(TEST_ITERATIONS)
    }

    #[test]
    fn verify_succeeds_right_after_hash() {
        let service = service();
        let (hash, salt) = service.hash("CorrectHorse1!").expect("hash");
        assert!(service.verify("CorrectHorse1!", &hash, &salt));
    }

    #[test]
    fn verify_fails_for_wrong_password() {
        let service = service();
        let (hash, salt) = service.hash("CorrectHorse1!").expect("hash");
        assert!(!service.verify("wrong", &hash, &salt));
    }

    #[test]
    fn hashing_twice_yields_different_salts_and_hashes() {
        let service = service();
        let (hash1, salt1) = service.hash("SamePassword1!").expect("hash");
        let (hash2, salt2) = service.hash("SamePassword1!").expect("hash");

        assert_ne!(salt1, salt2);
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn salt_is_sixteen_bytes_hex_encoded() {
        let service = service();
        let (hash, salt) = service.hash("CorrectHorse1!").expect("hash");
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(hash.len(), HASH_LEN * 2);
        assert!(hex::decode(&salt).is_ok());
    }

    #[test]
    fn undecodable_stored_material_verifies_false() {
        let service = service();
        assert!(!service.verify("anything", "not-hex", "also-not-hex"));
    }

    #[test]
    fn random_password_has_requested_length_and_charset() {
        let service = service();
        let password = service.generate_random_password(24);
        assert_eq!(password.len(), 24);
        assert!(password
            .bytes()
            .all(|b| PASSWORD_CHARSET.contains(&b)));
    }

    #[test]
    fn random_passwords_differ() {
        let service = service();
        assert_ne!(
            service.generate_random_password(24),
            service.generate_random_password(24)
        );
    }
}
