//! Password hashing and verification.
//!
//! BCrypt with the crate's default cost. Hashing failure is fatal for the
//! registering session; verification failure (including a malformed stored
//! digest) is just a failed login.

use bcrypt::{BcryptError, DEFAULT_COST};

/// Hash a plaintext password for storage.
pub fn hash_password(plain: &str) -> Result<String, BcryptError> {
    bcrypt::hash(plain, DEFAULT_COST)
}

/// Check a plaintext password against a stored digest.
pub fn verify_password(plain: &str, digest: &str) -> bool {
    bcrypt::verify(plain, digest).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let digest = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &digest));
        assert!(!verify_password("wrong", &digest));
    }

    #[test]
    fn malformed_digest_fails_closed() {
        assert!(!verify_password("s3cret", "not-a-bcrypt-digest"));
    }
}
