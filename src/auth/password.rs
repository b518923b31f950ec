//! Credential hashing for stored user passwords.
//!
//! Hashes are Argon2id PHC strings with a per-password random salt. The
//! plain password is used exactly as given, surrounding spaces included.
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

fn hashing_failed(stage: &'static str, err: password_hash::Error) -> anyhow::Error {
    error!(error = %err, stage, "password hashing failed");
    anyhow::anyhow!("password {stage} failed: {err}")
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| hashing_failed("hash", e))
}

/// `Ok(false)` on a wrong password, `Err` only when `stored` is not a PHC string.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| hashing_failed("parse", e))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(hashing_failed("verify", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_accepts_right_and_rejects_wrong() {
        let hash = hash_password("correct-horse-battery").unwrap();
        assert!(verify_password("correct-horse-battery", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn surrounding_spaces_are_significant() {
        let hash = hash_password("  padded secret ").unwrap();
        assert!(verify_password("  padded secret ", &hash).unwrap());
        assert!(!verify_password("padded secret", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
