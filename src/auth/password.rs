use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use super::errors::PasswordError;

/// Longest secret accepted, in bytes. Longer input is refused instead of
/// being truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::TooLong {
            max: MAX_PASSWORD_BYTES,
        });
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Checks `plain` against a stored PHC hash. Unparseable hashes simply do not
/// match; an empty stored hash means the record itself is damaged.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    if hash.trim().is_empty() {
        error!("stored password hash is empty");
        return Err(PasswordError::CorruptHash);
    }
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "argon2 parse hash error");
            return Ok(false);
        }
    };
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_secret_hashes_differently() {
        let a = hash_password("pw").unwrap();
        let b = hash_password("pw").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("pw", &a).unwrap());
        assert!(verify_password("pw", &b).unwrap());
    }

    #[test]
    fn malformed_hash_does_not_match() {
        assert!(!verify_password("anything", "not-a-valid-hash").unwrap());
        assert!(!verify_password("anything", "$argon2id$garbage").unwrap());
    }

    #[test]
    fn empty_hash_is_corruption() {
        let err = verify_password("anything", "").unwrap_err();
        assert!(matches!(err, PasswordError::CorruptHash));
    }

    #[test]
    fn overlong_secret_is_rejected() {
        let long = "x".repeat(MAX_PASSWORD_BYTES + 1);
        let err = hash_password(&long).unwrap_err();
        assert!(matches!(err, PasswordError::TooLong { max: 72 }));

        let edge = "x".repeat(MAX_PASSWORD_BYTES);
        let hash = hash_password(&edge).expect("72 bytes is accepted");
        assert!(verify_password(&edge, &hash).unwrap());
    }
}
