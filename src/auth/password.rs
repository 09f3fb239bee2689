use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{AppError, AppResult};

#[cfg(not(test))]
fn hasher() -> AppResult<Argon2<'static>> {
    Ok(Argon2::default())
}

// Unoptimised test builds make the default cost painfully slow.
#[cfg(test)]
fn hasher() -> AppResult<Argon2<'static>> {
    use argon2::{Algorithm, Params, Version};
    let params = Params::new(1024, 1, 1, None)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {e}")))
}

/// Parameters are read back from the stored PHC string, so hashes made
/// with any cost settings verify here.
pub fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Malformed password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
