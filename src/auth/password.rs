use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use tracing::error;

fn internal(context: &'static str, e: password_hash::Error) -> anyhow::Error {
    error!(error = %e, "{context}");
    anyhow::anyhow!("{context}: {e}")
}

/// Hash a password with argon2id and a random salt (PHC string format).
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| internal("password hashing failed", e))
}

/// `Ok(false)` only for a mismatch. A malformed stored hash or a verifier
/// failure is an error, so a broken record never looks like a wrong password.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| internal("stored password hash is malformed", e))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(internal("password verification failed", e)),
    }
}
