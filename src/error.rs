use thiserror::Error;

/// Failure taxonomy shared by the auth, admin and moderation services.
///
/// Expected failures carry the exact message shown to the user. Anything
/// unexpected (storage, hashing, mail) lands in `Internal` and is replaced
/// by a generic message at the `AuthOutcome` boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or too-short input, rejected before touching a store.
    #[error("{0}")]
    Validation(String),

    /// Duplicate email or username.
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials or a bad/expired token. Kept low-information.
    #[error("{0}")]
    Unauthorized(String),

    /// Referenced user or record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Acting user lacks the permission for an admin operation.
    #[error("{0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("Insufficient permissions".into())
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
