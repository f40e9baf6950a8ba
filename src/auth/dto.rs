use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

use crate::{admin::roles::Role, auth::repo_types::UserRecord, error::AuthError};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const RESET_REQUESTED: &str =
    "If your email is registered, you will receive a password reset link";

/// Public part of the user returned to callers. Secrets are never copied in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            is_verified: user.is_verified,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Profile fields a user may change. Empty values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

/// Result of `verify_email`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailVerification {
    Verified,
    TokenSent,
}

impl EmailVerification {
    pub fn message(self) -> &'static str {
        match self {
            EmailVerification::Verified => "Email verified successfully",
            EmailVerification::TokenSent => "Verification email sent",
        }
    }
}

/// Uniform `{success, message?, user?}` shape handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            user: None,
        }
    }

    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            user: None,
        }
    }

    pub fn with_user(user: PublicUser) -> Self {
        Self {
            success: true,
            message: None,
            user: Some(user),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            user: None,
        }
    }

    /// Expected errors keep their message; internal ones are logged and
    /// replaced by `fallback`.
    pub fn from_error(err: AuthError, fallback: &str) -> Self {
        if err.is_internal() {
            error!(error = %err, "{fallback}");
            Self::failure(fallback)
        } else {
            Self::failure(err.to_string())
        }
    }
}
