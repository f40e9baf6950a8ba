use time::OffsetDateTime;
use uuid::Uuid;

use crate::admin::roles::{Permission, Role};

/// Active suspension attached to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanStatus {
    pub reason: String,
    pub expires_at: Option<OffsetDateTime>, // None = permanent
}

/// User record held by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub role: Role,
    pub custom_permissions: Vec<Permission>,
    pub ban: Option<BanStatus>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub password_hash: String, // argon2 PHC string, never exposed
    pub verification_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_expiry: Option<OffsetDateTime>,
}

impl UserRecord {
    /// Fresh, unverified account with the default role.
    pub fn new(email: &str, username: &str, password_hash: String) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            display_name: username.to_string(),
            avatar: None,
            bio: None,
            is_verified: false,
            role: Role::default(),
            custom_permissions: Vec::new(),
            ban: None,
            created_at: now,
            updated_at: now,
            password_hash,
            verification_token: Some(Uuid::new_v4().to_string()),
            reset_token: None,
            reset_expiry: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }

    /// A ban whose expiry has passed no longer counts.
    pub fn is_banned_at(&self, now: OffsetDateTime) -> bool {
        match &self.ban {
            Some(ban) => ban.expires_at.map_or(true, |exp| now < exp),
            None => false,
        }
    }
}
