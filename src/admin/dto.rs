use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    admin::{
        bans::BanRecord,
        roles::{Permission, Role},
    },
    auth::repo_types::UserRecord,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Banned,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Matched against username, display name and email, ignoring case.
    pub search: Option<String>,
    pub role: Option<Role>,
    #[serde(default)]
    pub status: StatusFilter,
}

impl UserFilter {
    pub fn matches(&self, user: &UserRecord, now: OffsetDateTime) -> bool {
        if self.role.is_some_and(|role| user.role != role) {
            return false;
        }
        let banned = user.is_banned_at(now);
        match self.status {
            StatusFilter::Active if banned => return false,
            StatusFilter::Banned if !banned => return false,
            _ => {}
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [&user.username, &user.display_name, &user.email]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDuration {
    Permanent,
    Days(u32),
}

#[derive(Debug, Clone)]
pub struct BanRequest {
    pub reason: String,
    pub duration: BanDuration,
    pub notes: Option<String>,
}

/// What the admin panel sees about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub custom_permissions: Vec<Permission>,
    pub is_verified: bool,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ban_expiry: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub join_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
}

impl AdminUserView {
    pub fn from_record(user: &UserRecord, now: OffsetDateTime) -> Self {
        let ban = user.ban.as_ref().filter(|_| user.is_banned_at(now));
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            role: user.role,
            custom_permissions: user.custom_permissions.clone(),
            is_verified: user.is_verified,
            is_banned: ban.is_some(),
            ban_reason: ban.map(|b| b.reason.clone()),
            ban_expiry: ban.and_then(|b| b.expires_at),
            join_date: user.created_at,
            last_active: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub user: AdminUserView,
    pub ban_history: Vec<BanRecord>,
}
