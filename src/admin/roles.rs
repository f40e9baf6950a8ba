use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{auth::repo_types::UserRecord, error::AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageContent,
    ManageComments,
    ManageRoles,
    BanUsers,
    DeleteUsers,
    ViewAnalytics,
    ManageSettings,
    CreateContent,
    EditOwnContent,
    CreateComments,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    Contributor,
    #[default]
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Moderator, Role::Contributor, Role::User];

    pub fn id(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Contributor => "contributor",
            Role::User => "user",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Moderator => "Moderator",
            Role::Contributor => "Contributor",
            Role::User => "User",
        }
    }

    pub fn permissions(self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => &[
                ManageUsers,
                ManageContent,
                ManageComments,
                ManageRoles,
                BanUsers,
                DeleteUsers,
                ViewAnalytics,
                ManageSettings,
            ],
            Role::Moderator => &[ManageComments, BanUsers, ViewAnalytics],
            Role::Contributor => &[CreateContent, EditOwnContent],
            Role::User => &[CreateComments],
        }
    }

    /// Listing order: lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::Moderator => 1,
            Role::Contributor => 2,
            Role::User => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AuthError::validation(format!("Unknown role '{s}'")))
    }
}

/// Role permissions plus any permissions granted to the user directly.
pub fn has_permission(user: &UserRecord, permission: Permission) -> bool {
    user.role.permissions().contains(&permission) || user.custom_permissions.contains(&permission)
}
