use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::repo_types::UserRecord,
    error::{AuthError, AuthResult},
};

/// In-memory credential store.
///
/// Cloning shares the underlying list, so every service built from the same
/// `AppState` sees the same users while separate states stay isolated.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: Arc<RwLock<Vec<UserRecord>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a user by email, ignoring case.
    pub async fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let users = self.users.read().await;
        users.iter().find(|u| eq_ci(&u.email, email)).cloned()
    }

    /// Find a user by username, ignoring case.
    pub async fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        let users = self.users.read().await;
        users.iter().find(|u| eq_ci(&u.username, username)).cloned()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<UserRecord> {
        let users = self.users.read().await;
        users.iter().find(|u| u.id == id).cloned()
    }

    pub async fn find_by_reset_token(&self, token: &str) -> Option<UserRecord> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned()
    }

    /// Insert a new user. Email and username must both be unused.
    pub async fn insert(&self, user: UserRecord) -> AuthResult<UserRecord> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| eq_ci(&u.email, &user.email)) {
            return Err(AuthError::conflict("Email already in use"));
        }
        if users.iter().any(|u| eq_ci(&u.username, &user.username)) {
            return Err(AuthError::conflict("Username already taken"));
        }

        users.push(user.clone());
        info!(user_id = %user.id, email = %user.email, "user stored");
        Ok(user)
    }

    /// Mutate a user in place. Returns `None` when the id is unknown.
    pub async fn update<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut UserRecord) -> R,
    {
        let mut users = self.users.write().await;
        users.iter_mut().find(|u| u.id == id).map(f)
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() < before
    }

    pub async fn all(&self) -> Vec<UserRecord> {
        self.users.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
