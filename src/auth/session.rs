use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::storage::LocalStorage;

/// Local storage key holding the active session.
pub const SESSION_KEY: &str = "animeverse-auth";

/// Persisted "signed in" marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
}

/// Reads and writes the single session entry in local storage.
#[derive(Clone)]
pub struct SessionHolder {
    storage: Arc<dyn LocalStorage>,
}

impl SessionHolder {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Absent, unreadable or unparsable sessions all read as `None`.
    pub async fn load(&self) -> Option<Session> {
        let raw = match self.storage.get_item(SESSION_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "session storage read failed");
                return None;
            }
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "stored session is malformed");
                None
            }
        }
    }

    pub async fn save(&self, session: &Session) -> anyhow::Result<()> {
        let body = serde_json::to_string(session)?;
        self.storage.set_item(SESSION_KEY, &body).await
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.storage.remove_item(SESSION_KEY).await
    }
}
