use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub kind: EmailKind,
    pub token: String,
}

/// Outbound mail collaborator. No real transport ships with the crate.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

/// Logs each message instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %email.to, kind = ?email.kind, "email dispatched");
        Ok(())
    }
}

/// Keeps every message in an outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<RwLock<Vec<OutgoingEmail>>>,
}

impl MemoryMailer {
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox.read().await.clone()
    }

    /// Token of the most recent message of `kind` sent to `to`.
    pub async fn last_token_for(&self, to: &str, kind: EmailKind) -> Option<String> {
        self.outbox
            .read()
            .await
            .iter()
            .rev()
            .find(|m| m.kind == kind && m.to.eq_ignore_ascii_case(to))
            .map(|m| m.token.clone())
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        self.outbox.write().await.push(email);
        Ok(())
    }
}
