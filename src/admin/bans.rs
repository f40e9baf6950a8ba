use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Audit entry for one ban.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    pub user_id: Uuid,
    pub admin_id: Uuid,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BanLedger {
    records: Arc<RwLock<Vec<BanRecord>>>,
}

impl BanLedger {
    pub async fn record(&self, record: BanRecord) {
        self.records.write().await.push(record);
    }

    /// Close every active record for `user_id`. Returns how many were closed.
    pub async fn close_active(&self, user_id: Uuid, now: OffsetDateTime) -> usize {
        let mut records = self.records.write().await;
        let mut closed = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.user_id == user_id && r.is_active)
        {
            record.is_active = false;
            record.end_date = Some(now);
            closed += 1;
        }
        closed
    }

    pub async fn history(&self, user_id: Uuid) -> Vec<BanRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}
