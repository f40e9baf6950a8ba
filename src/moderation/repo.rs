use std::sync::Arc;

use tokio::sync::RwLock;

use crate::moderation::repo_types::ReportedComment;

/// Queue of reported comments, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ReportStore {
    reports: Arc<RwLock<Vec<ReportedComment>>>,
}

impl ReportStore {
    pub async fn push(&self, report: ReportedComment) {
        self.reports.write().await.push(report);
    }

    pub async fn all(&self) -> Vec<ReportedComment> {
        self.reports.read().await.clone()
    }

    /// Mark every report of `comment_id` resolved. `false` if none matched.
    pub async fn resolve(&self, comment_id: &str) -> bool {
        let mut reports = self.reports.write().await;
        let mut found = false;
        for report in reports.iter_mut().filter(|r| r.comment_id == comment_id) {
            report.resolved = true;
            found = true;
        }
        found
    }

    /// Drop every report of `comment_id`. `false` if none matched.
    pub async fn delete(&self, comment_id: &str) -> bool {
        let mut reports = self.reports.write().await;
        let before = reports.len();
        reports.retain(|r| r.comment_id != comment_id);
        reports.len() < before
    }
}
