use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    admin::roles::{has_permission, Permission},
    auth::repo::CredentialStore,
    error::{AuthError, AuthResult},
    moderation::{
        repo::ReportStore,
        repo_types::{MovieComment, ReportedComment},
    },
    state::AppState,
};

#[derive(Clone)]
pub struct ModerationService {
    users: CredentialStore,
    reports: ReportStore,
}

impl From<&AppState> for ModerationService {
    fn from(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            reports: state.reports.clone(),
        }
    }
}

impl ModerationService {
    pub fn new(state: &AppState) -> Self {
        Self::from(state)
    }

    async fn authorize(&self, actor_id: Uuid) -> AuthResult<()> {
        match self.users.find_by_id(actor_id).await {
            Some(actor)
                if !actor.is_banned_at(OffsetDateTime::now_utc())
                    && has_permission(&actor, Permission::ManageComments) =>
            {
                Ok(())
            }
            _ => {
                warn!(actor_id = %actor_id, "moderation action denied");
                Err(AuthError::forbidden())
            }
        }
    }

    /// Any existing user may report a comment.
    #[instrument(skip(self, comment))]
    pub async fn report_comment(
        &self,
        reporter_id: Uuid,
        movie_id: &str,
        reason: &str,
        comment: MovieComment,
    ) -> AuthResult<ReportedComment> {
        if self.users.find_by_id(reporter_id).await.is_none() {
            return Err(AuthError::not_found("User not found"));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AuthError::validation("Please provide a reason for the report"));
        }

        let report = ReportedComment {
            comment_id: comment.id.clone(),
            movie_id: movie_id.to_string(),
            reported_by: reporter_id,
            reason: reason.to_string(),
            timestamp: OffsetDateTime::now_utc(),
            resolved: false,
            comment,
        };
        self.reports.push(report.clone()).await;

        info!(comment_id = %report.comment_id, movie_id = %movie_id, "comment reported");
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn reported_comments(&self, actor_id: Uuid) -> AuthResult<Vec<ReportedComment>> {
        self.authorize(actor_id).await?;
        Ok(self.reports.all().await)
    }

    #[instrument(skip(self))]
    pub async fn resolve_report(&self, actor_id: Uuid, comment_id: &str) -> AuthResult<()> {
        self.authorize(actor_id).await?;
        if !self.reports.resolve(comment_id).await {
            return Err(AuthError::not_found("Report not found"));
        }
        info!(actor_id = %actor_id, comment_id = %comment_id, "report resolved");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_report(&self, actor_id: Uuid, comment_id: &str) -> AuthResult<()> {
        self.authorize(actor_id).await?;
        if !self.reports.delete(comment_id).await {
            return Err(AuthError::not_found("Report not found"));
        }
        info!(actor_id = %actor_id, comment_id = %comment_id, "report deleted");
        Ok(())
    }
}
