use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
    pub avatar: Option<String>,
}

/// Snapshot of the comment at the time it was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieComment {
    pub id: String,
    pub user: CommentAuthor,
    pub rating: u8, // 1..=5 stars
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub content: String,
    pub likes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedComment {
    pub comment_id: String,
    pub movie_id: String,
    pub reported_by: Uuid,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub resolved: bool,
    pub comment: MovieComment,
}
