//! Comment entity.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub body: String,
    pub published_at: DateTime<Utc>,
    pub book_id: i64,
    pub user_id: String,
    pub user_email: String,
    /// Soft-delete marker; deleted comments are hidden from every read.
    pub is_deleted: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub body: String,
    pub user_id: String,
    pub user_email: String,
}
