//! Threaded comments on posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, PostId, UserId};

/// Stored comment.
///
/// ## Invariants
/// - `parent_id`, when set, names a comment on the same post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier.
    pub id: CommentId,
    /// Author.
    pub user_id: UserId,
    /// Post the comment belongs to.
    pub post_id: PostId,
    /// Comment being replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    /// Body text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Payload for a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Author.
    pub user_id: UserId,
    /// Target post.
    pub post_id: PostId,
    /// Optional comment being replied to.
    pub parent_id: Option<CommentId>,
    /// Body text.
    pub content: String,
}

/// Summary of the comment a reply points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentComment {
    /// Parent identifier.
    pub id: CommentId,
    /// Parent author.
    pub user_id: UserId,
    /// Parent body text.
    pub content: String,
    /// Parent creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Comment enriched with its author's username and its parent summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentWithParentAndUser {
    /// Comment identifier.
    pub id: CommentId,
    /// Author.
    pub user_id: UserId,
    /// Author handle.
    pub username: String,
    /// Post the comment belongs to.
    pub post_id: PostId,
    /// Body text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Parent summary for replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<ParentComment>,
}

impl CommentWithParentAndUser {
    /// Assemble the enriched view.
    pub fn new(comment: Comment, username: String, parent_comment: Option<ParentComment>) -> Self {
        Self {
            id: comment.id,
            user_id: comment.user_id,
            username,
            post_id: comment.post_id,
            content: comment.content,
            created_at: comment.created_at,
            parent_comment,
        }
    }
}
