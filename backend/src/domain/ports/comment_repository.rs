//! Port for threaded comments.

use async_trait::async_trait;

use crate::domain::{CommentId, CommentWithParentAndUser, NewComment, PostId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by comment repository adapters.
    pub enum CommentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "comment repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "comment repository query failed: {message}",
        /// The operation did not finish within the query timeout.
        Timeout { timeout_ms: u64 } => "comment repository query timed out after {timeout_ms} ms",
        /// The target post does not exist.
        PostNotFound => "post not found",
        /// The parent comment does not exist on the target post.
        ParentNotFound => "parent comment not found",
        /// The author account does not exist.
        AuthorNotFound => "comment author not found",
    }
}

/// Comment storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment and bump the post's comment counter in one
    /// transaction. Any failure leaves neither change behind.
    async fn create(
        &self,
        comment: &NewComment,
    ) -> Result<CommentWithParentAndUser, CommentRepositoryError>;

    /// Whether a comment exists.
    async fn exists(&self, id: &CommentId) -> Result<bool, CommentRepositoryError>;

    /// Comments on a post, newest first, with usernames and parent
    /// summaries resolved in batch.
    async fn by_post(
        &self,
        post: &PostId,
    ) -> Result<Vec<CommentWithParentAndUser>, CommentRepositoryError>;
}
