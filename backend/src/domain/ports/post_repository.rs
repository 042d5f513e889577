//! Port for posts: feeds, search, trending, likes and versioned edits.

use async_trait::async_trait;
use pagination::Page;

use crate::domain::{
    FeedQuery, NewPost, Post, PostId, PostUpdate, PostWithLikeStatus, UserId, Viewer,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by post repository adapters.
    pub enum PostRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "post repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "post repository query failed: {message}",
        /// The operation did not finish within the query timeout.
        Timeout { timeout_ms: u64 } => "post repository query timed out after {timeout_ms} ms",
        /// No post matches the identifier.
        NotFound => "post not found",
        /// The stored version differs from the one the edit was based on.
        VersionConflict { expected: i64, actual: i64 } =>
            "post version conflict: expected {expected}, found {actual}",
    }
}

/// Post storage and listing.
///
/// # Listing semantics
///
/// Listings walk posts in creation order. Following and mention filters apply
/// to [`Viewer::Member`] only; a following-only listing for a member who
/// follows nobody is an empty page. Every listed post is annotated with
/// whether the viewer likes it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post with an empty like-set, zero counters and version 1.
    async fn create(&self, post: &NewPost) -> Result<Post, PostRepositoryError>;

    /// Whether a post exists.
    async fn exists(&self, id: &PostId) -> Result<bool, PostRepositoryError>;

    /// Cursor-paginated feed.
    async fn feed(
        &self,
        viewer: &Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError>;

    /// Top posts by likes plus comments, newest first on ties. Never
    /// paginated.
    async fn trending(
        &self,
        viewer: &Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError>;

    /// Feed restricted to posts whose title, content or a tag contains
    /// `text`, ignoring case.
    async fn search(
        &self,
        viewer: &Viewer,
        text: &str,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError>;

    /// Fetch a post.
    async fn get_by_id(&self, id: &PostId) -> Result<Post, PostRepositoryError>;

    /// Cursor-paginated posts by one author.
    async fn by_author(
        &self,
        author: &UserId,
        viewer: &Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError>;

    /// Number of posts by one author.
    async fn count_by_author(&self, author: &UserId) -> Result<i64, PostRepositoryError>;

    /// Apply `changes` if the stored version equals `expected_version`,
    /// bumping the version by one. Returns the stored result.
    async fn update(
        &self,
        id: &PostId,
        expected_version: i64,
        changes: &PostUpdate,
    ) -> Result<Post, PostRepositoryError>;

    /// Flip `user`'s like. Returns whether the post is liked afterwards.
    async fn toggle_like(&self, user: &UserId, post: &PostId)
    -> Result<bool, PostRepositoryError>;

    /// Add one to the comment counter.
    async fn increment_comment_count(&self, id: &PostId) -> Result<(), PostRepositoryError>;

    /// Delete a post and its comments.
    async fn delete(&self, id: &PostId) -> Result<(), PostRepositoryError>;
}
