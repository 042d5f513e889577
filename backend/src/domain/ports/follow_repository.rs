//! Port for the directed follow graph.

use async_trait::async_trait;

use crate::domain::{Follow, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by follow repository adapters.
    pub enum FollowRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "follow repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "follow repository query failed: {message}",
        /// The operation did not finish within the query timeout.
        Timeout { timeout_ms: u64 } => "follow repository query timed out after {timeout_ms} ms",
        /// A user tried to follow themselves.
        SelfFollow => "users cannot follow themselves",
        /// Follower or followee does not exist.
        UserNotFound => "follower or followee not found",
    }
}

/// Follow edges between accounts. No operation spans a transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Accounts `follower` follows. Following nobody yields an empty list.
    async fn following(&self, follower: &UserId) -> Result<Vec<UserId>, FollowRepositoryError>;

    /// Number of accounts following `followee`.
    async fn follower_count(&self, followee: &UserId) -> Result<i64, FollowRepositoryError>;

    /// Number of accounts `follower` follows.
    async fn following_count(&self, follower: &UserId) -> Result<i64, FollowRepositoryError>;

    /// Whether the edge `follower -> followee` exists.
    async fn is_following(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, FollowRepositoryError>;

    /// Create the edge. Returns `None` when it already existed.
    async fn follow(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<Option<Follow>, FollowRepositoryError>;

    /// Remove the edge. Returns whether one was removed.
    async fn unfollow(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, FollowRepositoryError>;
}
