//! Port for reviews and the rating aggregate they drive.

use async_trait::async_trait;

use crate::domain::{NewReview, Review, ReviewId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by review repository adapters.
    pub enum ReviewRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "review repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "review repository query failed: {message}",
        /// The operation did not finish within the query timeout.
        Timeout { timeout_ms: u64 } => "review repository query timed out after {timeout_ms} ms",
        /// No review matches the identifier and rated user.
        NotFound => "review not found",
        /// The rated account does not exist.
        RatedUserNotFound => "rated user not found",
    }
}

/// Review storage. Every write adjusts the rated user's aggregate in the same
/// transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review and add its score to the rated user's aggregate.
    async fn create(&self, review: &NewReview) -> Result<Review, ReviewRepositoryError>;

    /// Delete a review of `rated_user` and subtract the stored score. Returns
    /// the deleted review.
    async fn delete(
        &self,
        id: &ReviewId,
        rated_user: &UserId,
    ) -> Result<Review, ReviewRepositoryError>;

    /// Reviews of one user, newest first.
    async fn by_rated_user(&self, rated_user: &UserId)
    -> Result<Vec<Review>, ReviewRepositoryError>;
}
