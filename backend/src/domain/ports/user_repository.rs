//! Port for account and invite persistence.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{NewUser, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// The operation did not finish within the query timeout.
        Timeout { timeout_ms: u64 } => "user repository query timed out after {timeout_ms} ms",
        /// No account matches the lookup.
        NotFound => "user not found",
        /// No live invite matches the token.
        InviteNotFound => "invite not found or expired",
        /// Another account already uses the username.
        DuplicateUsername => "username already exists",
        /// Another account already uses the email.
        DuplicateEmail => "email already exists",
        /// A rating reduction matched no account with reviews.
        NoRatingToReduce => "no rating to reduce for user",
    }
}

/// Account lifecycle, uniqueness and rating aggregate storage.
///
/// New accounts start inactive. Activation redeems a time-limited invite whose
/// token is only ever stored as a SHA-256 digest.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new inactive account.
    ///
    /// Fails with [`UserRepositoryError::DuplicateEmail`] or
    /// [`UserRepositoryError::DuplicateUsername`] when either is taken; email
    /// is reported first when both are.
    async fn create(&self, user: &NewUser) -> Result<User, UserRepositoryError>;

    /// Insert a new inactive account and its invite in one transaction.
    async fn create_and_invite(
        &self,
        user: &NewUser,
        token_hash: &str,
        ttl: Duration,
    ) -> Result<User, UserRepositoryError>;

    /// Redeem a raw invite token: mark the account active and delete the
    /// invite in one transaction.
    async fn activate(&self, raw_token: &str) -> Result<User, UserRepositoryError>;

    /// Fetch an account by identifier.
    async fn get_by_id(&self, id: &UserId) -> Result<User, UserRepositoryError>;

    /// Fetch an account by login email.
    async fn get_by_email(&self, email: &str) -> Result<User, UserRepositoryError>;

    /// Every account, newest first.
    async fn list_all(&self) -> Result<Vec<User>, UserRepositoryError>;

    /// The subset of `candidates` that name existing accounts.
    async fn validate_usernames(
        &self,
        candidates: &[String],
    ) -> Result<Vec<String>, UserRepositoryError>;

    /// Add one review of `score` to the aggregate.
    async fn add_rating(&self, id: &UserId, score: i32) -> Result<(), UserRepositoryError>;

    /// Remove one review of `score` from the aggregate.
    async fn reduce_rating(&self, id: &UserId, score: i32) -> Result<(), UserRepositoryError>;

    /// Delete an account together with its pending invite.
    async fn delete(&self, id: &UserId) -> Result<(), UserRepositoryError>;

    /// Delete invites that expired at or before `now`, returning how many
    /// were removed.
    async fn purge_expired_invites(&self, now: DateTime<Utc>) -> Result<u64, UserRepositoryError>;
}
