//! PostgreSQL-backed `ReviewRepository` implementation using Diesel ORM.
//!
//! Every review insert or delete adjusts the rated user's aggregate in the
//! same transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use mockable::Clock;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{ReviewRepository, ReviewRepositoryError};
use crate::domain::{NewReview, Review, ReviewId, UserId};

use super::diesel_helpers::{
    Violation, bounded, log_diesel_error, map_basic_diesel_error, violation,
};
use super::diesel_user_repository::{add_to_rating, remove_from_rating};
use super::models::{NewReviewRow, ReviewRow};
use super::pool::{DbPool, PoolError};
use super::schema::reviews;
use super::transaction::{TxError, UnitOfWork, execute};

/// Diesel-backed implementation of the `ReviewRepository` port.
#[derive(Clone)]
pub struct DieselReviewRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselReviewRepository {
    /// Create a new repository with the given connection pool and clock.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn map_pool_error(error: PoolError) -> ReviewRepositoryError {
    ReviewRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> ReviewRepositoryError {
    if matches!(violation(&error), Some(Violation::ForeignKey(_))) {
        log_diesel_error(&error);
        return ReviewRepositoryError::rated_user_not_found();
    }
    map_basic_diesel_error(error, ReviewRepositoryError::query, ReviewRepositoryError::connection)
}

fn map_tx_error(error: TxError<ReviewRepositoryError>) -> ReviewRepositoryError {
    error.into_store_error(map_diesel_error)
}

struct CreateReview<'a> {
    review: &'a NewReview,
    id: Uuid,
    now: DateTime<Utc>,
}

#[async_trait]
impl UnitOfWork for CreateReview<'_> {
    type Output = Review;
    type Error = ReviewRepositoryError;

    async fn run(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<Review, TxError<ReviewRepositoryError>> {
        let rated_user = *self.review.rated_user_id.as_uuid();

        if !add_to_rating(conn, rated_user, self.review.score).await? {
            return Err(TxError::Aborted(ReviewRepositoryError::rated_user_not_found()));
        }

        let row: ReviewRow = diesel::insert_into(reviews::table)
            .values(&NewReviewRow {
                id: self.id,
                rated_user_id: rated_user,
                rater_id: *self.review.rater_id.as_uuid(),
                rater_username: &self.review.rater_username,
                score: self.review.score,
                comment: self.review.comment.as_deref(),
                created_at: self.now,
            })
            .returning(ReviewRow::as_returning())
            .get_result(conn)
            .await?;

        Ok(Review::from(row))
    }
}

struct DeleteReview {
    id: Uuid,
    rated_user: Uuid,
}

#[async_trait]
impl UnitOfWork for DeleteReview {
    type Output = Review;
    type Error = ReviewRepositoryError;

    async fn run(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<Review, TxError<ReviewRepositoryError>> {
        let removed: Option<ReviewRow> = diesel::delete(
            reviews::table
                .filter(reviews::id.eq(self.id))
                .filter(reviews::rated_user_id.eq(self.rated_user)),
        )
        .returning(ReviewRow::as_returning())
        .get_result(conn)
        .await
        .optional()?;
        let Some(removed) = removed else {
            return Err(TxError::Aborted(ReviewRepositoryError::not_found()));
        };

        if !remove_from_rating(conn, self.rated_user, removed.score).await? {
            return Err(TxError::Aborted(ReviewRepositoryError::query(
                "rating aggregate has no review to remove",
            )));
        }

        Ok(Review::from(removed))
    }
}

#[async_trait]
impl ReviewRepository for DieselReviewRepository {
    async fn create(&self, review: &NewReview) -> Result<Review, ReviewRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let unit = CreateReview {
                    review,
                    id: *ReviewId::generate().as_uuid(),
                    now: self.clock.utc(),
                };
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                execute(&mut conn, &unit).await.map_err(map_tx_error)
            },
            ReviewRepositoryError::timeout,
        )
        .await
    }

    async fn delete(
        &self,
        id: &ReviewId,
        rated_user: &UserId,
    ) -> Result<Review, ReviewRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let unit = DeleteReview {
                    id: *id.as_uuid(),
                    rated_user: *rated_user.as_uuid(),
                };
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                let removed = execute(&mut conn, &unit).await.map_err(map_tx_error)?;
                info!(review_id = %removed.id, score = removed.score, "review withdrawn");
                Ok(removed)
            },
            ReviewRepositoryError::timeout,
        )
        .await
    }

    async fn by_rated_user(
        &self,
        rated_user: &UserId,
    ) -> Result<Vec<Review>, ReviewRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let rows: Vec<ReviewRow> = reviews::table
                    .filter(reviews::rated_user_id.eq(rated_user.as_uuid()))
                    .order((reviews::created_at.desc(), reviews::id.desc()))
                    .select(ReviewRow::as_select())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;

                Ok(rows.into_iter().map(Review::from).collect())
            },
            ReviewRepositoryError::timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));
        assert!(matches!(repo_err, ReviewRepositoryError::Connection { .. }));
    }

    #[rstest]
    fn aborted_units_keep_their_error() {
        let repo_err = map_tx_error(TxError::Aborted(ReviewRepositoryError::not_found()));
        assert_eq!(repo_err, ReviewRepositoryError::NotFound);
    }
}
