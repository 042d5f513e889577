//! PostgreSQL-backed `FollowRepository` implementation using Diesel ORM.
//!
//! Follow edges are unique per ordered pair, so following twice is a no-op
//! rather than an error.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use mockable::Clock;

use crate::domain::ports::{FollowRepository, FollowRepositoryError};
use crate::domain::{Follow, FollowId, UserId};

use super::diesel_helpers::{
    Violation, bounded, log_diesel_error, map_basic_diesel_error, violation,
};
use super::models::{FollowRow, NewFollowRow};
use super::pool::{DbPool, PoolError};
use super::schema::follows;

const NOT_SELF_CONSTRAINT: &str = "follows_not_self";

/// Diesel-backed implementation of the `FollowRepository` port.
#[derive(Clone)]
pub struct DieselFollowRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselFollowRepository {
    /// Create a new repository with the given connection pool and clock.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn map_pool_error(error: PoolError) -> FollowRepositoryError {
    FollowRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> FollowRepositoryError {
    let mapped = match violation(&error) {
        Some(Violation::ForeignKey(_)) => Some(FollowRepositoryError::user_not_found()),
        Some(Violation::Check(Some(NOT_SELF_CONSTRAINT))) => {
            Some(FollowRepositoryError::self_follow())
        }
        _ => None,
    };
    if let Some(mapped) = mapped {
        log_diesel_error(&error);
        return mapped;
    }
    map_basic_diesel_error(error, FollowRepositoryError::query, FollowRepositoryError::connection)
}

#[async_trait]
impl FollowRepository for DieselFollowRepository {
    async fn following(&self, follower: &UserId) -> Result<Vec<UserId>, FollowRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let ids: Vec<uuid::Uuid> = follows::table
                    .filter(follows::follower_id.eq(follower.as_uuid()))
                    .order(follows::created_at.asc())
                    .select(follows::followee_id)
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;

                Ok(ids.into_iter().map(UserId::from_uuid).collect())
            },
            FollowRepositoryError::timeout,
        )
        .await
    }

    async fn follower_count(&self, followee: &UserId) -> Result<i64, FollowRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                follows::table
                    .filter(follows::followee_id.eq(followee.as_uuid()))
                    .count()
                    .get_result(&mut conn)
                    .await
                    .map_err(map_diesel_error)
            },
            FollowRepositoryError::timeout,
        )
        .await
    }

    async fn following_count(&self, follower: &UserId) -> Result<i64, FollowRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                follows::table
                    .filter(follows::follower_id.eq(follower.as_uuid()))
                    .count()
                    .get_result(&mut conn)
                    .await
                    .map_err(map_diesel_error)
            },
            FollowRepositoryError::timeout,
        )
        .await
    }

    async fn is_following(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, FollowRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                diesel::select(exists(
                    follows::table
                        .filter(follows::follower_id.eq(follower.as_uuid()))
                        .filter(follows::followee_id.eq(followee.as_uuid())),
                ))
                .get_result(&mut conn)
                .await
                .map_err(map_diesel_error)
            },
            FollowRepositoryError::timeout,
        )
        .await
    }

    async fn follow(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<Option<Follow>, FollowRepositoryError> {
        if follower == followee {
            return Err(FollowRepositoryError::self_follow());
        }

        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let row = NewFollowRow {
                    id: *FollowId::generate().as_uuid(),
                    follower_id: *follower.as_uuid(),
                    followee_id: *followee.as_uuid(),
                    created_at: self.clock.utc(),
                };

                let created: Option<FollowRow> = diesel::insert_into(follows::table)
                    .values(&row)
                    .on_conflict((follows::follower_id, follows::followee_id))
                    .do_nothing()
                    .returning(FollowRow::as_returning())
                    .get_result(&mut conn)
                    .await
                    .optional()
                    .map_err(map_diesel_error)?;

                Ok(created.map(Follow::from))
            },
            FollowRepositoryError::timeout,
        )
        .await
    }

    async fn unfollow(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<bool, FollowRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let removed = diesel::delete(
                    follows::table
                        .filter(follows::follower_id.eq(follower.as_uuid()))
                        .filter(follows::followee_id.eq(followee.as_uuid())),
                )
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;

                Ok(removed > 0)
            },
            FollowRepositoryError::timeout,
        )
        .await
    }
}
