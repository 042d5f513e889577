//! PostgreSQL-backed `CommentRepository` implementation using Diesel ORM.
//!
//! Creating a comment bumps the post's counter in the same transaction, so
//! `comment_count` always matches the stored comment rows.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use mockable::Clock;
use uuid::Uuid;

use crate::domain::ports::{CommentRepository, CommentRepositoryError};
use crate::domain::{
    Comment, CommentId, CommentWithParentAndUser, NewComment, ParentComment, PostId,
};

use super::diesel_helpers::{
    Violation, bounded, log_diesel_error, map_basic_diesel_error, violation,
};
use super::diesel_post_repository::bump_comment_count;
use super::models::{CommentRow, NewCommentRow};
use super::pool::{DbPool, PoolError};
use super::schema::{comments, users};
use super::transaction::{TxError, UnitOfWork, execute};

/// Diesel-backed implementation of the `CommentRepository` port.
#[derive(Clone)]
pub struct DieselCommentRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselCommentRepository {
    /// Create a new repository with the given connection pool and clock.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn map_pool_error(error: PoolError) -> CommentRepositoryError {
    CommentRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> CommentRepositoryError {
    // A post deleted between the counter bump and the insert.
    if matches!(violation(&error), Some(Violation::ForeignKey(_))) {
        log_diesel_error(&error);
        return CommentRepositoryError::post_not_found();
    }
    map_basic_diesel_error(error, CommentRepositoryError::query, CommentRepositoryError::connection)
}

struct CreateComment<'a> {
    comment: &'a NewComment,
    id: Uuid,
    now: DateTime<Utc>,
}

#[async_trait]
impl UnitOfWork for CreateComment<'_> {
    type Output = CommentWithParentAndUser;
    type Error = CommentRepositoryError;

    async fn run(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<CommentWithParentAndUser, TxError<CommentRepositoryError>> {
        let post_id = *self.comment.post_id.as_uuid();

        if !bump_comment_count(conn, post_id).await? {
            return Err(TxError::Aborted(CommentRepositoryError::post_not_found()));
        }

        let parent = match self.comment.parent_id {
            Some(parent_id) => {
                let row: Option<CommentRow> = comments::table
                    .find(*parent_id.as_uuid())
                    .filter(comments::post_id.eq(post_id))
                    .select(CommentRow::as_select())
                    .first(conn)
                    .await
                    .optional()?;
                let Some(row) = row else {
                    return Err(TxError::Aborted(CommentRepositoryError::parent_not_found()));
                };
                Some(ParentComment::from(row))
            }
            None => None,
        };

        let inserted: CommentRow = diesel::insert_into(comments::table)
            .values(&NewCommentRow {
                id: self.id,
                user_id: *self.comment.user_id.as_uuid(),
                post_id,
                parent_id: self.comment.parent_id.map(|id| *id.as_uuid()),
                content: &self.comment.content,
                created_at: self.now,
            })
            .returning(CommentRow::as_returning())
            .get_result(conn)
            .await?;

        let username: Option<String> = users::table
            .find(*self.comment.user_id.as_uuid())
            .select(users::username)
            .first(conn)
            .await
            .optional()?;
        let Some(username) = username else {
            return Err(TxError::Aborted(CommentRepositoryError::author_not_found()));
        };

        Ok(CommentWithParentAndUser::new(
            Comment::from(inserted),
            username,
            parent,
        ))
    }
}

#[async_trait]
impl CommentRepository for DieselCommentRepository {
    async fn create(
        &self,
        comment: &NewComment,
    ) -> Result<CommentWithParentAndUser, CommentRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let unit = CreateComment {
                    comment,
                    id: *CommentId::generate().as_uuid(),
                    now: self.clock.utc(),
                };
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                execute(&mut conn, &unit)
                    .await
                    .map_err(|error| error.into_store_error(map_diesel_error))
            },
            CommentRepositoryError::timeout,
        )
        .await
    }

    async fn exists(&self, id: &CommentId) -> Result<bool, CommentRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                diesel::select(exists(comments::table.find(id.as_uuid())))
                    .get_result(&mut conn)
                    .await
                    .map_err(map_diesel_error)
            },
            CommentRepositoryError::timeout,
        )
        .await
    }

    async fn by_post(
        &self,
        post: &PostId,
    ) -> Result<Vec<CommentWithParentAndUser>, CommentRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let rows: Vec<CommentRow> = comments::table
                    .filter(comments::post_id.eq(post.as_uuid()))
                    .order((comments::created_at.desc(), comments::id.desc()))
                    .select(CommentRow::as_select())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;
                if rows.is_empty() {
                    return Ok(Vec::new());
                }

                let parent_ids: Vec<Uuid> = rows.iter().filter_map(|row| row.parent_id).collect();
                let parents: HashMap<Uuid, ParentComment> = if parent_ids.is_empty() {
                    HashMap::new()
                } else {
                    comments::table
                        .filter(comments::id.eq_any(parent_ids))
                        .select(CommentRow::as_select())
                        .load::<CommentRow>(&mut conn)
                        .await
                        .map_err(map_diesel_error)?
                        .into_iter()
                        .map(|row| (row.id, ParentComment::from(row)))
                        .collect()
                };

                let author_ids: Vec<Uuid> = rows.iter().map(|row| row.user_id).collect();
                let usernames: HashMap<Uuid, String> = users::table
                    .filter(users::id.eq_any(author_ids))
                    .select((users::id, users::username))
                    .load::<(Uuid, String)>(&mut conn)
                    .await
                    .map_err(map_diesel_error)?
                    .into_iter()
                    .collect();

                Ok(rows
                    .into_iter()
                    .map(|row| {
                        let parent = row.parent_id.and_then(|id| parents.get(&id).cloned());
                        // Authors may since have deleted their account.
                        let username = usernames.get(&row.user_id).cloned().unwrap_or_default();
                        CommentWithParentAndUser::new(Comment::from(row), username, parent)
                    })
                    .collect())
            },
            CommentRepositoryError::timeout,
        )
        .await
    }
}
