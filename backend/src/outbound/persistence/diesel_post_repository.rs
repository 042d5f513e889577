//! PostgreSQL-backed `PostRepository` implementation using Diesel ORM.
//!
//! Listings page by post id: ids are UUIDv7, so id order is creation order
//! and the cursor is simply the last id seen. Likes live in the `like_by`
//! array next to a denormalised counter; both change in a single statement.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::{exists, sql};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use mockable::Clock;
use pagination::Page;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{PostRepository, PostRepositoryError};
use crate::domain::{
    FeedQuery, NewPost, Post, PostId, PostUpdate, PostWithLikeStatus, UserId, Viewer,
};

use super::diesel_helpers::{bounded, contains_pattern, map_basic_diesel_error};
use super::models::{NewPostRow, PostChangeset, PostRow};
use super::pool::{DbPool, PoolError};
use super::schema::posts;

/// Flips membership of `$1` in `like_by` for post `$2` and reports the
/// resulting state. The counter is derived from the same membership test so
/// it cannot drift from the array.
const TOGGLE_LIKE_SQL: &str = "\
UPDATE posts SET \
    like_by = CASE WHEN $1 = ANY(like_by) \
        THEN array_remove(like_by, $1) \
        ELSE array_append(like_by, $1) END, \
    like_count = CASE WHEN $1 = ANY(like_by) THEN like_count - 1 ELSE like_count + 1 END \
WHERE id = $2 \
RETURNING $1 = ANY(like_by) AS liked";

/// Diesel-backed implementation of the `PostRepository` port.
#[derive(Clone)]
pub struct DieselPostRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselPostRepository {
    /// Create a new repository with the given connection pool and clock.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    async fn load_page(
        &self,
        listing: posts::BoxedQuery<'static, Pg>,
        viewer: &Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<PostRow> = paged(listing, query)
            .select(PostRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let items = annotate(rows, viewer);
        Ok(Page::from_items(items, query.limit, |item| {
            item.post.id.key_bytes()
        }))
    }
}

#[derive(QueryableByName)]
struct LikeToggled {
    #[diesel(sql_type = Bool)]
    liked: bool,
}

fn map_pool_error(error: PoolError) -> PostRepositoryError {
    PostRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> PostRepositoryError {
    map_basic_diesel_error(error, PostRepositoryError::query, PostRepositoryError::connection)
}

fn annotate(rows: Vec<PostRow>, viewer: &Viewer) -> Vec<PostWithLikeStatus> {
    rows.into_iter()
        .map(|row| PostWithLikeStatus::for_viewer(Post::from(row), viewer.id()))
        .collect()
}

fn role_names(query: &FeedQuery) -> Vec<&'static str> {
    query.roles.iter().map(|role| role.as_str()).collect()
}

/// Feed predicates shared by `feed` and `search`.
///
/// Returns `None` when the listing is known to be empty without asking the
/// database: a following-only feed for a member who follows nobody.
fn listing(viewer: &Viewer, query: &FeedQuery) -> Option<posts::BoxedQuery<'static, Pg>> {
    let mut listing = posts::table.into_boxed();

    if let Viewer::Member {
        username, followees, ..
    } = viewer
    {
        if query.show_following {
            if followees.is_empty() {
                return None;
            }
            let authors: Vec<Uuid> = followees.iter().map(|id| *id.as_uuid()).collect();
            listing = listing.filter(posts::user_id.eq_any(authors));
        }
        if query.show_mentioned {
            listing = listing.filter(posts::mentions.contains(vec![username.clone()]));
        }
    }

    if !query.roles.is_empty() {
        listing = listing.filter(posts::user_role.eq_any(role_names(query)));
    }

    Some(listing)
}

/// Case-insensitive match on title, content or any tag.
fn matching(
    listing: posts::BoxedQuery<'static, Pg>,
    text: &str,
) -> posts::BoxedQuery<'static, Pg> {
    let pattern = contains_pattern(text);
    let any_tag = sql::<Bool>("EXISTS (SELECT 1 FROM unnest(posts.tags) AS tag WHERE tag ILIKE ")
        .bind::<Text, _>(pattern.clone())
        .sql(")");

    listing.filter(
        posts::title
            .ilike(pattern.clone())
            .or(posts::content.ilike(pattern))
            .or(any_tag),
    )
}

/// Apply cursor, direction and limit.
fn paged(
    listing: posts::BoxedQuery<'static, Pg>,
    query: &FeedQuery,
) -> posts::BoxedQuery<'static, Pg> {
    let descending = query.sort.is_descending();
    let listing = match (query.after, descending) {
        (Some(after), true) => listing.filter(posts::id.lt(*after.as_uuid())),
        (Some(after), false) => listing.filter(posts::id.gt(*after.as_uuid())),
        (None, _) => listing,
    };
    let listing = if descending {
        listing.order(posts::id.desc())
    } else {
        listing.order(posts::id.asc())
    };
    listing.limit(query.limit.as_i64())
}

/// Add one to a post's comment counter on an existing connection.
///
/// Returns whether the post exists. Used standalone and inside the comment
/// creation transaction.
pub(crate) async fn bump_comment_count(
    conn: &mut AsyncPgConnection,
    post: Uuid,
) -> QueryResult<bool> {
    let updated = diesel::update(posts::table.find(post))
        .set(posts::comment_count.eq(posts::comment_count + 1_i64))
        .execute(conn)
        .await?;
    Ok(updated > 0)
}

/// Explain why a versioned update touched no rows.
async fn handle_post_update_failure(
    conn: &mut AsyncPgConnection,
    post: Uuid,
    expected_version: i64,
) -> PostRepositoryError {
    let current = posts::table
        .find(post)
        .select(posts::version)
        .first::<i64>(conn)
        .await
        .optional()
        .map_err(map_diesel_error);

    match current {
        Ok(Some(actual)) => {
            debug!(%post, expected_version, actual, "post edit lost a version race");
            PostRepositoryError::version_conflict(expected_version, actual)
        }
        Ok(None) => PostRepositoryError::not_found(),
        Err(error) => error,
    }
}

#[async_trait]
impl PostRepository for DieselPostRepository {
    async fn create(&self, post: &NewPost) -> Result<Post, PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                let now = self.clock.utc();

                let row = NewPostRow {
                    id: *PostId::generate().as_uuid(),
                    user_id: *post.user_id.as_uuid(),
                    user_role: post.user_role.as_str(),
                    title: &post.title,
                    content: &post.content,
                    tags: &post.tags,
                    mentions: &post.mentions,
                    images: &post.images,
                    created_at: now,
                    updated_at: now,
                };

                diesel::insert_into(posts::table)
                    .values(&row)
                    .returning(PostRow::as_returning())
                    .get_result(&mut conn)
                    .await
                    .map(Post::from)
                    .map_err(map_diesel_error)
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn exists(&self, id: &PostId) -> Result<bool, PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                diesel::select(exists(posts::table.find(id.as_uuid())))
                    .get_result(&mut conn)
                    .await
                    .map_err(map_diesel_error)
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn feed(
        &self,
        viewer: &Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError> {
        let Some(listing) = listing(viewer, query) else {
            return Ok(Page::empty());
        };
        bounded(
            self.pool.query_timeout(),
            self.load_page(listing, viewer, query),
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn trending(
        &self,
        viewer: &Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let mut ranked = posts::table.into_boxed();
                if !query.roles.is_empty() {
                    ranked = ranked.filter(posts::user_role.eq_any(role_names(query)));
                }

                let rows: Vec<PostRow> = ranked
                    .order((
                        (posts::like_count + posts::comment_count).desc(),
                        posts::created_at.desc(),
                        posts::id.desc(),
                    ))
                    .limit(query.limit.as_i64())
                    .select(PostRow::as_select())
                    .load(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;

                Ok(Page::terminal(annotate(rows, viewer)))
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn search(
        &self,
        viewer: &Viewer,
        text: &str,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError> {
        let Some(listing) = listing(viewer, query) else {
            return Ok(Page::empty());
        };
        bounded(
            self.pool.query_timeout(),
            self.load_page(matching(listing, text), viewer, query),
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn get_by_id(&self, id: &PostId) -> Result<Post, PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let row: Option<PostRow> = posts::table
                    .find(id.as_uuid())
                    .select(PostRow::as_select())
                    .first(&mut conn)
                    .await
                    .optional()
                    .map_err(map_diesel_error)?;

                row.map(Post::from).ok_or_else(PostRepositoryError::not_found)
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn by_author(
        &self,
        author: &UserId,
        viewer: &Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, PostRepositoryError> {
        let listing = posts::table
            .filter(posts::user_id.eq(*author.as_uuid()))
            .into_boxed();
        bounded(
            self.pool.query_timeout(),
            self.load_page(listing, viewer, query),
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn count_by_author(&self, author: &UserId) -> Result<i64, PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                posts::table
                    .filter(posts::user_id.eq(author.as_uuid()))
                    .count()
                    .get_result(&mut conn)
                    .await
                    .map_err(map_diesel_error)
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn update(
        &self,
        id: &PostId,
        expected_version: i64,
        changes: &PostUpdate,
    ) -> Result<Post, PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;
                let post = *id.as_uuid();

                let changeset = PostChangeset {
                    title: changes.title.as_deref(),
                    content: changes.content.as_deref(),
                    tags: changes.tags.as_deref(),
                    mentions: changes.mentions.as_deref(),
                    images: changes.images.as_deref(),
                };

                let updated: Option<PostRow> = diesel::update(
                    posts::table
                        .filter(posts::id.eq(post))
                        .filter(posts::version.eq(expected_version)),
                )
                .set((
                    changeset,
                    posts::version.eq(posts::version + 1_i64),
                    posts::updated_at.eq(self.clock.utc()),
                ))
                .returning(PostRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;

                match updated {
                    Some(row) => Ok(Post::from(row)),
                    None => {
                        Err(handle_post_update_failure(&mut conn, post, expected_version).await)
                    }
                }
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn toggle_like(
        &self,
        user: &UserId,
        post: &PostId,
    ) -> Result<bool, PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let toggled: Option<LikeToggled> = diesel::sql_query(TOGGLE_LIKE_SQL)
                    .bind::<diesel::sql_types::Uuid, _>(*user.as_uuid())
                    .bind::<diesel::sql_types::Uuid, _>(*post.as_uuid())
                    .get_result(&mut conn)
                    .await
                    .optional()
                    .map_err(map_diesel_error)?;

                toggled
                    .map(|row| row.liked)
                    .ok_or_else(PostRepositoryError::not_found)
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn increment_comment_count(&self, id: &PostId) -> Result<(), PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                if bump_comment_count(&mut conn, *id.as_uuid())
                    .await
                    .map_err(map_diesel_error)?
                {
                    Ok(())
                } else {
                    Err(PostRepositoryError::not_found())
                }
            },
            PostRepositoryError::timeout,
        )
        .await
    }

    async fn delete(&self, id: &PostId) -> Result<(), PostRepositoryError> {
        bounded(
            self.pool.query_timeout(),
            async {
                let mut conn = self.pool.get().await.map_err(map_pool_error)?;

                let removed = diesel::delete(posts::table.find(id.as_uuid()))
                    .execute(&mut conn)
                    .await
                    .map_err(map_diesel_error)?;

                if removed == 0 {
                    return Err(PostRepositoryError::not_found());
                }
                Ok(())
            },
            PostRepositoryError::timeout,
        )
        .await
    }
}
