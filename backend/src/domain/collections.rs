//! Aggregate of the store capability interfaces.
//!
//! [`Collections`] is assembled once at startup and cloned into whatever
//! needs storage. Its methods compose several stores for flows that need more
//! than one; single-store operations go straight to the fields.

use std::sync::Arc;

use chrono::Duration;
use pagination::Page;
use tracing::{info, warn};

use super::ports::{
    CommentRepository, FollowRepository, PostRepository, ReviewRepository, UserRepository,
};
use super::{
    CommentWithParentAndUser, Error, FeedQuery, NewComment, NewPost, NewReview, NewUser, Post,
    PostId, PostUpdate, PostWithLikeStatus, Review, User, UserId, Validator, Viewer,
    extract_mentions, hash_token,
};

/// Store handles shared by every caller.
#[derive(Clone)]
pub struct Collections {
    /// Accounts and invites.
    pub users: Arc<dyn UserRepository>,
    /// Posts.
    pub posts: Arc<dyn PostRepository>,
    /// Comments.
    pub comments: Arc<dyn CommentRepository>,
    /// Reviews.
    pub reviews: Arc<dyn ReviewRepository>,
    /// Follow edges.
    pub follows: Arc<dyn FollowRepository>,
}

impl Collections {
    /// Bundle store implementations.
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        reviews: Arc<dyn ReviewRepository>,
        follows: Arc<dyn FollowRepository>,
    ) -> Self {
        Self {
            users,
            posts,
            comments,
            reviews,
            follows,
        }
    }

    /// Create an inactive account and its invite, storing only the digest of
    /// `raw_token`.
    ///
    /// # Errors
    ///
    /// Duplicate username or email surface as [`super::ErrorCode::Conflict`].
    pub async fn register(
        &self,
        user: &NewUser,
        raw_token: &str,
        ttl: Duration,
    ) -> Result<User, Error> {
        let created = self
            .users
            .create_and_invite(user, &hash_token(raw_token), ttl)
            .await?;
        info!(user_id = %created.id, "account registered");
        Ok(created)
    }

    /// Remove an account whose invite could not be delivered.
    ///
    /// Best effort: a failure is logged and returned, leaving an inactive
    /// account whose invite will expire and be purged.
    ///
    /// # Errors
    ///
    /// Propagates the store failure.
    pub async fn withdraw_registration(&self, id: &UserId) -> Result<(), Error> {
        self.users.delete(id).await.map_err(|err| {
            warn!(user_id = %id, error_kind = err.kind(), "compensating delete failed");
            Error::from(err)
        })
    }

    /// `@name` tokens in `content` that name existing accounts.
    ///
    /// # Errors
    ///
    /// Propagates the user store failure.
    pub async fn resolve_mentions(&self, content: &str) -> Result<Vec<String>, Error> {
        self.known_usernames(extract_mentions(content)).await
    }

    async fn known_usernames(&self, candidates: Vec<String>) -> Result<Vec<String>, Error> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        Ok(self.users.validate_usernames(&candidates).await?)
    }

    /// Validate a draft, resolve its mentions and store it.
    ///
    /// # Errors
    ///
    /// Validation failures surface as [`super::ErrorCode::InvalidRequest`].
    pub async fn compose_post(&self, validator: &Validator, draft: NewPost) -> Result<Post, Error> {
        validator.validate_new_post(&draft)?;
        let mentions = self.resolve_mentions(&draft.content).await?;
        let post = NewPost { mentions, ..draft };
        Ok(self.posts.create(&post).await?)
    }

    /// Validate and apply a versioned edit. When the body changes, mentions
    /// are re-resolved from the new body; an explicit mention list without a
    /// new body keeps only names that belong to existing members.
    ///
    /// # Errors
    ///
    /// A stale `expected_version` surfaces as [`super::ErrorCode::Conflict`].
    pub async fn edit_post(
        &self,
        validator: &Validator,
        id: &PostId,
        expected_version: i64,
        update: PostUpdate,
    ) -> Result<Post, Error> {
        validator.validate_post_update(&update)?;
        let mentions = match update.content.as_deref() {
            Some(content) => Some(self.resolve_mentions(content).await?),
            None => match update.mentions {
                Some(names) => Some(self.known_usernames(names).await?),
                None => None,
            },
        };
        let changes = PostUpdate { mentions, ..update };
        Ok(self.posts.update(id, expected_version, &changes).await?)
    }

    /// Feed or search listing for `viewer`.
    ///
    /// A following-only request loads the viewer's followees first; following
    /// nobody yields an empty page without touching the post store.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn personalised_feed(
        &self,
        viewer: Viewer,
        query: &FeedQuery,
    ) -> Result<Page<PostWithLikeStatus>, Error> {
        let resolved = match (&viewer, query.show_following) {
            (Viewer::Member { id, .. }, true) => {
                let followees = self.follows.following(id).await?;
                if followees.is_empty() {
                    return Ok(Page::empty());
                }
                viewer.with_followees(followees)
            }
            _ => viewer,
        };

        let page = match query.search_text() {
            Some(text) => self.posts.search(&resolved, text, query).await?,
            None => self.posts.feed(&resolved, query).await?,
        };
        Ok(page)
    }

    /// Validate and store a comment.
    ///
    /// # Errors
    ///
    /// Missing post, parent or author surface as
    /// [`super::ErrorCode::NotFound`].
    pub async fn add_comment(
        &self,
        validator: &Validator,
        comment: &NewComment,
    ) -> Result<CommentWithParentAndUser, Error> {
        validator.validate_new_comment(comment)?;
        Ok(self.comments.create(comment).await?)
    }

    /// Validate and store a review.
    ///
    /// # Errors
    ///
    /// Reviewing oneself is an invalid request.
    pub async fn add_review(
        &self,
        validator: &Validator,
        review: &NewReview,
    ) -> Result<Review, Error> {
        validator.validate_new_review(review)?;
        if review.rater_id == review.rated_user_id {
            return Err(Error::invalid_request("users cannot review themselves"));
        }
        Ok(self.reviews.create(review).await?)
    }
}
