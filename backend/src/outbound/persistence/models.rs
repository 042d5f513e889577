//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types live next to
//! the rows so every repository decodes stored values the same way.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    Comment, CommentId, Follow, FollowId, Invite, ParentComment, Post, PostId, Profile, Rating,
    Review, ReviewId, Role, User, UserId,
};

use super::schema::{comments, follows, invites, posts, reviews, users};

/// Decode a stored role, falling back to the least privileged role when the
/// column holds something this build does not know.
fn decode_role(value: &str, owner: Uuid) -> Role {
    value.parse().unwrap_or_else(|_| {
        warn!(value, %owner, "unrecognised role value, defaulting to homeowner");
        Role::Homeowner
    })
}

// ---------------------------------------------------------------------------
// Users and invites
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub profile: serde_json::Value,
    pub total_rating: i64,
    pub rating_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert into the domain account.
    ///
    /// A profile document that no longer matches the current shape decodes
    /// as an empty profile rather than failing the whole read.
    pub fn into_domain(self) -> User {
        let profile = serde_json::from_value::<Profile>(self.profile).unwrap_or_else(|err| {
            warn!(user_id = %self.id, error = %err, "stored profile failed to decode");
            Profile::default()
        });
        User {
            id: UserId::from_uuid(self.id),
            role: decode_role(&self.role, self.id),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            profile,
            rating: Rating {
                total_rating: self.total_rating,
                rating_count: self.rating_count,
            },
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub profile: &'a serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the invites table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InviteRow {
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<InviteRow> for Invite {
    fn from(row: InviteRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            token_hash: row.token_hash,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// Insertable struct for issuing an invite.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invites)]
pub(crate) struct NewInviteRow<'a> {
    pub user_id: Uuid,
    pub token_hash: &'a str,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// Row struct for reading from the posts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_role: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub mentions: Vec<String>,
    pub images: Vec<String>,
    pub like_by: Vec<Uuid>,
    pub like_count: i64,
    pub comment_count: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            user_role: decode_role(&row.user_role, row.user_id),
            title: row.title,
            content: row.content,
            tags: row.tags,
            mentions: row.mentions,
            images: row.images,
            like_by: row.like_by.into_iter().map(UserId::from_uuid).collect(),
            like_count: row.like_count,
            comment_count: row.comment_count,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insertable struct for creating posts.
///
/// Counters, the liker set and the version start from their column defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub(crate) struct NewPostRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_role: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub tags: &'a [String],
    pub mentions: &'a [String],
    pub images: &'a [String],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset for author edits. `None` leaves the column untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = posts)]
pub(crate) struct PostChangeset<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub tags: Option<&'a [String]>,
    pub mentions: Option<&'a [String]>,
    pub images: Option<&'a [String]>,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Row struct for reading from the comments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            post_id: PostId::from_uuid(row.post_id),
            parent_id: row.parent_id.map(CommentId::from_uuid),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

impl From<CommentRow> for ParentComment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Insertable struct for creating comments.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub(crate) struct NewCommentRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: &'a str,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

/// Row struct for reading from the reviews table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReviewRow {
    pub id: Uuid,
    pub rated_user_id: Uuid,
    pub rater_id: Uuid,
    pub rater_username: String,
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::from_uuid(row.id),
            rated_user_id: UserId::from_uuid(row.rated_user_id),
            rater_id: UserId::from_uuid(row.rater_id),
            rater_username: row.rater_username,
            score: row.score,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

/// Insertable struct for creating reviews.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reviews)]
pub(crate) struct NewReviewRow<'a> {
    pub id: Uuid,
    pub rated_user_id: Uuid,
    pub rater_id: Uuid,
    pub rater_username: &'a str,
    pub score: i32,
    pub comment: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

/// Row struct for reading from the follows table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = follows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FollowRow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub followee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<FollowRow> for Follow {
    fn from(row: FollowRow) -> Self {
        Self {
            id: FollowId::from_uuid(row.id),
            follower_id: UserId::from_uuid(row.follower_id),
            followee_id: UserId::from_uuid(row.followee_id),
            created_at: row.created_at,
        }
    }
}

/// Insertable struct for creating follow edges.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = follows)]
pub(crate) struct NewFollowRow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub followee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    //! Row-to-domain conversion coverage.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn user_row(role: &str, profile: serde_json::Value) -> UserRow {
        let now = Utc::now();
        UserRow {
            id: Uuid::now_v7(),
            username: "ada".to_owned(),
            email: "ada@example.com".to_owned(),
            password_hash: "hash".to_owned(),
            role: role.to_owned(),
            profile,
            total_rating: 9,
            rating_count: 2,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    fn user_row_decodes_profile_and_rating() {
        let row = user_row(
            "designer",
            json!({
                "bio": "Builds chairs",
                "location": "Leeds",
                "contact": {"email": "", "phone": "07700"}
            }),
        );
        let user = row.into_domain();

        assert_eq!(user.role, Role::Designer);
        assert_eq!(user.profile.bio, "Builds chairs");
        assert_eq!(user.profile.contact.phone, "07700");
        assert_eq!(user.rating.total_rating, 9);
        assert_eq!(user.rating.rating_count, 2);
    }

    #[rstest]
    fn unknown_role_falls_back_to_homeowner() {
        let user = user_row("wizard", json!({})).into_domain();
        assert_eq!(user.role, Role::Homeowner);
    }

    #[rstest]
    fn malformed_profile_decodes_as_default() {
        let user = user_row("admin", json!("not an object")).into_domain();
        assert_eq!(user.profile, Profile::default());
    }

    #[rstest]
    fn comment_row_keeps_parent_link() {
        let parent = Uuid::now_v7();
        let row = CommentRow {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            post_id: Uuid::now_v7(),
            parent_id: Some(parent),
            content: "nice".to_owned(),
            created_at: Utc::now(),
        };
        let comment = Comment::from(row);
        assert_eq!(comment.parent_id, Some(CommentId::from_uuid(parent)));
    }
}
