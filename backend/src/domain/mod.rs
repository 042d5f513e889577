//! Domain primitives, store ports and the collection facade.
//!
//! Purpose: define the entities of the social platform and the capability
//! interfaces through which they are persisted. Types here never depend on a
//! storage engine; adapters live under `crate::outbound`.
//!
//! Public surface:
//! - Entities: [`User`], [`Invite`], [`Post`], [`Comment`], [`Review`],
//!   [`Follow`] and their creation payloads.
//! - Listing: [`FeedQuery`], [`Viewer`].
//! - Rules: [`Validator`], [`Role`], [`Permission`].
//! - Orchestration: [`Collections`], [`InviteReaper`].
//! - Errors: [`Error`] with a stable [`ErrorCode`].

pub mod collections;
pub mod comment;
pub mod error;
pub mod feed_query;
pub mod follow;
pub mod ids;
pub mod invite;
pub mod invite_reaper;
pub mod ports;
pub mod post;
pub mod review;
pub mod role;
pub mod user;
pub mod validation;

pub use self::collections::Collections;
pub use self::comment::{Comment, CommentWithParentAndUser, NewComment, ParentComment};
pub use self::error::{Error, ErrorCode};
pub use self::feed_query::{FeedQuery, FeedQueryError, Viewer};
pub use self::follow::Follow;
pub use self::ids::{CommentId, FollowId, IdValidationError, PostId, ReviewId, UserId};
pub use self::invite::{Invite, hash_token};
pub use self::invite_reaper::InviteReaper;
pub use self::post::{NewPost, Post, PostUpdate, PostWithLikeStatus, extract_mentions};
pub use self::review::{NewReview, REVIEW_SCORE_MAX, REVIEW_SCORE_MIN, Review};
pub use self::role::{Permission, Role, RoleParseError};
pub use self::user::{Contact, NewUser, Profile, Rating, User};
pub use self::validation::{Registration, ValidationError, Validator};
