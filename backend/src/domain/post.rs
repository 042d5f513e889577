//! Posts, their engagement counters, and mention extraction.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{PostId, Role, UserId};

/// Stored post.
///
/// ## Invariants
/// - `like_count == like_by.len()`.
/// - `comment_count` equals the number of comments stored for the post.
/// - `version` starts at 1 and grows by exactly one on every content edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identifier.
    pub id: PostId,
    /// Author.
    pub user_id: UserId,
    /// Author role at the time of posting.
    pub user_role: Role,
    /// Headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Usernames mentioned in the body, filtered to existing accounts.
    pub mentions: Vec<String>,
    /// Object-storage keys of attached images.
    pub images: Vec<String>,
    /// Users who currently like the post.
    pub like_by: Vec<UserId>,
    /// Cached size of `like_by`.
    pub like_count: i64,
    /// Cached number of comments.
    pub comment_count: i64,
    /// Optimistic concurrency token.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Ranking weight used by the trending listing. Never stored.
    pub const fn engagement_score(&self) -> i64 {
        self.like_count.saturating_add(self.comment_count)
    }

    /// Whether `user` is in the like-set.
    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.like_by.contains(user)
    }
}

/// Post annotated for a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithLikeStatus {
    /// The post itself.
    #[serde(flatten)]
    pub post: Post,
    /// Whether the viewer likes the post; false for anonymous viewers.
    pub liked_by_user: bool,
}

impl PostWithLikeStatus {
    /// Annotate `post` for `viewer`.
    pub fn for_viewer(post: Post, viewer: Option<&UserId>) -> Self {
        let liked_by_user = viewer.is_some_and(|id| post.is_liked_by(id));
        Self {
            post,
            liked_by_user,
        }
    }
}

/// Payload for a new post. Storage fills identifiers, counters and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Author.
    pub user_id: UserId,
    /// Author role snapshot.
    pub user_role: Role,
    /// Headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Validated mentions.
    pub mentions: Vec<String>,
    /// Image object keys.
    pub images: Vec<String>,
}

/// Partial edit of a post.
///
/// Each field is tri-state: `None` keeps the stored value, `Some` replaces
/// it, and `Some` of an empty value clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpdate {
    /// New headline.
    pub title: Option<String>,
    /// New body text.
    pub content: Option<String>,
    /// New tag list.
    pub tags: Option<Vec<String>>,
    /// New mention list.
    pub mentions: Option<Vec<String>>,
    /// New image key list.
    pub images: Option<Vec<String>>,
}

impl PostUpdate {
    /// Whether the edit changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.mentions.is_none()
            && self.images.is_none()
    }
}

static MENTION_RE: OnceLock<Regex> = OnceLock::new();

fn mention_regex() -> &'static Regex {
    MENTION_RE.get_or_init(|| {
        Regex::new(r"@([a-zA-Z0-9_]+)")
            .unwrap_or_else(|error| panic!("mention regex failed to compile: {error}"))
    })
}

/// Collect `@username` tokens from `content` in first-seen order, without
/// duplicates.
///
/// # Examples
/// ```
/// use cocraft::domain::extract_mentions;
///
/// let mentions = extract_mentions("thanks @ada and @grace, cc @ada");
/// assert_eq!(mentions, vec!["ada".to_owned(), "grace".to_owned()]);
/// ```
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    mention_regex()
        .captures_iter(content)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str().to_owned())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
