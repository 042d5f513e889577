//! Reviews that feed a user's rating aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ReviewId, UserId};

/// Lowest accepted score.
pub const REVIEW_SCORE_MIN: i32 = 1;
/// Highest accepted score.
pub const REVIEW_SCORE_MAX: i32 = 5;

/// Stored review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review identifier.
    pub id: ReviewId,
    /// User being reviewed.
    pub rated_user_id: UserId,
    /// Author of the review.
    pub rater_id: UserId,
    /// Author handle cached at write time.
    pub rater_username: String,
    /// Score in `REVIEW_SCORE_MIN..=REVIEW_SCORE_MAX`.
    pub score: i32,
    /// Optional free text.
    #[serde(default)]
    pub comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Payload for a new review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    /// User being reviewed.
    pub rated_user_id: UserId,
    /// Author.
    pub rater_id: UserId,
    /// Author handle.
    pub rater_username: String,
    /// Score.
    pub score: i32,
    /// Optional free text.
    pub comment: Option<String>,
}
