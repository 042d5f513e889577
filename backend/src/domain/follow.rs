//! Directed follow edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FollowId, UserId};

/// Stored follow edge. At most one exists per `(follower_id, followee_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    /// Edge identifier.
    pub id: FollowId,
    /// User doing the following.
    pub follower_id: UserId,
    /// User being followed.
    pub followee_id: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
