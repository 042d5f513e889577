//! User accounts and their aggregate rating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, UserId};

/// Public contact details shown on a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact email, which may differ from the login email.
    #[serde(default)]
    pub email: String,
    /// Contact phone number.
    #[serde(default)]
    pub phone: String,
}

/// Free-form profile attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Short biography.
    #[serde(default)]
    pub bio: String,
    /// City or region.
    #[serde(default)]
    pub location: String,
    /// Public contact details.
    #[serde(default)]
    pub contact: Contact,
}

/// Running rating aggregate.
///
/// ## Invariants
/// - `rating_count` is never negative.
/// - `total_rating` is the sum of scores of the reviews currently stored for
///   the user and only changes alongside a review insert or delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Sum of review scores.
    pub total_rating: i64,
    /// Number of reviews.
    pub rating_count: i64,
}

/// Stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier.
    pub id: UserId,
    /// Unique handle used for mentions.
    pub username: String,
    /// Unique login email.
    pub email: String,
    /// Password digest produced by the authentication layer.
    #[serde(skip)]
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Profile details.
    pub profile: Profile,
    /// Review aggregate.
    pub rating: Rating,
    /// Whether the account completed activation.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Registration payload for a new account.
///
/// Storage assigns the identifier, timestamps and a zero rating; new accounts
/// always start inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Requested handle.
    pub username: String,
    /// Login email.
    pub email: String,
    /// Password digest.
    pub password_hash: String,
    /// Account role.
    pub role: Role,
    /// Initial profile.
    pub profile: Profile,
}
