//! Time-limited activation invites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::UserId;

/// Pending activation for a newly registered account.
///
/// Only the SHA-256 digest of the emailed token is stored. An invite whose
/// `expires_at` has passed is never usable and is eventually purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Account awaiting activation.
    pub user_id: UserId,
    /// Lowercase hex SHA-256 digest of the raw token.
    #[serde(rename = "token")]
    pub token_hash: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Instant after which the invite is dead.
    pub expires_at: DateTime<Utc>,
}

impl Invite {
    /// Whether the invite can no longer be redeemed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Digest a raw activation token for storage and lookup.
///
/// # Examples
/// ```
/// use cocraft::domain::hash_token;
///
/// let digest = hash_token("abc");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, hash_token("abc"));
/// ```
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hex::encode(hasher.finalize())
}
