//! Entity identifiers.
//!
//! Every entity is keyed by a UUIDv7. The leading 48 bits carry the creation
//! timestamp, so identifier order is creation order and feeds can page by key
//! alone. Identifiers render as 32 lowercase hex characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors raised when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// The identifier was blank.
    #[error("identifier must not be empty")]
    Empty,
    /// The identifier is not a UUID in hex form.
    #[error("identifier `{value}` is not a valid id")]
    Invalid {
        /// Rejected input.
        value: String,
    },
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Uuid);

        impl $name {
            /// Parse an identifier from its hex form.
            ///
            /// Hyphenated UUIDs are accepted and normalised.
            pub fn new(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                let raw = id.as_ref();
                if raw.trim().is_empty() {
                    return Err(IdValidationError::Empty);
                }
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|_| IdValidationError::Invalid {
                        value: raw.to_owned(),
                    })
            }

            /// Mint a fresh, time-ordered identifier.
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Raw key bytes, used for pagination cursors.
            pub fn key_bytes(&self) -> Vec<u8> {
                self.0.as_bytes().to_vec()
            }

            /// Rebuild an identifier from cursor key bytes.
            pub fn from_key_bytes(bytes: &[u8]) -> Result<Self, IdValidationError> {
                Uuid::from_slice(bytes)
                    .map(Self)
                    .map_err(|_| IdValidationError::Invalid {
                        value: hex::encode(bytes),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_string()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a user account.
    UserId
);
define_entity_id!(
    /// Identifier of a post.
    PostId
);
define_entity_id!(
    /// Identifier of a comment.
    CommentId
);
define_entity_id!(
    /// Identifier of a review.
    ReviewId
);
define_entity_id!(
    /// Identifier of a follow edge.
    FollowId
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn renders_as_simple_hex() {
        let id = PostId::generate();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 32);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rendered, rendered.to_lowercase());
    }

    #[rstest]
    fn parses_hex_and_hyphenated_forms() {
        let id = UserId::generate();
        let hyphenated = id.as_uuid().hyphenated().to_string();

        assert_eq!(UserId::new(id.to_string()), Ok(id));
        assert_eq!(UserId::new(hyphenated), Ok(id));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn rejects_blank(#[case] raw: &str) {
        assert_eq!(CommentId::new(raw), Err(IdValidationError::Empty));
    }

    #[rstest]
    fn rejects_garbage() {
        assert!(matches!(
            ReviewId::new("not-an-id"),
            Err(IdValidationError::Invalid { .. })
        ));
    }

    #[rstest]
    fn generated_ids_sort_by_creation() {
        let first = PostId::generate();
        let second = PostId::generate();
        assert!(first < second);
    }

    #[rstest]
    fn key_bytes_round_trip() {
        let id = PostId::generate();
        assert_eq!(PostId::from_key_bytes(&id.key_bytes()), Ok(id));
        assert_eq!(hex::encode(id.key_bytes()), id.to_string());
    }

    #[rstest]
    fn serialises_as_string() {
        let id = FollowId::generate();
        let json = serde_json::to_value(id).expect("serialise id");
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
