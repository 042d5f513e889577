//! Opaque continuation tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised while decoding a caller-supplied cursor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    /// The token was blank.
    #[error("cursor must not be empty")]
    Empty,
    /// The token is not a hexadecimal key.
    #[error("cursor is not a valid token: {message}")]
    InvalidEncoding {
        /// Decoder diagnostic.
        message: String,
    },
}

/// Continuation token pointing at the last key of a previous page.
///
/// Tokens are rendered as lowercase hexadecimal of the key bytes. Callers
/// treat them as opaque strings and hand them back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor {
    key: Vec<u8>,
    token: String,
}

impl Cursor {
    /// Build a cursor from raw key bytes.
    #[must_use]
    pub fn from_key(key: &[u8]) -> Self {
        Self {
            key: key.to_vec(),
            token: hex::encode(key),
        }
    }

    /// Decode a caller-supplied token.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Empty`] for blank input and
    /// [`CursorError::InvalidEncoding`] when the token is not hexadecimal.
    pub fn parse(token: &str) -> Result<Self, CursorError> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CursorError::Empty);
        }
        let key = hex::decode(trimmed).map_err(|err| CursorError::InvalidEncoding {
            message: err.to_string(),
        })?;
        Ok(Self::from_key(&key))
    }

    /// Key bytes encoded in this cursor.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        self.key.as_slice()
    }

    /// Canonical token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.token.as_str()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cursor {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cursor {
    type Error = CursorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cursor> for String {
    fn from(value: Cursor) -> Self {
        value.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn tokens_are_lowercase_hex_of_the_key() {
        let cursor = Cursor::from_key(&[0x01, 0xab, 0xff]);
        assert_eq!(cursor.as_str(), "01abff");
        assert_eq!(cursor.key(), &[0x01, 0xab, 0xff]);
    }

    #[rstest]
    fn parsing_normalises_uppercase_tokens() {
        let cursor = Cursor::parse("01ABFF").expect("hex token parses");
        assert_eq!(cursor.as_str(), "01abff");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_tokens_are_rejected(#[case] token: &str) {
        assert_eq!(Cursor::parse(token), Err(CursorError::Empty));
    }

    #[rstest]
    #[case("zz")]
    #[case("abc")]
    fn malformed_tokens_are_rejected(#[case] token: &str) {
        assert!(matches!(
            Cursor::parse(token),
            Err(CursorError::InvalidEncoding { .. })
        ));
    }

    #[rstest]
    fn serde_uses_the_token_string() {
        let cursor = Cursor::from_key(&[0x10, 0x20]);
        let json = serde_json::to_string(&cursor).expect("serialise cursor");
        assert_eq!(json, "\"1020\"");

        let decoded: Cursor = serde_json::from_str(&json).expect("deserialise cursor");
        assert_eq!(decoded, cursor);
    }
}
