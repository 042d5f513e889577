//! Bounded page sizes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised while validating a page size.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitError {
    /// The value lies outside `PageLimit::MIN..=PageLimit::MAX`.
    #[error("limit must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Rejected value.
        value: u64,
        /// Smallest accepted value.
        min: u8,
        /// Largest accepted value.
        max: u8,
    },
    /// The value is not an unsigned integer.
    #[error("limit must be a whole number, got `{value}`")]
    NotANumber {
        /// Rejected input.
        value: String,
    },
}

/// Number of items a single page may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PageLimit(u8);

impl PageLimit {
    /// Smallest page.
    pub const MIN: u8 = 1;
    /// Largest page.
    pub const MAX: u8 = 20;
    /// Page size used when the caller does not ask for one.
    pub const DEFAULT: Self = Self(10);

    /// Validate a page size.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError::OutOfRange`] outside `1..=20`.
    pub fn new(value: u64) -> Result<Self, LimitError> {
        u8::try_from(value)
            .ok()
            .filter(|candidate| (Self::MIN..=Self::MAX).contains(candidate))
            .map(Self)
            .ok_or(LimitError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
    }

    /// Page size as a collection length.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    /// Page size as a SQL `LIMIT` operand.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        i64::from(self.0)
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageLimit {
    type Err = LimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = trimmed
            .parse::<u64>()
            .map_err(|_| LimitError::NotANumber {
                value: trimmed.to_owned(),
            })?;
        Self::new(value)
    }
}

impl TryFrom<u64> for PageLimit {
    type Error = LimitError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageLimit> for u64 {
    fn from(value: PageLimit) -> Self {
        Self::from(value.0)
    }
}
