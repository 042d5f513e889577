//! Sort direction for time-ordered listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raised when a sort parameter is neither `asc` nor `desc`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sort must be `asc` or `desc`, got `{value}`")]
pub struct SortDirectionError {
    /// Rejected input.
    pub value: String,
}

/// Direction in which a listing walks its keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    /// Oldest first.
    #[serde(rename = "asc")]
    Ascending,
    /// Newest first.
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// Whether this direction walks from newest to oldest.
    #[must_use]
    pub const fn is_descending(self) -> bool {
        matches!(self, Self::Descending)
    }

    /// Wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = SortDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            other => Err(SortDirectionError {
                value: other.to_owned(),
            }),
        }
    }
}
