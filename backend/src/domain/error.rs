//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses or any other protocol-specific envelope. Store failures are
//! converted here so callers never see driver detail.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use super::FeedQueryError;
use super::ValidationError;
use super::ports::{
    CommentRepositoryError, FollowRepositoryError, PostRepositoryError, ReviewRepositoryError,
    UserRepositoryError,
};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The requested resource does not exist.
    NotFound,
    /// The request conflicts with stored state.
    Conflict,
    /// A dependency such as the database is unreachable or too slow.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

impl ErrorCode {
    const fn fallback_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid request",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::ServiceUnavailable => "service unavailable",
            Self::InternalError => "internal error",
        }
    }
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use cocraft::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("post not found");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Create an error. Blank messages are replaced with a generic description
    /// of `code`.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let supplied = message.into();
        let message = if supplied.trim().is_empty() {
            code.fallback_message().to_owned()
        } else {
            supplied
        };
        Self {
            code,
            message,
            details: None,
        }
    }

    /// Stable machine-readable error code.
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub const fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

fn unavailable(store: &'static str, detail: &str) -> Error {
    error!(store, detail, "store unavailable");
    Error::service_unavailable(format!("{store} store is unavailable"))
}

fn internal(store: &'static str, detail: &str) -> Error {
    error!(store, detail, "store query failed");
    Error::internal(format!("{store} store failed"))
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        let details = value.field().map(|field| json!({ "field": field }));
        let err = Self::invalid_request(value.to_string());
        match details {
            Some(details) => err.with_details(details),
            None => err,
        }
    }
}

impl From<FeedQueryError> for Error {
    fn from(value: FeedQueryError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

impl From<UserRepositoryError> for Error {
    fn from(value: UserRepositoryError) -> Self {
        match value {
            UserRepositoryError::Connection { message } => unavailable("user", &message),
            UserRepositoryError::Timeout { .. } => Self::service_unavailable(value.to_string()),
            UserRepositoryError::Query { message } => internal("user", &message),
            UserRepositoryError::NotFound
            | UserRepositoryError::InviteNotFound
            | UserRepositoryError::NoRatingToReduce => Self::not_found(value.to_string()),
            UserRepositoryError::DuplicateUsername | UserRepositoryError::DuplicateEmail => {
                Self::conflict(value.to_string())
            }
        }
    }
}

impl From<FollowRepositoryError> for Error {
    fn from(value: FollowRepositoryError) -> Self {
        match value {
            FollowRepositoryError::Connection { message } => unavailable("follow", &message),
            FollowRepositoryError::Timeout { .. } => Self::service_unavailable(value.to_string()),
            FollowRepositoryError::Query { message } => internal("follow", &message),
            FollowRepositoryError::SelfFollow => Self::invalid_request(value.to_string()),
            FollowRepositoryError::UserNotFound => Self::not_found(value.to_string()),
        }
    }
}

impl From<PostRepositoryError> for Error {
    fn from(value: PostRepositoryError) -> Self {
        match value {
            PostRepositoryError::Connection { message } => unavailable("post", &message),
            PostRepositoryError::Timeout { .. } => Self::service_unavailable(value.to_string()),
            PostRepositoryError::Query { message } => internal("post", &message),
            PostRepositoryError::NotFound => Self::not_found(value.to_string()),
            PostRepositoryError::VersionConflict { expected, actual } => {
                Self::conflict(value.to_string())
                    .with_details(json!({ "expected": expected, "actual": actual }))
            }
        }
    }
}

impl From<CommentRepositoryError> for Error {
    fn from(value: CommentRepositoryError) -> Self {
        match value {
            CommentRepositoryError::Connection { message } => unavailable("comment", &message),
            CommentRepositoryError::Timeout { .. } => {
                Self::service_unavailable(value.to_string())
            }
            CommentRepositoryError::Query { message } => internal("comment", &message),
            CommentRepositoryError::PostNotFound
            | CommentRepositoryError::ParentNotFound
            | CommentRepositoryError::AuthorNotFound => Self::not_found(value.to_string()),
        }
    }
}

impl From<ReviewRepositoryError> for Error {
    fn from(value: ReviewRepositoryError) -> Self {
        match value {
            ReviewRepositoryError::Connection { message } => unavailable("review", &message),
            ReviewRepositoryError::Timeout { .. } => Self::service_unavailable(value.to_string()),
            ReviewRepositoryError::Query { message } => internal("review", &message),
            ReviewRepositoryError::NotFound | ReviewRepositoryError::RatedUserNotFound => {
                Self::not_found(value.to_string())
            }
        }
    }
}
