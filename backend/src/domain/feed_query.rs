//! Listing parameters shared by the feed, search, trending and author views.

use pagination::{Cursor, CursorError, LimitError, PageLimit, SortDirection, SortDirectionError};

use super::{IdValidationError, PostId, Role, RoleParseError, UserId};

/// Errors raised while parsing raw listing parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedQueryError {
    /// `limit` is missing its bounds or not a number.
    #[error(transparent)]
    Limit(#[from] LimitError),
    /// `cursor` is not a token issued by a previous page.
    #[error(transparent)]
    Cursor(#[from] CursorError),
    /// `cursor` decodes but does not name a post.
    #[error("cursor does not reference a post: {0}")]
    CursorKey(#[from] IdValidationError),
    /// `sort` is not `asc` or `desc`.
    #[error(transparent)]
    Sort(#[from] SortDirectionError),
    /// `roles` names an unknown role.
    #[error(transparent)]
    Role(#[from] RoleParseError),
    /// A boolean flag holds something other than `true`/`false`.
    #[error("flag `{name}` must be true or false, got `{value}`")]
    Flag {
        /// Parameter name.
        name: String,
        /// Rejected input.
        value: String,
    },
}

/// Validated listing parameters.
///
/// Predicates combine as a conjunction: every enabled filter must hold for a
/// post to be listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    /// Page size.
    pub limit: PageLimit,
    /// Resume strictly after this post in `sort` order.
    pub after: Option<PostId>,
    /// Walk direction; newest first by default.
    pub sort: SortDirection,
    /// Restrict to authors the viewer follows.
    pub show_following: bool,
    /// Restrict to posts mentioning the viewer.
    pub show_mentioned: bool,
    /// Restrict to authors holding one of these roles. Empty means any role.
    pub roles: Vec<Role>,
    /// Case-insensitive text to look for in title, content or tags.
    pub search: Option<String>,
}

impl FeedQuery {
    /// Parse raw key/value parameters as received from a query string.
    ///
    /// Unknown keys are ignored. `following` and `mentioned` are accepted as
    /// aliases of the `show_` flags. Blank values and the literal `undefined`
    /// count as absent.
    ///
    /// # Errors
    ///
    /// Returns the first [`FeedQueryError`] encountered.
    ///
    /// # Examples
    /// ```
    /// use cocraft::domain::{FeedQuery, Role};
    ///
    /// let query = FeedQuery::from_params([("limit", "5"), ("roles", "designer,homeowner")])
    ///     .expect("valid parameters");
    /// assert_eq!(query.limit.as_usize(), 5);
    /// assert_eq!(query.roles, vec![Role::Designer, Role::Homeowner]);
    /// ```
    pub fn from_params<'a, I>(params: I) -> Result<Self, FeedQueryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        for (key, raw) in params {
            let value = raw.trim();
            if value.is_empty() || value == "undefined" {
                continue;
            }
            match key {
                "limit" => query.limit = value.parse()?,
                "cursor" => query.after = Some(parse_cursor(value)?),
                "sort" => query.sort = value.parse()?,
                "show_following" | "following" => {
                    query.show_following = parse_flag(key, value)?;
                }
                "show_mentioned" | "mentioned" => {
                    query.show_mentioned = parse_flag(key, value)?;
                }
                "roles" => query.roles = parse_roles(value)?,
                "search" => query.search = Some(value.to_owned()),
                _ => {}
            }
        }
        Ok(query)
    }

    /// Continuation token equivalent to `after`.
    pub fn cursor(&self) -> Option<Cursor> {
        self.after.map(|id| Cursor::from_key(&id.key_bytes()))
    }

    /// Search text, if any, with surrounding whitespace removed.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Who is looking at a listing.
///
/// Following and mention filters only apply to members; anonymous viewers
/// see every post that passes the remaining filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    /// No signed-in user.
    #[default]
    Anonymous,
    /// A signed-in user.
    Member {
        /// Viewer identifier, used for like annotations.
        id: UserId,
        /// Viewer handle, matched against post mentions.
        username: String,
        /// Accounts the viewer follows. Resolved by the caller when a
        /// following-only listing is requested.
        followees: Vec<UserId>,
    },
}

impl Viewer {
    /// A member with no followee set loaded.
    pub fn member(id: UserId, username: impl Into<String>) -> Self {
        Self::Member {
            id,
            username: username.into(),
            followees: Vec::new(),
        }
    }

    /// Attach the followee set.
    #[must_use]
    pub fn with_followees(self, followees: Vec<UserId>) -> Self {
        match self {
            Self::Anonymous => Self::Anonymous,
            Self::Member { id, username, .. } => Self::Member {
                id,
                username,
                followees,
            },
        }
    }

    /// Viewer identifier, if signed in.
    pub const fn id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::Member { id, .. } => Some(id),
        }
    }
}

fn parse_cursor(value: &str) -> Result<PostId, FeedQueryError> {
    let cursor = Cursor::parse(value)?;
    Ok(PostId::from_key_bytes(cursor.key())?)
}

fn parse_flag(name: &str, value: &str) -> Result<bool, FeedQueryError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(FeedQueryError::Flag {
            name: name.to_owned(),
            value: other.to_owned(),
        }),
    }
}

fn parse_roles(value: &str) -> Result<Vec<Role>, FeedQueryError> {
    let mut roles: Vec<Role> = Vec::new();
    for name in value.split(',').map(str::trim) {
        if name.is_empty() || name == "undefined" {
            continue;
        }
        let role: Role = name.parse()?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_apply_without_parameters() {
        let query = FeedQuery::from_params(Vec::<(&str, &str)>::new())
            .expect("empty parameters are valid");
        assert_eq!(query.limit.as_usize(), 10);
        assert_eq!(query.sort, SortDirection::Descending);
        assert!(query.after.is_none());
        assert!(!query.show_following);
        assert!(!query.show_mentioned);
        assert!(query.roles.is_empty());
        assert!(query.search.is_none());
    }

    #[rstest]
    fn full_parameter_set_is_parsed() {
        let after = PostId::generate();
        let token = after.to_string();
        let query = FeedQuery::from_params([
            ("limit", "20"),
            ("cursor", token.as_str()),
            ("sort", "asc"),
            ("show_following", "true"),
            ("mentioned", "1"),
            ("roles", "admin, designer,,undefined"),
            ("search", "  oak  "),
        ])
        .expect("valid parameters");

        assert_eq!(query.limit.as_usize(), 20);
        assert_eq!(query.after, Some(after));
        assert_eq!(query.sort, SortDirection::Ascending);
        assert!(query.show_following);
        assert!(query.show_mentioned);
        assert_eq!(query.roles, vec![Role::Admin, Role::Designer]);
        assert_eq!(query.search_text(), Some("oak"));
        assert_eq!(query.cursor().map(String::from), Some(token));
    }

    #[rstest]
    #[case("limit", "0")]
    #[case("limit", "21")]
    #[case("limit", "many")]
    #[case("sort", "sideways")]
    #[case("roles", "plumber")]
    #[case("cursor", "xyz")]
    #[case("cursor", "0102")]
    #[case("show_following", "yes")]
    fn invalid_values_are_rejected(#[case] key: &str, #[case] value: &str) {
        assert!(FeedQuery::from_params([(key, value)]).is_err());
    }

    #[rstest]
    fn undefined_roles_mean_any_role() {
        let query = FeedQuery::from_params([("roles", "undefined")]).expect("valid parameters");
        assert!(query.roles.is_empty());
    }

    #[rstest]
    fn blank_search_is_ignored() {
        let query = FeedQuery {
            search: Some("   ".to_owned()),
            ..FeedQuery::default()
        };
        assert!(query.search_text().is_none());
    }

    #[rstest]
    fn anonymous_viewers_ignore_followees() {
        let viewer = Viewer::Anonymous.with_followees(vec![UserId::generate()]);
        assert_eq!(viewer, Viewer::Anonymous);
        assert!(viewer.id().is_none());
    }

    #[rstest]
    fn members_carry_their_followees() {
        let me = UserId::generate();
        let friend = UserId::generate();
        let viewer = Viewer::member(me, "ada").with_followees(vec![friend]);

        assert_eq!(viewer.id(), Some(&me));
        assert!(matches!(
            viewer,
            Viewer::Member { ref followees, .. } if followees == &vec![friend]
        ));
    }
}
