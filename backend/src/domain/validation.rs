//! Payload validation.
//!
//! [`Validator`] owns a table of named string rules. It is built once at
//! startup and handed to callers by reference; nothing here is global.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::{
    NewComment, NewPost, NewReview, PostUpdate, REVIEW_SCORE_MAX, REVIEW_SCORE_MIN, Role,
};

/// Longest post title.
pub const POST_TITLE_MAX: usize = 150;
/// Longest post body.
pub const POST_CONTENT_MAX: usize = 1500;
/// Longest comment body.
pub const COMMENT_CONTENT_MAX: usize = 500;
/// Longest review text.
pub const REVIEW_COMMENT_MAX: usize = 1500;

/// A pure predicate over a single string field.
pub type Rule = fn(&str) -> bool;

/// Validation failures, each naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A rule was requested that the validator does not know.
    #[error("no validation rule named `{rule}`")]
    UnknownRule {
        /// Requested rule name.
        rule: String,
    },
    /// The field failed a named rule.
    #[error("{field} failed {rule}")]
    RuleFailed {
        /// Field name.
        field: String,
        /// Rule name.
        rule: String,
    },
    /// A required field was blank.
    #[error("{field} is required")]
    Required {
        /// Field name.
        field: String,
    },
    /// The field is longer than allowed.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Field name.
        field: String,
        /// Maximum length in characters.
        max: usize,
    },
    /// A numeric field fell outside its range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        /// Field name.
        field: String,
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },
}

impl ValidationError {
    /// Name of the offending field, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownRule { .. } => None,
            Self::RuleFailed { field, .. }
            | Self::Required { field }
            | Self::TooLong { field, .. }
            | Self::OutOfRange { field, .. } => Some(field.as_str()),
        }
    }
}

/// Raw registration input, checked before the password is hashed.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    /// Requested handle.
    pub username: &'a str,
    /// Login email.
    pub email: &'a str,
    /// Plain-text password.
    pub password: &'a str,
    /// Requested role name.
    pub role: &'a str,
}

/// Named rule table plus payload checks built on it.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: BTreeMap<&'static str, Rule>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Build a validator holding the default rules: `valid_email`,
    /// `valid_password`, `valid_role` and `valid_username`.
    pub fn new() -> Self {
        let mut rules: BTreeMap<&'static str, Rule> = BTreeMap::new();
        rules.insert("valid_email", is_valid_email);
        rules.insert("valid_password", is_valid_password);
        rules.insert("valid_role", is_valid_role);
        rules.insert("valid_username", is_valid_username);
        Self { rules }
    }

    /// Add or replace a rule.
    #[must_use]
    pub fn with_rule(mut self, name: &'static str, rule: Rule) -> Self {
        self.rules.insert(name, rule);
        self
    }

    /// Names of all registered rules.
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    /// Check `value` against the rule called `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownRule`] for unregistered names and
    /// [`ValidationError::RuleFailed`] when the predicate rejects the value.
    pub fn check(&self, field: &str, rule: &str, value: &str) -> Result<(), ValidationError> {
        let predicate = self
            .rules
            .get(rule)
            .ok_or_else(|| ValidationError::UnknownRule {
                rule: rule.to_owned(),
            })?;
        if predicate(value) {
            Ok(())
        } else {
            Err(ValidationError::RuleFailed {
                field: field.to_owned(),
                rule: rule.to_owned(),
            })
        }
    }

    /// Validate a registration and return the parsed role.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn validate_registration(
        &self,
        registration: &Registration<'_>,
    ) -> Result<Role, ValidationError> {
        require("username", registration.username)?;
        self.check("username", "valid_username", registration.username)?;
        require("email", registration.email)?;
        self.check("email", "valid_email", registration.email)?;
        self.check("password", "valid_password", registration.password)?;
        self.check("role", "valid_role", registration.role)?;
        registration
            .role
            .parse()
            .map_err(|_| ValidationError::RuleFailed {
                field: "role".to_owned(),
                rule: "valid_role".to_owned(),
            })
    }

    /// Validate a role list, as used by listing filters.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown role.
    pub fn validate_roles<'a, I>(&self, roles: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        roles
            .into_iter()
            .try_for_each(|role| self.check("roles", "valid_role", role))
    }

    /// Validate a new post.
    ///
    /// # Errors
    ///
    /// Fails on a blank or overlong title or body, or on blank tags or image
    /// keys.
    pub fn validate_new_post(&self, post: &NewPost) -> Result<(), ValidationError> {
        require("title", &post.title)?;
        max_len("title", &post.title, POST_TITLE_MAX)?;
        require("content", &post.content)?;
        max_len("content", &post.content, POST_CONTENT_MAX)?;
        every_required("tags", &post.tags)?;
        every_required("images", &post.images)
    }

    /// Validate a partial post edit. Absent fields are not checked.
    ///
    /// # Errors
    ///
    /// Fails on an overlong title or body, or on blank tags or image keys.
    pub fn validate_post_update(&self, update: &PostUpdate) -> Result<(), ValidationError> {
        if let Some(title) = update.title.as_deref() {
            max_len("title", title, POST_TITLE_MAX)?;
        }
        if let Some(content) = update.content.as_deref() {
            max_len("content", content, POST_CONTENT_MAX)?;
        }
        if let Some(tags) = update.tags.as_deref() {
            every_required("tags", tags)?;
        }
        if let Some(images) = update.images.as_deref() {
            every_required("images", images)?;
        }
        Ok(())
    }

    /// Validate a new comment.
    ///
    /// # Errors
    ///
    /// Fails on a blank or overlong body.
    pub fn validate_new_comment(&self, comment: &NewComment) -> Result<(), ValidationError> {
        require("content", &comment.content)?;
        max_len("content", &comment.content, COMMENT_CONTENT_MAX)
    }

    /// Validate a new review.
    ///
    /// # Errors
    ///
    /// Fails on a score outside `1..=5` or an overlong comment.
    pub fn validate_new_review(&self, review: &NewReview) -> Result<(), ValidationError> {
        if !(REVIEW_SCORE_MIN..=REVIEW_SCORE_MAX).contains(&review.score) {
            return Err(ValidationError::OutOfRange {
                field: "score".to_owned(),
                min: i64::from(REVIEW_SCORE_MIN),
                max: i64::from(REVIEW_SCORE_MAX),
            });
        }
        if let Some(comment) = review.comment.as_deref() {
            max_len("comment", comment, REVIEW_COMMENT_MAX)?;
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_owned(),
        });
    }
    Ok(())
}

fn max_len(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_owned(),
            max,
        });
    }
    Ok(())
}

fn every_required(field: &str, values: &[String]) -> Result<(), ValidationError> {
    values.iter().try_for_each(|value| require(field, value))
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("validation regex failed to compile: {error}"))
    })
}

fn is_valid_email(value: &str) -> bool {
    compiled(&EMAIL_RE, r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").is_match(value)
}

fn is_valid_username(value: &str) -> bool {
    compiled(&USERNAME_RE, r"^[A-Za-z0-9_]{3,32}$").is_match(value)
}

fn is_valid_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_digit())
}

fn is_valid_role(value: &str) -> bool {
    value.parse::<Role>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PostId, UserId};
    use rstest::{fixture, rstest};

    #[fixture]
    fn validator() -> Validator {
        Validator::new()
    }

    #[fixture]
    fn new_post() -> NewPost {
        NewPost {
            user_id: UserId::generate(),
            user_role: Role::Designer,
            title: "Kitchen".to_owned(),
            content: "Walnut cabinets".to_owned(),
            tags: vec!["kitchen".to_owned()],
            mentions: Vec::new(),
            images: Vec::new(),
        }
    }

    #[rstest]
    #[case("ada@example.com", true)]
    #[case("a.b+c@sub.example.co", true)]
    #[case("ada@example", false)]
    #[case("ada example.com", false)]
    fn email_rule(validator: Validator, #[case] email: &str, #[case] ok: bool) {
        assert_eq!(validator.check("email", "valid_email", email).is_ok(), ok);
    }

    #[rstest]
    #[case("Passw0rd", true)]
    #[case("password1", false)]
    #[case("PASSWORD1", false)]
    #[case("Password", false)]
    #[case("Pa55", false)]
    fn password_rule(validator: Validator, #[case] password: &str, #[case] ok: bool) {
        assert_eq!(
            validator.check("password", "valid_password", password).is_ok(),
            ok
        );
    }

    #[rstest]
    fn unknown_rule_is_reported(validator: Validator) {
        assert_eq!(
            validator.check("x", "no_such_rule", "value"),
            Err(ValidationError::UnknownRule {
                rule: "no_such_rule".to_owned()
            })
        );
    }

    #[rstest]
    fn custom_rules_can_be_registered(validator: Validator) {
        fn shouty(value: &str) -> bool {
            value.chars().all(|c| c.is_ascii_uppercase())
        }
        let extended = validator.with_rule("shouty", shouty);

        assert!(extended.check("tag", "shouty", "OAK").is_ok());
        assert!(extended.check("tag", "shouty", "oak").is_err());
        assert!(extended.rule_names().any(|name| name == "shouty"));
    }

    #[rstest]
    fn registration_returns_parsed_role(validator: Validator) {
        let registration = Registration {
            username: "ada_l",
            email: "ada@example.com",
            password: "Passw0rd",
            role: "homeowner",
        };
        assert_eq!(
            validator.validate_registration(&registration),
            Ok(Role::Homeowner)
        );
    }

    #[rstest]
    fn registration_rejects_unknown_role(validator: Validator) {
        let registration = Registration {
            username: "ada_l",
            email: "ada@example.com",
            password: "Passw0rd",
            role: "plumber",
        };
        let error = validator
            .validate_registration(&registration)
            .expect_err("unknown role");
        assert_eq!(error.field(), Some("role"));
    }

    #[rstest]
    fn roles_list_is_checked_element_wise(validator: Validator) {
        assert!(validator.validate_roles(["admin", "designer"]).is_ok());
        assert!(validator.validate_roles(["admin", "plumber"]).is_err());
    }

    #[rstest]
    fn post_limits_are_enforced(validator: Validator, new_post: NewPost) {
        assert!(validator.validate_new_post(&new_post).is_ok());

        let long_title = NewPost {
            title: "t".repeat(POST_TITLE_MAX + 1),
            ..new_post.clone()
        };
        assert!(matches!(
            validator.validate_new_post(&long_title),
            Err(ValidationError::TooLong { max: POST_TITLE_MAX, .. })
        ));

        let blank_tag = NewPost {
            tags: vec![" ".to_owned()],
            ..new_post
        };
        assert!(matches!(
            validator.validate_new_post(&blank_tag),
            Err(ValidationError::Required { .. })
        ));
    }

    #[rstest]
    fn post_update_only_checks_present_fields(validator: Validator) {
        assert!(validator.validate_post_update(&PostUpdate::default()).is_ok());
        let update = PostUpdate {
            content: Some("c".repeat(POST_CONTENT_MAX + 1)),
            ..PostUpdate::default()
        };
        assert!(validator.validate_post_update(&update).is_err());
    }

    #[rstest]
    fn comment_length_is_enforced(validator: Validator) {
        let comment = NewComment {
            user_id: UserId::generate(),
            post_id: PostId::generate(),
            parent_id: None,
            content: "x".repeat(COMMENT_CONTENT_MAX + 1),
        };
        assert!(validator.validate_new_comment(&comment).is_err());
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(5, true)]
    #[case(6, false)]
    fn review_score_range(validator: Validator, #[case] score: i32, #[case] ok: bool) {
        let review = NewReview {
            rated_user_id: UserId::generate(),
            rater_id: UserId::generate(),
            rater_username: "grace".to_owned(),
            score,
            comment: None,
        };
        assert_eq!(validator.validate_new_review(&review).is_ok(), ok);
    }
}
