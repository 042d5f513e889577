//! Shared helpers for Diesel repository implementations.
//!
//! - Error logging and the common query/connection mapping
//! - Constraint violation classification
//! - The per-operation query budget
//! - `ILIKE` pattern escaping for search

use std::future::Future;
use std::time::Duration;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, warn};

/// Emit debug context for a failed Diesel operation.
pub(crate) fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            "diesel operation failed"
        ),
    }
}

/// Map the Diesel error variants every repository treats alike.
///
/// Callers match the violations they understand first and hand everything
/// else here.
pub(crate) fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    log_diesel_error(&error);

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            query("transaction serialization conflict")
        }
        DieselError::DatabaseError(_, _) => query("database error"),
        _ => query("database error"),
    }
}

/// Integrity constraint a statement tripped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation<'a> {
    /// Unique index or constraint.
    Unique(Option<&'a str>),
    /// Foreign key reference.
    ForeignKey(Option<&'a str>),
    /// `CHECK` constraint.
    Check(Option<&'a str>),
}

/// Classify an integrity violation, if the error is one.
pub(crate) fn violation(error: &DieselError) -> Option<Violation<'_>> {
    let DieselError::DatabaseError(kind, info) = error else {
        return None;
    };
    let constraint = info.constraint_name();
    match kind {
        DatabaseErrorKind::UniqueViolation => Some(Violation::Unique(constraint)),
        DatabaseErrorKind::ForeignKeyViolation => Some(Violation::ForeignKey(constraint)),
        DatabaseErrorKind::CheckViolation => Some(Violation::Check(constraint)),
        _ => None,
    }
}

/// Whether re-running the whole transaction may succeed.
///
/// Serialization failures and deadlocks are transient: PostgreSQL aborted
/// one side of a conflict and the other committed.
pub(crate) fn is_transient(error: &DieselError) -> bool {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => true,
        DieselError::DatabaseError(DatabaseErrorKind::Unknown, info) => {
            info.message().contains("deadlock detected")
        }
        _ => false,
    }
}

/// Run `operation` within `budget`, reporting overruns through `timed_out`.
///
/// Dropping the operation mid-transaction drops its pooled connection with
/// the transaction still open; the pool discards such connections.
pub(crate) async fn bounded<T, E, F>(
    budget: Duration,
    operation: F,
    timed_out: impl FnOnce(u64) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(budget, operation).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
            warn!(timeout_ms, "store operation exceeded its query budget");
            Err(timed_out(timeout_ms))
        }
    }
}

/// Build a case-insensitive substring pattern, escaping `ILIKE` wildcards.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, PartialEq, Eq)]
    enum Mapped {
        Query(&'static str),
        Connection(&'static str),
    }

    #[rstest]
    #[case("oak", "%oak%")]
    #[case("50%", "%50\\%%")]
    #[case("snake_case", "%snake\\_case%")]
    #[case("back\\slash", "%back\\\\slash%")]
    fn contains_pattern_escapes_wildcards(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(contains_pattern(input), expected);
    }

    #[rstest]
    fn not_found_maps_to_query() {
        let mapped =
            map_basic_diesel_error(DieselError::NotFound, Mapped::Query, Mapped::Connection);
        assert_eq!(mapped, Mapped::Query("record not found"));
    }

    #[rstest]
    fn serialization_failure_maps_to_neutral_query_error() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            Box::new("could not serialize access".to_owned()),
        );
        assert!(is_transient(&error));
        let mapped = map_basic_diesel_error(error, Mapped::Query, Mapped::Connection);
        assert_eq!(mapped, Mapped::Query("transaction serialization conflict"));
    }

    #[rstest]
    fn non_database_errors_are_not_violations() {
        assert_eq!(violation(&DieselError::NotFound), None);
        assert!(!is_transient(&DieselError::NotFound));
    }

    #[tokio::test]
    async fn bounded_reports_overrun() {
        let result: Result<(), u64> = bounded(
            Duration::from_millis(5),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            |ms| ms,
        )
        .await;
        assert_eq!(result, Err(5));
    }

    #[tokio::test]
    async fn bounded_passes_through_results() {
        let result: Result<u8, u64> =
            bounded(Duration::from_secs(1), async { Ok(7) }, |ms| ms).await;
        assert_eq!(result, Ok(7));
    }
}
