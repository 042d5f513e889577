//! Shared helper utilities for integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! small helpers shared between suites live here instead of being copied.

pub mod cluster_skip;
pub mod embedded_postgres;
pub mod pg_embed;
pub mod store_context;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::{migrate_schema, reset_database};
pub use store_context::{StepClock, StoreContext, new_user, setup_store};

/// Render a `postgres` error with enough detail to be useful in CI logs.
///
/// The `postgres::Error` `Display` implementation often collapses database
/// errors to a generic `db error`, which hides the message and SQLSTATE.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );

    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }

    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }

    summary
}
