//! Embedded schema migrations.
//!
//! The SQL under `backend/migrations` is compiled into the binary so a
//! deployment never runs against a schema it was not built for.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Migrations from the `backend/migrations` directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while bringing a database up to date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The migration connection could not be opened.
    #[error("failed to connect for migrations: {message}")]
    Connect { message: String },
    /// A migration failed to apply.
    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
}

/// Apply every pending migration, returning how many ran.
///
/// Blocking: uses a synchronous connection. Call from `spawn_blocking` when
/// inside a runtime.
///
/// # Errors
///
/// Returns [`MigrationError`] when the database is unreachable or a
/// migration fails.
pub fn run_pending_migrations(database_url: &str) -> Result<usize, MigrationError> {
    let mut conn = PgConnection::establish(database_url).map_err(|err| MigrationError::Connect {
        message: err.to_string(),
    })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?;

    for version in &applied {
        info!(%version, "migration applied");
    }
    Ok(applied.len())
}
