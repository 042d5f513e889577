//! Transaction coordinator.
//!
//! Multi-statement operations are expressed as a [`UnitOfWork`]. The
//! coordinator runs the unit inside one database transaction on a single
//! connection, commits on success, rolls back on any error and re-runs the
//! whole unit when PostgreSQL reports a transient conflict. A unit may also
//! abort with a store-level error; that rolls back and reaches the caller
//! unchanged.

use std::time::Duration;

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use super::diesel_helpers::is_transient;

/// Attempts made before a transient conflict is reported as a failure.
pub(crate) const MAX_ATTEMPTS: u32 = 3;

const BASE_BACKOFF_MS: u64 = 10;

/// Why a unit of work did not commit.
#[derive(Debug)]
pub(crate) enum TxError<E> {
    /// A statement failed.
    Database(diesel::result::Error),
    /// The unit decided to abort.
    Aborted(E),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(error: diesel::result::Error) -> Self {
        Self::Database(error)
    }
}

impl<E> TxError<E> {
    /// Collapse into the repository error type.
    pub(crate) fn into_store_error(
        self,
        map_database: impl FnOnce(diesel::result::Error) -> E,
    ) -> E {
        match self {
            Self::Database(error) => map_database(error),
            Self::Aborted(error) => error,
        }
    }
}

/// A sequence of statements that must commit together.
///
/// `run` may execute more than once; every attempt starts from a rolled-back
/// state, so units must not keep side effects outside the connection.
#[async_trait]
pub(crate) trait UnitOfWork: Sync {
    type Output: Send;
    type Error: Send;

    async fn run(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<Self::Output, TxError<Self::Error>>;
}

/// Execute `unit` atomically, retrying transient conflicts.
pub(crate) async fn execute<U>(
    conn: &mut AsyncPgConnection,
    unit: &U,
) -> Result<U::Output, TxError<U::Error>>
where
    U: UnitOfWork,
{
    let mut attempt = 1;
    loop {
        let outcome: Result<U::Output, TxError<U::Error>> = conn
            .transaction(|tx| async move { unit.run(tx).await }.scope_boxed())
            .await;

        match outcome {
            Err(TxError::Database(error)) if is_transient(&error) && attempt < MAX_ATTEMPTS => {
                let delay = backoff(attempt);
                warn!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "transaction conflict, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Exponential backoff with up to 50% jitter.
fn backoff(attempt: u32) -> Duration {
    let base = BASE_BACKOFF_MS << attempt.min(6);
    let jitter = SmallRng::from_entropy().gen_range(0..=base / 2);
    Duration::from_millis(base + jitter)
}
