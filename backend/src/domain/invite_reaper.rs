//! Periodic purge of expired invites.
//!
//! Lookups already ignore expired invites; the reaper keeps the table from
//! growing without bound.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{debug, info, warn};

use super::ports::{UserRepository, UserRepositoryError};

/// Background task deleting invites past their expiry.
#[derive(Clone)]
pub struct InviteReaper {
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl InviteReaper {
    /// Create a reaper sweeping every `interval`. A zero interval is raised
    /// to one second.
    pub fn new(users: Arc<dyn UserRepository>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            users,
            clock,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Run one sweep, returning how many invites were removed.
    ///
    /// # Errors
    ///
    /// Propagates the user store failure.
    pub async fn sweep_once(&self) -> Result<u64, UserRepositoryError> {
        let now = self.clock.utc();
        let purged = self.users.purge_expired_invites(now).await?;
        if purged > 0 {
            info!(purged, "expired invites purged");
        } else {
            debug!("no expired invites");
        }
        Ok(purged)
    }

    /// Sweep on every tick until `shutdown` resolves. Failed sweeps are logged
    /// and retried on the next tick.
    pub async fn run<S>(self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("invite reaper stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep_once().await {
                        warn!(error = %err, error_kind = err.kind(), "invite sweep failed");
                    }
                }
            }
        }
    }
}
