//! Store settings loaded via OrthoConfig.
//!
//! Values come from `COCRAFT_*` environment variables, configuration files or
//! command-line flags; anything unset falls back to the defaults below.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

use crate::outbound::persistence::PoolConfig;

const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_MIN_IDLE: u32 = 2;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_INVITE_TTL_HOURS: i64 = 72;
const MAX_INVITE_TTL_HOURS: i64 = 24 * 365;
const DEFAULT_INVITE_SWEEP_SECS: u64 = 60;

/// Configuration for the storage engine and its background tasks.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COCRAFT")]
pub struct StoreSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub pool_max_size: Option<u32>,
    /// Idle connections kept warm.
    pub pool_min_idle: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub connection_timeout_secs: Option<u64>,
    /// Budget for one store operation, in milliseconds.
    pub query_timeout_ms: Option<u64>,
    /// Lifetime of an activation invite, in hours.
    pub invite_ttl_hours: Option<i64>,
    /// Seconds between expired-invite sweeps.
    pub invite_sweep_secs: Option<u64>,
}

impl StoreSettings {
    /// The configured database URL, if any.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Per-operation query budget.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.unwrap_or(DEFAULT_QUERY_TIMEOUT_MS))
    }

    /// How long an invite stays redeemable.
    ///
    /// Values outside one hour to one year fall back to the default.
    pub fn invite_ttl(&self) -> chrono::Duration {
        let hours = match self.invite_ttl_hours {
            Some(hours) if (1..=MAX_INVITE_TTL_HOURS).contains(&hours) => hours,
            Some(hours) => {
                warn!(
                    hours,
                    default = DEFAULT_INVITE_TTL_HOURS,
                    "invite TTL out of range; using default"
                );
                DEFAULT_INVITE_TTL_HOURS
            }
            None => DEFAULT_INVITE_TTL_HOURS,
        };
        chrono::Duration::hours(hours)
    }

    /// Interval between expired-invite sweeps.
    pub fn invite_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.invite_sweep_secs.unwrap_or(DEFAULT_INVITE_SWEEP_SECS))
    }

    /// Pool configuration for `database_url`.
    pub fn pool_config(&self, database_url: &str) -> PoolConfig {
        PoolConfig::new(database_url)
            .with_max_size(self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE))
            .with_min_idle(Some(self.pool_min_idle.unwrap_or(DEFAULT_POOL_MIN_IDLE)))
            .with_connection_timeout(Duration::from_secs(
                self.connection_timeout_secs
                    .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
            ))
            .with_query_timeout(self.query_timeout())
    }
}
