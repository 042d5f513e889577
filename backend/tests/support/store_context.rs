//! Per-test database context shared by the store suites.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, Utc};
use cocraft::domain::{NewUser, Profile, Role};
use cocraft::outbound::persistence::{DbPool, PoolConfig};
use mockable::Clock;
use pg_embedded_setup_unpriv::TestCluster;
use tokio::runtime::Runtime;

use super::pg_embed::test_cluster;
use super::{migrate_schema, reset_database};

/// Clock that moves forward one millisecond per reading and can be advanced
/// by hand, so timestamps are distinct and expiry is testable.
pub struct StepClock {
    now: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *now += by;
    }
}

impl Clock for StepClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *now += Duration::milliseconds(1);
        *now
    }
}

/// Migrated database plus the runtime and pool the stores run on.
pub struct StoreContext {
    pub runtime: Runtime,
    pub pool: DbPool,
    pub clock: Arc<StepClock>,
    _cluster: TestCluster,
}

impl StoreContext {
    /// The clock as the stores consume it.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }
}

/// Start a cluster, recreate `database` and apply every migration.
pub fn setup_store(database: &str) -> Result<StoreContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    reset_database(&cluster, database)?;
    let database_url = cluster.connection().database_url(database);
    migrate_schema(&database_url)?;

    let config = PoolConfig::new(&database_url)
        .with_max_size(4)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(StoreContext {
        runtime,
        pool,
        clock: Arc::new(StepClock::new()),
        _cluster: cluster,
    })
}

/// Registration payload with a derived email.
pub fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$v=19$stub".to_owned(),
        role,
        profile: Profile::default(),
    }
}
