//! Storage engine entry point: applies migrations, assembles the stores and
//! sweeps expired invites until interrupted.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::sync::Arc;

use color_eyre::eyre::{WrapErr, eyre};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use cocraft::config::StoreSettings;
use cocraft::domain::{Collections, InviteReaper};
use cocraft::outbound::persistence::{DbPool, run_pending_migrations};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = StoreSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let database_url = settings
        .database_url()
        .ok_or_else(|| eyre!("COCRAFT_DATABASE_URL must be set"))?
        .to_owned();

    let migration_url = database_url.clone();
    let applied = tokio::task::spawn_blocking(move || run_pending_migrations(&migration_url))
        .await
        .wrap_err("migration task panicked")?
        .wrap_err("failed to migrate database")?;
    info!(applied, "database schema is current");

    let pool = DbPool::new(settings.pool_config(&database_url))
        .await
        .wrap_err("failed to create database pool")?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let collections = Collections::diesel(pool, Arc::clone(&clock));

    let reaper = InviteReaper::new(
        Arc::clone(&collections.users),
        clock,
        settings.invite_sweep_interval(),
    );
    info!(
        invite_ttl_hours = settings.invite_ttl().num_hours(),
        sweep_secs = settings.invite_sweep_interval().as_secs(),
        "storage engine ready"
    );

    reaper
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("storage engine stopped");
    Ok(())
}
