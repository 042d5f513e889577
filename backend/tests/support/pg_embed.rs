//! Bootstrap for embedded PostgreSQL in integration tests.
//!
//! `pg-embed-setup-unpriv` installs into `/var/tmp` unless `PG_RUNTIME_DIR`
//! and `PG_DATA_DIR` say otherwise. Sandboxed runners cannot write there, so
//! when either variable is missing both are pointed at a fresh directory under
//! the cargo target dir for the duration of the bootstrap. Bootstraps are
//! serialised because the override mutates process environment.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use pg_embedded_setup_unpriv::TestCluster;
use uuid::Uuid;

static BOOTSTRAP_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const MAX_ATTEMPTS: u32 = 4;
const RETRY_DELAY_MS: u64 = 500;

const TRANSIENT_MARKERS: [&str; 7] = [
    "error decoding response body",
    "connection reset",
    "connection refused",
    "timed out",
    "temporarily unavailable",
    "dns error",
    "failed to lookup",
];

fn scratch_dirs() -> Result<(PathBuf, PathBuf), std::io::Error> {
    let target = std::env::var_os("CARGO_TARGET_DIR").map_or_else(
        || PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("target"),
        PathBuf::from,
    );
    let base = target
        .join("pg-embed")
        .join(format!("cluster-{}-{}", std::process::id(), Uuid::new_v4()));
    let runtime_dir = base.join("install");
    let data_dir = base.join("data");
    std::fs::create_dir_all(&runtime_dir)?;
    std::fs::create_dir_all(&data_dir)?;
    Ok((runtime_dir, data_dir))
}

/// Binary downloads fail intermittently when many suites start at once.
fn is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Start a [`TestCluster`], retrying transient download failures.
pub fn test_cluster() -> Result<TestCluster, String> {
    let _bootstrap = BOOTSTRAP_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|err| err.into_inner());

    let needs_override =
        std::env::var_os("PG_RUNTIME_DIR").is_none() || std::env::var_os("PG_DATA_DIR").is_none();
    let _env = if needs_override {
        let (runtime_dir, data_dir) = scratch_dirs().map_err(|err| err.to_string())?;
        Some(env_lock::lock_env([
            ("PG_RUNTIME_DIR", Some(runtime_dir.to_string_lossy().into_owned())),
            ("PG_DATA_DIR", Some(data_dir.to_string_lossy().into_owned())),
        ]))
    } else {
        None
    };

    let mut attempt = 1;
    loop {
        match TestCluster::new() {
            Ok(cluster) => return Ok(cluster),
            Err(err) => {
                let message = format!("{err:?}");
                if attempt >= MAX_ATTEMPTS || !is_transient(&message) {
                    return Err(message);
                }
                let delay = Duration::from_millis(RETRY_DELAY_MS << (attempt - 1));
                eprintln!(
                    "pg-embed: attempt {attempt}/{MAX_ATTEMPTS} failed, \
                     retrying in {delay:?}: {message}"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
