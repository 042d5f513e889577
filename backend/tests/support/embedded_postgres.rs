//! Shared embedded PostgreSQL helpers for integration tests.
//!
//! - Database reset uses `postgres` so Diesel transaction semantics cannot
//!   interfere with `DROP DATABASE`.
//! - Schema setup runs the migrations embedded in the library, so test
//!   schemas cannot drift from production.

use cocraft::outbound::persistence::run_pending_migrations;
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};

use super::format_postgres_error;

/// Drop and recreate `name` on the cluster.
pub fn reset_database(cluster: &TestCluster, name: &str) -> Result<(), String> {
    let admin_url = cluster.connection().database_url("postgres");
    let mut client = Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    // Separate round trips: neither statement may run in a transaction block.
    client
        .batch_execute(&format!("DROP DATABASE IF EXISTS \"{name}\""))
        .map_err(|err| format_postgres_error(&err))?;
    client
        .batch_execute(&format!("CREATE DATABASE \"{name}\""))
        .map_err(|err| format_postgres_error(&err))?;
    Ok(())
}

/// Runs all pending Diesel migrations against the test database.
pub fn migrate_schema(url: &str) -> Result<(), String> {
    run_pending_migrations(url)
        .map(|_| ())
        .map_err(|err| err.to_string())
}
