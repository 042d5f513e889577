//! Helpers for controlling embedded test cluster behaviour.
//!
//! Suites that need embedded PostgreSQL fail when the cluster cannot start,
//! so a broken cluster never passes for a green run. Environments without a
//! usable cluster opt out with `SKIP_TEST_CLUSTER=1`, which turns the failure
//! into a `SKIP-TEST-CLUSTER` marker.

/// Returns true when `SKIP_TEST_CLUSTER` is set to a truthy value.
///
/// Truthy values: "1", "true", "yes" (case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Handles embedded cluster setup failures consistently across suites.
///
/// When `SKIP_TEST_CLUSTER` is truthy, prints a skip marker and returns
/// `None`. Otherwise panics with the failure reason.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
