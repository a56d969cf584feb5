//! Tracing and logging setup shared by every binary and test suite.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Install a compact subscriber that writes through the test harness.
///
/// Output is captured per test and only shown for failures. Safe to call
/// from every test.
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
