//! Integration tests per subsystem.

/// Event kernel under a running scheduler.
pub mod event;
/// Fabric traffic through scheduled connections.
pub mod fabric;
/// Execute-latency tables.
pub mod latency;
/// Property-based checks.
pub mod properties;
/// The assembled vector backend.
pub mod rvv;
/// Loader and simulator driver.
pub mod sim;
