//! Trace utilities

/// Trace category for the failure channel.
pub const FAILURE: &str = "failure";
/// Trace category for the execution engine.
pub const ENGINE: &str = "engine";
/// Trace category for test registration.
pub const REGISTRY: &str = "registry";
