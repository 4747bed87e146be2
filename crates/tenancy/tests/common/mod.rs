//! Test infrastructure for tenant isolation.
//!
//! Shared harness for wiring a connection, isolation plugin and registry
//! against the in-memory store.

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::*;
pub use harness::*;
