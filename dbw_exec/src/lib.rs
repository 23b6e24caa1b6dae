//! # DBW library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to
//! access items defined inside the DBW executive crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - holds all data passed between modules during a cycle
pub mod data_store;

/// DBW node - latches incoming messages, runs twist control and packages actuator commands
pub mod dbw_node;

/// Twist control - converts target velocities into throttle, brake and steering demands
pub mod twist_ctrl;
