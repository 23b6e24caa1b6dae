//! # Communications interface crate.
//!
//! Provides all common message definitions for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Messages consumed and produced by the drive-by-wire node
pub mod dbw;
