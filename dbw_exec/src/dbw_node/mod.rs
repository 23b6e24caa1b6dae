//! # DBW node module
//!
//! The DBW node sits between the transport layer and twist control. Each
//! cycle it:
//!
//! 1. Latches the latest twist command, velocity report and DBW enabled flag,
//! 2. Runs the twist controller once both a command and a velocity have been
//!    received,
//! 3. Falls back to the last good output if the controller rejects its
//!    inputs,
//! 4. Packages the output into actuator commands according to the
//!    publication policy.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod publish;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use publish::*;
pub use state::*;

use crate::twist_ctrl::TwistCtrlError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while initialising the DBW node.
#[derive(Debug, thiserror::Error)]
pub enum DbwNodeInitError {
    #[error("Cannot load the DBW node parameters: {0}")]
    LoadError(#[from] LoadError),

    #[error("{0}")]
    InvalidParams(#[from] TwistCtrlError),

    #[error("Invalid publication parameters: {0}")]
    InvalidPublishParams(String),

    #[error("Cannot create the DBW node archives: {0}")]
    ArchiveError(#[from] ArchiveError),
}

/// Possible errors that can occur during DBW node processing.
#[derive(Debug, thiserror::Error)]
pub enum DbwNodeError {
    #[error("The DBW node has not been initialised")]
    NotInitialised,
}
