//! # Twist control module
//!
//! Twist control converts a desired motion (target linear velocity and yaw
//! rate) and the measured vehicle velocity into throttle, brake and steering
//! demands. It is made up of:
//!
//! - [`LowPassFilter`]: smooths the measured velocity,
//! - [`PidController`]: tracks the target velocity, with anti-windup,
//! - [`YawController`]: converts the target yaw rate into a steering angle,
//! - [`Controller`]: combines the above once per control tick.
//!
//! Nothing in this module performs I/O or blocks, the caller owns the clock
//! and passes the elapsed time into each tick.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controller;
mod low_pass;
mod mode;
mod params;
mod pid;
mod yaw_ctrl;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use controller::*;
pub use low_pass::*;
pub use mode::*;
pub use params::*;
pub use pid::*;
pub use yaw_ctrl::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Density of the fuel carried by the vehicle.
///
/// Units: kilograms/litre
pub const GAS_DENSITY_KGL: f64 = 2.858;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during twist control.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TwistCtrlError {
    #[error("Invalid control input: {0}")]
    InvalidInput(String),

    #[error("Invalid twist control parameters: {0}")]
    InvalidParams(String),
}
