//! Messages consumed by the DBW node

use serde::{Serialize, Deserialize};

/// A velocity command from the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TwistCmd {
    /// Target linear velocity, positive forwards.
    ///
    /// Units: meters/second
    pub linear_ms: f64,

    /// Target yaw rate, following the right hand rule about the vehicle's Z+
    /// (upwards) axis so that a positive rate turns the vehicle to the left.
    ///
    /// Units: radians/second
    pub angular_rads: f64,
}

/// The measured velocity of the vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityReport {
    /// Current linear velocity, positive forwards.
    ///
    /// Units: meters/second
    pub linear_ms: f64,
}
