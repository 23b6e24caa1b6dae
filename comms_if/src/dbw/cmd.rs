//! Actuator commands published by the DBW node

use serde::{Serialize, Deserialize};

/// How a pedal command value shall be interpreted by the actuator.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PedalCmdType {
    /// Fraction of full pedal travel, between 0 and 1.
    Percent,

    /// Brake torque at the wheels in Newton-meters.
    Torque,
}

/// Throttle pedal command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrottleCmd {
    pub enable: bool,
    pub pedal_cmd_type: PedalCmdType,
    pub pedal_cmd: f64,
}

/// Brake pedal command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrakeCmd {
    pub enable: bool,
    pub pedal_cmd_type: PedalCmdType,
    pub pedal_cmd: f64,
}

/// Steering wheel command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringCmd {
    pub enable: bool,

    /// Units: radians
    pub steering_wheel_angle_cmd: f64,
}

/// The set of commands published on one cycle. A channel which was not
/// published this cycle is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCmds {
    pub throttle: Option<ThrottleCmd>,
    pub brake: Option<BrakeCmd>,
    pub steering: Option<SteeringCmd>,
}

impl ThrottleCmd {
    /// Build an enabled throttle command as a pedal fraction.
    pub fn percent(pedal_cmd: f64) -> Self {
        Self {
            enable: true,
            pedal_cmd_type: PedalCmdType::Percent,
            pedal_cmd,
        }
    }
}

impl BrakeCmd {
    /// Build an enabled brake command as a wheel torque.
    pub fn torque(torque_nm: f64) -> Self {
        Self {
            enable: true,
            pedal_cmd_type: PedalCmdType::Torque,
            pedal_cmd: torque_nm,
        }
    }
}

impl SteeringCmd {
    /// Build an enabled steering command.
    pub fn angle(angle_rad: f64) -> Self {
        Self {
            enable: true,
            steering_wheel_angle_cmd: angle_rad,
        }
    }
}

impl ActuatorCmds {
    /// Returns true if no channel was published.
    pub fn is_empty(&self) -> bool {
        self.throttle.is_none() && self.brake.is_none() && self.steering.is_none()
    }
}
