//! Drive-by-wire mode state machine

use log::info;
use serde::Serialize;

/// Who is in control of the vehicle.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum DbwMode {
    /// A human (or another external system) is driving, no actuation shall
    /// be commanded.
    Manual,

    /// The vehicle is under autonomous control.
    Autonomous,
}

/// A change of `DbwMode`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum ModeTransition {
    EnteredAutonomous,
    EnteredManual,
}

impl Default for DbwMode {
    fn default() -> Self {
        DbwMode::Manual
    }
}

impl DbwMode {
    /// Get the mode matching the DBW enabled flag.
    pub fn from_enabled(dbw_enabled: bool) -> Self {
        if dbw_enabled {
            DbwMode::Autonomous
        }
        else {
            DbwMode::Manual
        }
    }

    /// Update the mode from the DBW enabled flag, returning the transition if
    /// the mode changed.
    pub fn update(&mut self, dbw_enabled: bool) -> Option<ModeTransition> {
        let new_mode = Self::from_enabled(dbw_enabled);

        if new_mode == *self {
            return None;
        }

        *self = new_mode;

        let transition = match new_mode {
            DbwMode::Autonomous => ModeTransition::EnteredAutonomous,
            DbwMode::Manual => ModeTransition::EnteredManual,
        };
        info!("DBW mode transition: {:?}", transition);

        Some(transition)
    }

    pub fn is_autonomous(&self) -> bool {
        *self == DbwMode::Autonomous
    }
}
