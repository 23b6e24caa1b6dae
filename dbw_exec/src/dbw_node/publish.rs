//! Publication policy for actuator commands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::dbw::{ActuatorCmds, BrakeCmd, SteeringCmd, ThrottleCmd};

use super::{ChannelParams, PublishParams};
use crate::twist_ctrl::{ControlOutput, DbwMode, ModeTransition};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChannelParams {
    /// Returns true if this channel shall be published on the given cycle.
    pub fn is_due(&self, cycle: u64) -> bool {
        self.enabled && self.period_cycles > 0 && cycle % self.period_cycles == 0
    }
}

impl PublishParams {
    /// Build the commands to publish for the given output.
    ///
    /// # Inputs
    /// - `output`: the output of this cycle.
    /// - `mode`: the DBW mode during this cycle.
    /// - `transition`: the mode transition which occured this cycle, if any.
    /// - `cycle`: the number of control cycles run before this one.
    ///
    /// On the cycle manual mode is entered every enabled channel is published
    /// regardless of its period, so that the actuators see the neutral output
    /// before control is handed over.
    pub fn build_cmds(
        &self,
        output: &ControlOutput,
        mode: DbwMode,
        transition: Option<ModeTransition>,
        cycle: u64
    ) -> ActuatorCmds {
        let handover = transition == Some(ModeTransition::EnteredManual);

        if !mode.is_autonomous() && !self.publish_when_manual && !handover {
            return ActuatorCmds::default();
        }

        let due = |c: &ChannelParams| c.enabled && (handover || c.is_due(cycle));

        ActuatorCmds {
            throttle: if due(&self.throttle) {
                Some(ThrottleCmd::percent(output.throttle))
            } else {
                None
            },
            brake: if due(&self.brake) {
                Some(BrakeCmd::torque(output.brake_nm))
            } else {
                None
            },
            steering: if due(&self.steering) {
                Some(SteeringCmd::angle(output.steer_rad))
            } else {
                None
            },
        }
    }
}
