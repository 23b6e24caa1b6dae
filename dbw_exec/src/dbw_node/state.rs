//! Implementations for the DbwNode state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::{DbwNodeError, DbwNodeInitError, Params};
use crate::twist_ctrl::{self, ControlOutput, Controller, DbwMode, ModeTransition};
use comms_if::dbw::{ActuatorCmds, TwistCmd, VelocityReport};
use util::{
    params,
    module::State,
    archive::{Archived, Archiver, ArchiveError},
    session::{self, Session}};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// DBW node module state
#[derive(Default)]
pub struct DbwNode {

    pub(crate) params: Params,

    controller: Option<Controller>,

    // Latched inputs
    twist_cmd: Option<TwistCmd>,
    velocity: Option<VelocityReport>,
    dbw_enabled: bool,

    /// The last output produced from valid inputs, used in place of the
    /// controller's output when it rejects its inputs.
    last_safe_output: ControlOutput,

    /// Number of cycles on which control has been run
    num_ctrl_cycles: u64,

    pub(crate) report: StatusReport,
    pub(crate) output: Option<ControlOutput>,
    pub(crate) cmds: ActuatorCmds,
    arch_cycle: Archiver,
}

/// Input data to the DBW node.
///
/// Each message is `None` if it was not received on this cycle, in which case
/// the last received value is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    pub twist_cmd: Option<TwistCmd>,
    pub velocity: Option<VelocityReport>,
    pub dbw_enabled: Option<bool>,

    /// Time since the previous cycle.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Status report for DBW node processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// No control was run as either no twist command or no velocity has been
    /// received yet.
    pub waiting_for_inputs: bool,

    /// The controller rejected its inputs and the last safe output was used.
    pub fallback_used: bool,

    /// The twist controller's report, if control was run.
    pub ctrl: Option<twist_ctrl::StatusReport>,
}

/// One row of the node's cycle archive.
#[derive(Serialize)]
struct CycleRecord {
    time_s: f64,
    cycle: u64,
    waiting_for_inputs: bool,
    fallback_used: bool,
    mode: Option<DbwMode>,
    transition: Option<ModeTransition>,
    throttle: Option<f64>,
    brake_nm: Option<f64>,
    steer_rad: Option<f64>,
    filtered_velocity_ms: Option<f64>,
    velocity_error_ms: Option<f64>,
    accel_dem_mss: Option<f64>,
    accel_dem_limited: bool,
    yaw_rate_limited: bool,
    steer_limited: bool,
    brake_limited: bool,
    in_brake_deadband: bool,
    standstill_hold: bool,
    throttle_published: bool,
    brake_published: bool,
    steering_published: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for DbwNode {
    type InitData = String;
    type InitError = DbwNodeInitError;

    type InputData = InputData;
    type OutputData = ActuatorCmds;
    type StatusReport = StatusReport;
    type ProcError = DbwNodeError;

    /// Initialise the DBW node.
    ///
    /// Expected init data is the path to the parameter file, relative to the
    /// parameters directory.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        let params: Params = params::load(&init_data)?;

        *self = Self::from_params(params)?;

        // Initialise the archiver
        self.arch_cycle = Archiver::from_path(session, "dbw_node/cycle.csv")?;

        Ok(())
    }

    /// Perform cyclic processing of the DBW node.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report and published commands
        self.report = StatusReport::default();
        self.cmds = ActuatorCmds::default();
        self.output = None;

        // Latch any new messages
        if let Some(t) = input_data.twist_cmd {
            self.twist_cmd = Some(t);
        }
        if let Some(v) = input_data.velocity {
            self.velocity = Some(v);
        }
        if let Some(e) = input_data.dbw_enabled {
            self.dbw_enabled = e;
        }

        let controller = match self.controller {
            Some(ref mut c) => c,
            None => return Err(DbwNodeError::NotInitialised)
        };

        // Wait until there's something to control with
        let (twist, velocity) = match (self.twist_cmd, self.velocity) {
            (Some(t), Some(v)) => (t, v),
            _ => {
                trace!("DbwNode waiting for a twist command and velocity");
                self.report.waiting_for_inputs = true;
                return Ok((self.cmds, self.report));
            }
        };

        let (mut output, ctrl_report) = match controller.control(
            twist.linear_ms,
            twist.angular_rads,
            velocity.linear_ms,
            self.dbw_enabled,
            input_data.dt_s
        ) {
            Ok(o) => o,
            Err(e) => {
                warn!("TwistCtrl error, holding the last safe output: {}", e);
                self.report.fallback_used = true;

                let r = twist_ctrl::StatusReport {
                    mode: controller.mode(),
                    transition: controller.last_transition(),
                    ..Default::default()
                };
                (self.last_safe_output, r)
            }
        };

        // A non-finite demand must never reach the actuators
        if !output.is_finite() {
            warn!("TwistCtrl produced a non-finite output ({:?}), holding the last safe output", output);
            self.report.fallback_used = true;
            output = self.last_safe_output;
        }

        if !self.report.fallback_used {
            self.last_safe_output = output;
        }

        // Package the output for publication
        self.cmds = self.params.publish.build_cmds(
            &output,
            ctrl_report.mode,
            ctrl_report.transition,
            self.num_ctrl_cycles
        );
        self.num_ctrl_cycles += 1;

        self.report.ctrl = Some(ctrl_report);
        self.output = Some(output);

        trace!("DbwNode output: {:?}, published: {:?}", output, self.cmds);

        Ok((self.cmds, self.report))
    }

    /// Disable autonomous control until a DBW enabled message is received.
    fn make_safe(&mut self) {
        if self.dbw_enabled {
            info!("DbwNode made safe, autonomous control disabled");
        }
        self.dbw_enabled = false;
    }
}

impl Archived for DbwNode {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if !self.arch_cycle.is_active() {
            return Ok(());
        }

        let ctrl = self.report.ctrl.unwrap_or_default();
        let ran = self.report.ctrl.is_some();

        let record = CycleRecord {
            time_s: session::get_elapsed_seconds(),
            cycle: self.num_ctrl_cycles,
            waiting_for_inputs: self.report.waiting_for_inputs,
            fallback_used: self.report.fallback_used,
            mode: self.report.ctrl.map(|r| r.mode),
            transition: ctrl.transition,
            throttle: self.output.map(|o| o.throttle),
            brake_nm: self.output.map(|o| o.brake_nm),
            steer_rad: self.output.map(|o| o.steer_rad),
            filtered_velocity_ms: if ran { Some(ctrl.filtered_velocity_ms) } else { None },
            velocity_error_ms: if ran { Some(ctrl.velocity_error_ms) } else { None },
            accel_dem_mss: if ran { Some(ctrl.accel_dem_mss) } else { None },
            accel_dem_limited: ctrl.accel_dem_limited,
            yaw_rate_limited: ctrl.yaw_rate_limited,
            steer_limited: ctrl.steer_limited,
            brake_limited: ctrl.brake_limited,
            in_brake_deadband: ctrl.in_brake_deadband,
            standstill_hold: ctrl.standstill_hold,
            throttle_published: self.cmds.throttle.is_some(),
            brake_published: self.cmds.brake.is_some(),
            steering_published: self.cmds.steering.is_some(),
        };

        self.arch_cycle.serialise(record)
    }
}

impl DbwNode {

    /// Create an initialised node from parameters, without archiving.
    pub fn from_params(params: Params) -> Result<Self, DbwNodeInitError> {
        params.validate()?;

        let controller = Controller::new(params.twist_ctrl.clone())?;

        Ok(Self {
            params,
            controller: Some(controller),
            ..Default::default()
        })
    }

    /// The node's twist controller, if initialised.
    pub fn controller(&self) -> Option<&Controller> {
        self.controller.as_ref()
    }

    /// The output which will be used if the controller rejects its inputs.
    pub fn last_safe_output(&self) -> ControlOutput {
        self.last_safe_output
    }

    /// The output of the last cycle, if control was run.
    pub fn output(&self) -> Option<ControlOutput> {
        self.output
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn node() -> DbwNode {
        DbwNode::from_params(Params::default()).unwrap()
    }

    fn input(
        twist: Option<(f64, f64)>,
        velocity: Option<f64>,
        enabled: Option<bool>,
        dt_s: f64
    ) -> InputData {
        InputData {
            twist_cmd: twist.map(|(l, a)| TwistCmd { linear_ms: l, angular_rads: a }),
            velocity: velocity.map(|v| VelocityReport { linear_ms: v }),
            dbw_enabled: enabled,
            dt_s,
        }
    }

    #[test]
    fn test_not_initialised() {
        let mut n = DbwNode::default();
        assert!(matches!(
            n.proc(&InputData::default()),
            Err(DbwNodeError::NotInitialised)
        ));
    }

    #[test]
    fn test_waits_for_inputs() {
        let mut n = node();

        let (cmds, report) = n.proc(&input(None, None, Some(true), 0.02)).unwrap();
        assert!(cmds.is_empty());
        assert!(report.waiting_for_inputs);

        let (cmds, report) = n.proc(&input(Some((5.0, 0.0)), None, None, 0.02)).unwrap();
        assert!(cmds.is_empty());
        assert!(report.waiting_for_inputs);

        // Twist and enable flag were latched, velocity completes the set
        let (cmds, report) = n.proc(&input(None, Some(0.0), None, 0.02)).unwrap();
        assert!(!report.waiting_for_inputs);
        assert!(cmds.throttle.unwrap().pedal_cmd > 0.0);
        assert_eq!(cmds.brake.unwrap().pedal_cmd, 0.0);
    }

    #[test]
    fn test_no_publication_while_manual() {
        let mut n = node();

        for _ in 0..10 {
            let (cmds, report) = n.proc(&input(Some((5.0, 0.1)), Some(1.0), None, 0.02)).unwrap();
            assert!(cmds.is_empty());
            assert_eq!(report.ctrl.unwrap().mode, DbwMode::Manual);
            assert_eq!(n.output(), Some(ControlOutput::NEUTRAL));
        }
    }

    #[test]
    fn test_handover_publishes_neutral() {
        let mut n = node();

        for _ in 0..10 {
            n.proc(&input(Some((5.0, 0.1)), Some(1.0), Some(true), 0.02)).unwrap();
        }

        let (cmds, report) = n.proc(&input(None, None, Some(false), 0.02)).unwrap();
        assert_eq!(
            report.ctrl.unwrap().transition,
            Some(ModeTransition::EnteredManual)
        );
        assert_eq!(cmds.throttle.unwrap().pedal_cmd, 0.0);
        assert_eq!(cmds.brake.unwrap().pedal_cmd, 0.0);
        assert_eq!(cmds.steering.unwrap().steering_wheel_angle_cmd, 0.0);

        // Then silence
        let (cmds, _) = n.proc(&input(None, None, None, 0.02)).unwrap();
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_fallback_on_invalid_input() {
        let mut n = node();

        let (good, _) = n.proc(&input(Some((5.0, 0.05)), Some(2.0), Some(true), 0.02)).unwrap();
        let good_output = n.output().unwrap();
        assert_eq!(n.last_safe_output(), good_output);

        // NaN velocity report
        let (cmds, report) = n.proc(&input(None, Some(std::f64::NAN), None, 0.02)).unwrap();
        assert!(report.fallback_used);
        assert_eq!(n.output(), Some(good_output));
        assert_eq!(cmds.throttle, good.throttle);
        assert_eq!(cmds.steering, good.steering);

        // Zero time step
        let (_, report) = n.proc(&input(None, Some(2.0), None, 0.0)).unwrap();
        assert!(report.fallback_used);
        assert_eq!(n.output(), Some(good_output));

        // And recovery
        let (_, report) = n.proc(&input(None, Some(2.0), None, 0.02)).unwrap();
        assert!(!report.fallback_used);
        assert!(n.output().unwrap().is_finite());
    }

    #[test]
    fn test_fallback_keeps_transition() {
        let mut n = node();

        // Enabled on the same tick as a bad velocity report
        let (cmds, report) = n.proc(
            &input(Some((5.0, 0.0)), Some(std::f64::NAN), Some(true), 0.02)
        ).unwrap();
        assert!(report.fallback_used);

        let ctrl = report.ctrl.unwrap();
        assert_eq!(ctrl.mode, DbwMode::Autonomous);
        assert_eq!(ctrl.transition, Some(ModeTransition::EnteredAutonomous));
        assert_eq!(n.output(), Some(ControlOutput::NEUTRAL));
        assert_eq!(cmds.throttle.unwrap().pedal_cmd, 0.0);
    }

    #[test]
    fn test_make_safe() {
        let mut n = node();
        n.proc(&input(Some((5.0, 0.0)), Some(1.0), Some(true), 0.02)).unwrap();

        n.make_safe();

        let (cmds, report) = n.proc(&input(None, None, None, 0.02)).unwrap();
        assert_eq!(
            report.ctrl.unwrap().transition,
            Some(ModeTransition::EnteredManual)
        );
        assert_eq!(cmds.throttle.unwrap().pedal_cmd, 0.0);
        assert_eq!(n.controller().unwrap().vel_pid().integral(), 0.0);
    }

    #[test]
    fn test_archive_without_session() {
        let mut n = node();
        n.proc(&input(Some((5.0, 0.0)), Some(1.0), Some(true), 0.02)).unwrap();
        assert!(n.write().is_ok());
    }
}
