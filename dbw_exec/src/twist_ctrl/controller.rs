//! # Twist controller
//!
//! Combines the velocity filter, velocity PID and yaw controller into
//! throttle, brake and steering demands once per control tick.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;
use util::maths::{all_finite, clamp, lin_map};

// Internal
use super::{
    DbwMode, LowPassFilter, ModeTransition, Params, PidController, TwistCtrlError,
    YawController,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The twist controller.
///
/// A controller owns all of its filter and integrator state, so each control
/// channel must have its own instance.
#[derive(Debug, Clone)]
pub struct Controller {
    params: Params,

    /// Vehicle mass including a full tank of fuel
    total_mass_kg: f64,

    vel_lpf: LowPassFilter,
    vel_pid: PidController,
    yaw_ctrl: YawController,

    mode: DbwMode,

    /// Mode transition observed on the last tick, if any
    last_transition: Option<ModeTransition>,
}

/// Actuator demands produced by one control tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ControlOutput {
    /// Throttle pedal demand as a fraction of full travel, in `[0, 1]`.
    pub throttle: f64,

    /// Brake torque demand.
    ///
    /// Units: Newton-meters
    pub brake_nm: f64,

    /// Steering wheel angle demand.
    ///
    /// Units: radians
    pub steer_rad: f64,
}

/// Status report for one control tick.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Mode during this tick
    pub mode: DbwMode,

    /// Mode transition observed at the start of this tick, if any
    pub transition: Option<ModeTransition>,

    /// Filtered current velocity, units: meters/second
    pub filtered_velocity_ms: f64,

    /// Velocity tracking error, units: meters/second
    pub velocity_error_ms: f64,

    /// Acceleration demand from the velocity PID, units: meters/second^2
    pub accel_dem_mss: f64,

    /// The velocity PID output was clamped
    pub accel_dem_limited: bool,

    /// The target yaw rate was reduced by the lateral acceleration limit
    pub yaw_rate_limited: bool,

    /// The steering angle was clamped
    pub steer_limited: bool,

    /// The brake torque was clamped to its maximum
    pub brake_limited: bool,

    /// A deceleration was requested but was within the brake deadband
    pub in_brake_deadband: bool,

    /// The standstill hold torque was applied
    pub standstill_hold: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlOutput {
    /// The output commanded whenever the controller is not in charge: no
    /// throttle, no brake, wheel centred.
    pub const NEUTRAL: ControlOutput = ControlOutput {
        throttle: 0.0,
        brake_nm: 0.0,
        steer_rad: 0.0,
    };

    /// Returns true if every demand is a finite number.
    pub fn is_finite(&self) -> bool {
        all_finite(&[self.throttle, self.brake_nm, self.steer_rad])
    }
}

impl Controller {

    /// Create a new controller from the given parameters.
    ///
    /// The parameters are validated and are fixed for the lifetime of the
    /// controller. The controller starts in manual mode.
    pub fn new(params: Params) -> Result<Self, TwistCtrlError> {
        params.validate()?;

        let vel_lpf = LowPassFilter::new(
            params.ctrl.lpf_time_constant_s,
            params.ctrl.lpf_sample_period_s
        );
        let vel_pid = PidController::new(
            params.ctrl.vel_k_p,
            params.ctrl.vel_k_i,
            params.ctrl.vel_k_d,
            params.vehicle.decel_limit_mss,
            params.vehicle.accel_limit_mss
        );
        let yaw_ctrl = YawController::new(&params.vehicle);

        Ok(Self {
            total_mass_kg: params.vehicle.total_mass_kg(),
            params,
            vel_lpf,
            vel_pid,
            yaw_ctrl,
            mode: DbwMode::default(),
            last_transition: None,
        })
    }

    /// Perform one control tick.
    ///
    /// # Inputs
    /// - `target_linear_ms`: target linear velocity, positive forwards.
    /// - `target_angular_rads`: target yaw rate, positive to the left.
    /// - `current_linear_ms`: measured linear velocity.
    /// - `dbw_enabled`: true when the vehicle is under autonomous control.
    /// - `dt_s`: time since the previous tick.
    ///
    /// # Outputs
    /// - While `dbw_enabled` is false the velocity integrator is held reset
    ///   and the neutral output is returned, whatever the other inputs.
    /// - Otherwise the actuator demands and a report of the limits applied.
    /// - `InvalidInput` if any velocity is non-finite or `dt_s` is not a
    ///   positive finite number. No filter or integrator state is changed in
    ///   that case and the caller shall fall back to the last good output.
    pub fn control(
        &mut self,
        target_linear_ms: f64,
        target_angular_rads: f64,
        current_linear_ms: f64,
        dbw_enabled: bool,
        dt_s: f64
    ) -> Result<(ControlOutput, StatusReport), TwistCtrlError> {

        // ---- MODE ----

        // Both transitions hand over from a clean integrator. While manual the
        // integrator is held at zero.
        let transition = self.mode.update(dbw_enabled);
        self.last_transition = transition;
        if transition.is_some() || !self.mode.is_autonomous() {
            self.vel_pid.reset();
        }

        let mut report = StatusReport {
            mode: self.mode,
            transition,
            filtered_velocity_ms: self.vel_lpf.get().unwrap_or(0.0),
            ..Default::default()
        };

        if !self.mode.is_autonomous() {
            return Ok((ControlOutput::NEUTRAL, report));
        }

        // ---- INPUT CHECKS ----

        if !all_finite(&[target_linear_ms, target_angular_rads, current_linear_ms]) {
            return Err(TwistCtrlError::InvalidInput(format!(
                "Velocities must be finite, found target ({}, {}) and current {}",
                target_linear_ms, target_angular_rads, current_linear_ms
            )));
        }
        if !(dt_s.is_finite() && dt_s > 0.0) {
            return Err(TwistCtrlError::InvalidInput(format!(
                "Time step must be positive, found {}", dt_s
            )));
        }

        // ---- LONGITUDINAL ----

        // The filter only takes the new sample once the PID has accepted the
        // resulting error.
        let filtered_ms = self.vel_lpf.peek(current_linear_ms);
        let vel_error_ms = target_linear_ms - filtered_ms;
        let accel_dem_mss = self.vel_pid.step(vel_error_ms, dt_s)?;
        self.vel_lpf.filter(current_linear_ms);

        report.filtered_velocity_ms = filtered_ms;
        report.velocity_error_ms = vel_error_ms;
        report.accel_dem_mss = accel_dem_mss;
        report.accel_dem_limited = self.vel_pid.is_saturated();

        let (throttle, brake_nm) = self.split_accel_dem(
            accel_dem_mss,
            target_linear_ms,
            filtered_ms,
            &mut report
        );

        // ---- LATERAL ----

        let steer = self.yaw_ctrl.calc_steering(
            target_linear_ms,
            target_angular_rads,
            filtered_ms
        );
        report.yaw_rate_limited = steer.yaw_rate_limited;
        report.steer_limited = steer.angle_limited;

        let output = ControlOutput {
            throttle,
            brake_nm,
            steer_rad: steer.angle_rad,
        };

        trace!(
            "TwistCtrl: v_f = {:.3}, err = {:.3}, a = {:.3}, out = {:?}",
            filtered_ms, vel_error_ms, accel_dem_mss, output
        );

        Ok((output, report))
    }

    /// Split an acceleration demand into mutually exclusive throttle and
    /// brake demands.
    fn split_accel_dem(
        &self,
        accel_dem_mss: f64,
        target_linear_ms: f64,
        filtered_ms: f64,
        report: &mut StatusReport
    ) -> (f64, f64) {
        let vehicle = &self.params.vehicle;
        let ctrl = &self.params.ctrl;

        let (mut throttle, mut brake_nm) = if accel_dem_mss > 0.0 {
            // Throttle is the fraction of the maximum acceleration
            let (accel_mss, _) = clamp(&accel_dem_mss, &0.0, &vehicle.accel_limit_mss);
            let throttle = lin_map((0.0, vehicle.accel_limit_mss), (0.0, 1.0), accel_mss);

            (throttle, 0.0)
        }
        else {
            let (decel_mss, _) = clamp(&accel_dem_mss, &vehicle.decel_limit_mss, &0.0);

            if decel_mss.abs() > vehicle.brake_deadband_mss {
                // Torque required at the wheels to achieve the deceleration
                (0.0, decel_mss.abs() * self.total_mass_kg * vehicle.wheel_radius_m)
            }
            else {
                report.in_brake_deadband = decel_mss != 0.0;
                (0.0, 0.0)
            }
        };

        // Hold the vehicle once it has stopped
        if target_linear_ms == 0.0
            && filtered_ms.abs() < ctrl.standstill_speed_ms
            && ctrl.standstill_hold_torque_nm > 0.0
        {
            throttle = 0.0;
            brake_nm = brake_nm.max(ctrl.standstill_hold_torque_nm);
            report.standstill_hold = true;
        }

        let (brake_nm, brake_limited) = clamp(&brake_nm, &0.0, &ctrl.max_brake_torque_nm);
        report.brake_limited = brake_limited;

        (throttle, brake_nm)
    }

    /// The current DBW mode.
    pub fn mode(&self) -> DbwMode {
        self.mode
    }

    /// The mode transition observed on the last tick, including a tick whose
    /// inputs were rejected.
    pub fn last_transition(&self) -> Option<ModeTransition> {
        self.last_transition
    }

    /// The parameters of this controller.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The velocity PID controller.
    pub fn vel_pid(&self) -> &PidController {
        &self.vel_pid
    }

    /// The velocity filter.
    pub fn vel_lpf(&self) -> &LowPassFilter {
        &self.vel_lpf
    }

    /// Explicitly reset the velocity integrator.
    pub fn reset(&mut self) {
        self.vel_pid.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn controller() -> Controller {
        Controller::new(Params::default()).unwrap()
    }

    #[test]
    fn test_accelerate_from_rest() {
        let mut c = controller();
        let (out, report) = c.control(5.0, 0.0, 0.0, true, 0.5).unwrap();

        assert!(out.throttle > 0.0);
        assert!(out.throttle <= 1.0);
        assert_eq!(out.brake_nm, 0.0);
        assert!(out.steer_rad.abs() < 1e-9);
        assert_eq!(report.transition, Some(ModeTransition::EnteredAutonomous));
        assert_eq!(report.mode, DbwMode::Autonomous);
    }

    #[test]
    fn test_decelerate_to_stop() {
        let mut c = controller();
        let (out, report) = c.control(0.0, 0.0, 5.0, true, 0.5).unwrap();

        assert_eq!(out.throttle, 0.0);
        assert!(out.brake_nm > 0.0);
        assert!(out.brake_nm <= c.params().ctrl.max_brake_torque_nm);
        assert!(!report.standstill_hold);

        // Brake torque follows from the demanded deceleration
        let p = Params::default();
        let expected = report.accel_dem_mss.abs()
            * p.vehicle.total_mass_kg()
            * p.vehicle.wheel_radius_m;
        assert!((out.brake_nm - expected).abs() < 1e-6);
    }

    #[test]
    fn test_brake_deadband() {
        let mut c = controller();

        // A tiny overspeed gives a deceleration demand within the deadband
        let (out, report) = c.control(5.0, 0.0, 5.05, true, 0.02).unwrap();
        assert!(report.accel_dem_mss < 0.0);
        assert!(report.accel_dem_mss.abs() <= c.params().vehicle.brake_deadband_mss);
        assert_eq!(out.throttle, 0.0);
        assert_eq!(out.brake_nm, 0.0);
        assert!(report.in_brake_deadband);
    }

    #[test]
    fn test_standstill_hold() {
        let mut c = controller();
        let (out, report) = c.control(0.0, 0.0, 0.0, true, 0.02).unwrap();
        assert_eq!(out.throttle, 0.0);
        assert_eq!(out.brake_nm, c.params().ctrl.standstill_hold_torque_nm);
        assert!(report.standstill_hold);
    }

    #[test]
    fn test_throttle_brake_exclusive() {
        let mut c = controller();
        let mut t = 0.0f64;

        for i in 0..2000 {
            t += 0.02;
            let target = 10.0 * (t * 0.3).sin().abs();
            let current = 10.0 * (t * 0.3 + 0.4).sin().abs() + 0.2 * (t * 7.0).sin();
            let yaw = 0.5 * (t * 0.1).cos();
            let enabled = (i / 300) % 4 != 3;

            let (out, _) = c.control(target, yaw, current, enabled, 0.02).unwrap();
            assert!(out.is_finite());
            assert!(
                out.throttle == 0.0 || out.brake_nm == 0.0,
                "throttle {} and brake {} both non-zero", out.throttle, out.brake_nm
            );
            assert!(out.throttle >= 0.0 && out.throttle <= 1.0);
            assert!(out.brake_nm >= 0.0);
            assert!(out.steer_rad.abs() <= c.params().vehicle.max_steer_angle_rad);
        }
    }

    #[test]
    fn test_manual_mode_neutral() {
        let mut c = controller();

        // Build up some integral while autonomous
        for _ in 0..20 {
            c.control(3.0, 0.1, 2.0, true, 0.1).unwrap();
        }
        assert!(c.vel_pid().integral() != 0.0);

        // Disabled, the output is neutral whatever the inputs
        for &(tl, ta, cl) in &[(5.0, 0.3, 0.0), (0.0, -0.3, 10.0), (std::f64::NAN, 0.0, 1.0)] {
            let (out, report) = c.control(tl, ta, cl, false, 0.1).unwrap();
            assert_eq!(out, ControlOutput::NEUTRAL);
            assert_eq!(report.mode, DbwMode::Manual);
            assert_eq!(c.vel_pid().integral(), 0.0);
        }
    }

    #[test]
    fn test_reenable_starts_from_clean_integrator() {
        let mut c = controller();
        for _ in 0..20 {
            c.control(3.0, 0.0, 2.0, true, 0.1).unwrap();
        }

        let (_, report) = c.control(3.0, 0.0, 2.0, false, 0.1).unwrap();
        assert_eq!(report.transition, Some(ModeTransition::EnteredManual));
        assert_eq!(c.vel_pid().integral(), 0.0);

        // The first enabled tick behaves like a fresh integrator given the
        // same filtered velocity.
        let filtered_before = c.vel_lpf().get().unwrap();
        let (_, report) = c.control(3.0, 0.0, 2.0, true, 0.1).unwrap();
        assert_eq!(report.transition, Some(ModeTransition::EnteredAutonomous));

        let mut lpf = c.vel_lpf().clone();
        lpf.reset();
        lpf.filter(filtered_before);
        let expected_v = lpf.filter(2.0);

        let p = Params::default();
        let mut fresh = PidController::new(
            p.ctrl.vel_k_p, p.ctrl.vel_k_i, p.ctrl.vel_k_d,
            p.vehicle.decel_limit_mss, p.vehicle.accel_limit_mss
        );
        let expected = fresh.step(3.0 - expected_v, 0.1).unwrap();

        assert!((report.accel_dem_mss - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut c = controller();
        c.control(5.0, 0.0, 1.0, true, 0.1).unwrap();
        let lpf_before = c.vel_lpf().get();
        let integral_before = c.vel_pid().integral();

        let bad = [
            (std::f64::NAN, 0.0, 1.0, 0.1),
            (5.0, std::f64::INFINITY, 1.0, 0.1),
            (5.0, 0.0, std::f64::NAN, 0.1),
            (5.0, 0.0, 1.0, 0.0),
            (5.0, 0.0, 1.0, -0.5),
            (5.0, 0.0, 1.0, std::f64::NAN),
        ];

        for &(tl, ta, cl, dt) in bad.iter() {
            assert!(matches!(
                c.control(tl, ta, cl, true, dt),
                Err(TwistCtrlError::InvalidInput(_))
            ));
            assert_eq!(c.vel_lpf().get(), lpf_before);
            assert_eq!(c.vel_pid().integral(), integral_before);
        }
    }

    #[test]
    fn test_overflowing_error_leaves_filter() {
        let mut c = controller();
        c.control(5.0, 0.0, 1.0, true, 0.1).unwrap();
        let lpf_before = c.vel_lpf().get();
        let integral_before = c.vel_pid().integral();

        // Finite inputs whose velocity error overflows
        assert!(matches!(
            c.control(1.7e308, 0.0, -1.7e308, true, 0.1),
            Err(TwistCtrlError::InvalidInput(_))
        ));
        assert_eq!(c.vel_lpf().get(), lpf_before);
        assert_eq!(c.vel_pid().integral(), integral_before);

        // The next good tick carries on from the old filter state
        let (_, report) = c.control(5.0, 0.0, 1.0, true, 0.1).unwrap();
        assert_eq!(report.filtered_velocity_ms, 1.0);
    }

    #[test]
    fn test_tiny_time_step_stays_finite() {
        let mut c = controller();
        c.control(5.0, 0.0, 3.0, true, 0.1).unwrap();

        let (output, report) = c.control(5.0, 0.0, 3.0, true, 1e-310).unwrap();
        assert!(output.is_finite());
        assert!(report.accel_dem_mss.is_finite());
        assert!(!report.in_brake_deadband);
        assert!(output.throttle > 0.0);
        assert_eq!(output.brake_nm, 0.0);
    }

    #[test]
    fn test_last_transition() {
        let mut c = controller();
        assert_eq!(c.last_transition(), None);

        // Reported even when the inputs are rejected on the same tick
        assert!(c.control(std::f64::NAN, 0.0, 1.0, true, 0.1).is_err());
        assert_eq!(c.last_transition(), Some(ModeTransition::EnteredAutonomous));

        c.control(5.0, 0.0, 1.0, true, 0.1).unwrap();
        assert_eq!(c.last_transition(), None);
    }

    #[test]
    fn test_steering_follows_yaw() {
        let mut c = controller();

        // Start the filter at the cruising speed
        c.control(10.0, 0.0, 10.0, true, 0.02).unwrap();

        let mut prev = 0.0;
        let mut flat = None;
        for i in 1..=60 {
            let w = i as f64 * 0.01;
            let (out, report) = c.control(10.0, w, 10.0, true, 0.02).unwrap();
            if report.yaw_rate_limited {
                let f = *flat.get_or_insert(out.steer_rad);
                assert!((out.steer_rad - f).abs() < 1e-12);
            }
            else {
                assert!(out.steer_rad > prev);
            }
            prev = out.steer_rad;
        }
        assert!(flat.is_some());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut p = Params::default();
        p.vehicle.accel_limit_mss = 0.0;
        assert!(matches!(Controller::new(p), Err(TwistCtrlError::InvalidParams(_))));
    }
}
