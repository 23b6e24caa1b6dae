//! Parameters structures for twist control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::TwistCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for twist control.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Params {
    /// Physical properties and capabilities of the vehicle.
    pub vehicle: VehicleParams,

    /// Controller tuning.
    pub ctrl: CtrlParams,
}

/// Physical properties and capabilities of the vehicle.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VehicleParams {

    // ---- GEOMETRY ----

    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheel_base_m: f64,

    /// Ratio between the steering wheel angle and the road wheel angle.
    pub steer_ratio: f64,

    /// The radius of the vehicle's wheels.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    // ---- MASS ----

    /// Unladen mass of the vehicle.
    ///
    /// Units: kilograms
    pub vehicle_mass_kg: f64,

    /// Capacity of the fuel tank, assumed full when computing brake torque.
    ///
    /// Units: litres
    pub fuel_capacity_l: f64,

    // ---- CAPABILITIES ----

    /// Speed floor used in yaw rate and curvature calculations, so that they
    /// remain finite at standstill.
    ///
    /// Units: meters/second
    pub min_velocity_ms: f64,

    /// Maximum lateral acceleration allowed when turning.
    ///
    /// Units: meters/second^2
    pub max_lat_accel_mss: f64,

    /// Maximum steering wheel angle either side of centre.
    ///
    /// Units: radians
    pub max_steer_angle_rad: f64,

    /// Maximum deceleration that may be demanded (negative).
    ///
    /// Units: meters/second^2
    pub decel_limit_mss: f64,

    /// Maximum acceleration that may be demanded (positive).
    ///
    /// Units: meters/second^2
    pub accel_limit_mss: f64,

    /// Decelerations of this magnitude or lower are not braked for.
    ///
    /// Units: meters/second^2
    pub brake_deadband_mss: f64,
}

/// Controller tuning parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CtrlParams {

    // ---- VELOCITY PID ----

    /// Velocity controller proportional gain
    pub vel_k_p: f64,

    /// Velocity controller integral gain
    pub vel_k_i: f64,

    /// Velocity controller derivative gain
    pub vel_k_d: f64,

    // ---- VELOCITY FILTER ----

    /// Time constant of the velocity low pass filter.
    ///
    /// Units: seconds
    pub lpf_time_constant_s: f64,

    /// Sample period of the velocity low pass filter, usually the control
    /// period.
    ///
    /// Units: seconds
    pub lpf_sample_period_s: f64,

    // ---- BRAKE ----

    /// Maximum brake torque that may be demanded.
    ///
    /// Units: Newton-meters
    pub max_brake_torque_nm: f64,

    /// Brake torque held while stopped, so that the vehicle does not creep.
    /// Zero disables the standstill hold.
    ///
    /// Units: Newton-meters
    pub standstill_hold_torque_nm: f64,

    /// Speed under which the vehicle is considered stopped.
    ///
    /// Units: meters/second
    pub standstill_speed_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            wheel_base_m: 2.8498,
            steer_ratio: 14.8,
            wheel_radius_m: 0.2413,
            vehicle_mass_kg: 1736.35,
            fuel_capacity_l: 13.5,
            min_velocity_ms: 0.1,
            max_lat_accel_mss: 3.0,
            max_steer_angle_rad: 8.0,
            decel_limit_mss: -5.0,
            accel_limit_mss: 1.0,
            brake_deadband_mss: 0.1,
        }
    }
}

impl Default for CtrlParams {
    fn default() -> Self {
        Self {
            vel_k_p: 0.8,
            vel_k_i: 0.1,
            vel_k_d: 0.0,
            lpf_time_constant_s: 0.5,
            lpf_sample_period_s: 0.02,
            max_brake_torque_nm: 3250.0,
            standstill_hold_torque_nm: 700.0,
            standstill_speed_ms: 0.1,
        }
    }
}

impl Params {
    /// Check that the parameters describe a physically meaningful vehicle
    /// and a stable controller.
    pub fn validate(&self) -> Result<(), TwistCtrlError> {
        self.vehicle.validate()?;
        self.ctrl.validate()
    }
}

impl VehicleParams {
    /// Check the vehicle parameters.
    pub fn validate(&self) -> Result<(), TwistCtrlError> {
        positive("wheel_base_m", self.wheel_base_m)?;
        positive("steer_ratio", self.steer_ratio)?;
        positive("wheel_radius_m", self.wheel_radius_m)?;
        positive("vehicle_mass_kg", self.vehicle_mass_kg)?;
        non_negative("fuel_capacity_l", self.fuel_capacity_l)?;
        positive("min_velocity_ms", self.min_velocity_ms)?;
        non_negative("max_lat_accel_mss", self.max_lat_accel_mss)?;
        positive("max_steer_angle_rad", self.max_steer_angle_rad)?;
        positive("accel_limit_mss", self.accel_limit_mss)?;
        non_negative("brake_deadband_mss", self.brake_deadband_mss)?;

        if !(self.decel_limit_mss.is_finite() && self.decel_limit_mss < 0.0) {
            return Err(TwistCtrlError::InvalidParams(format!(
                "decel_limit_mss must be negative, found {}",
                self.decel_limit_mss
            )));
        }

        Ok(())
    }

    /// Total mass of the vehicle with a full tank of fuel.
    ///
    /// Units: kilograms
    pub fn total_mass_kg(&self) -> f64 {
        self.vehicle_mass_kg + self.fuel_capacity_l * super::GAS_DENSITY_KGL
    }
}

impl CtrlParams {
    /// Check the controller parameters.
    pub fn validate(&self) -> Result<(), TwistCtrlError> {
        non_negative("vel_k_p", self.vel_k_p)?;
        non_negative("vel_k_i", self.vel_k_i)?;
        non_negative("vel_k_d", self.vel_k_d)?;
        positive("lpf_time_constant_s", self.lpf_time_constant_s)?;
        positive("lpf_sample_period_s", self.lpf_sample_period_s)?;
        positive("max_brake_torque_nm", self.max_brake_torque_nm)?;
        non_negative("standstill_hold_torque_nm", self.standstill_hold_torque_nm)?;
        non_negative("standstill_speed_ms", self.standstill_speed_ms)?;

        if self.standstill_hold_torque_nm > self.max_brake_torque_nm {
            return Err(TwistCtrlError::InvalidParams(format!(
                "standstill_hold_torque_nm ({}) exceeds max_brake_torque_nm ({})",
                self.standstill_hold_torque_nm,
                self.max_brake_torque_nm
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn positive(name: &str, value: f64) -> Result<(), TwistCtrlError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    }
    else {
        Err(TwistCtrlError::InvalidParams(format!(
            "{} must be positive, found {}", name, value
        )))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), TwistCtrlError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    }
    else {
        Err(TwistCtrlError::InvalidParams(format!(
            "{} must be zero or positive, found {}", name, value
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let mut p = Params::default();
        p.vehicle.decel_limit_mss = 1.0;
        assert!(matches!(p.validate(), Err(TwistCtrlError::InvalidParams(_))));

        let mut p = Params::default();
        p.vehicle.min_velocity_ms = 0.0;
        assert!(matches!(p.validate(), Err(TwistCtrlError::InvalidParams(_))));

        let mut p = Params::default();
        p.vehicle.wheel_base_m = std::f64::NAN;
        assert!(matches!(p.validate(), Err(TwistCtrlError::InvalidParams(_))));

        let mut p = Params::default();
        p.ctrl.lpf_sample_period_s = 0.0;
        assert!(matches!(p.validate(), Err(TwistCtrlError::InvalidParams(_))));

        let mut p = Params::default();
        p.ctrl.standstill_hold_torque_nm = p.ctrl.max_brake_torque_nm + 1.0;
        assert!(matches!(p.validate(), Err(TwistCtrlError::InvalidParams(_))));
    }

    #[test]
    fn test_total_mass() {
        let v = VehicleParams::default();
        let expected = 1736.35 + 13.5 * 2.858;
        assert!((v.total_mass_kg() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_params_from_toml() {
        let p: Params = util::params::from_str(r#"
            [vehicle]
            wheel_base_m = 2.8498
            steer_ratio = 14.8
            wheel_radius_m = 0.2413
            vehicle_mass_kg = 1736.35
            fuel_capacity_l = 13.5
            min_velocity_ms = 0.1
            max_lat_accel_mss = 3.0
            max_steer_angle_rad = 8.0
            decel_limit_mss = -5.0
            accel_limit_mss = 1.0
            brake_deadband_mss = 0.1

            [ctrl]
            vel_k_p = 0.8
            vel_k_i = 0.1
            vel_k_d = 0.0
            lpf_time_constant_s = 0.5
            lpf_sample_period_s = 0.02
            max_brake_torque_nm = 3250.0
            standstill_hold_torque_nm = 700.0
            standstill_speed_ms = 0.1
        "#).unwrap();

        assert!(p.validate().is_ok());
        assert_eq!(p.vehicle.steer_ratio, 14.8);
        assert_eq!(p.ctrl.vel_k_p, 0.8);
    }
}
