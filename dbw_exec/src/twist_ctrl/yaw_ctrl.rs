//! # Yaw controller
//!
//! Converts a target yaw rate into a steering wheel angle using the bicycle
//! model of the vehicle.
//!
//! ## Conventions
//!
//! - Yaw rates follow the right hand rule about the vehicle's Z+ (upwards)
//!   axis, so a positive yaw rate is a turn to the left, and produces a
//!   positive steering angle when driving forwards.
//! - The curvature of the turn is computed from the *target* linear velocity,
//!   `k = yaw_rate / v_target`. When reversing the curvature, and therefore
//!   the steering angle, changes sign for the same yaw rate.
//! - Speeds below `min_velocity_ms` in magnitude are replaced by
//!   `min_velocity_ms` (keeping their sign, with zero counted as forwards),
//!   so the computation stays finite at standstill.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{clamp, sign_or_pos};

use super::VehicleParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering geometry of the vehicle. Holds no state between calls.
#[derive(Debug, Clone, Serialize)]
pub struct YawController {
    wheel_base_m: f64,
    steer_ratio: f64,
    min_velocity_ms: f64,
    max_lat_accel_mss: f64,
    max_steer_angle_rad: f64,
}

/// A steering demand along with the limits that were applied to reach it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SteerDemand {
    /// Steering wheel angle.
    ///
    /// Units: radians
    pub angle_rad: f64,

    /// True if the target yaw rate was reduced to respect the lateral
    /// acceleration limit.
    pub yaw_rate_limited: bool,

    /// True if the steering angle was clamped to the maximum angle.
    pub angle_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl YawController {
    /// Create a new yaw controller for the given vehicle.
    pub fn new(params: &VehicleParams) -> Self {
        Self {
            wheel_base_m: params.wheel_base_m,
            steer_ratio: params.steer_ratio,
            min_velocity_ms: params.min_velocity_ms,
            max_lat_accel_mss: params.max_lat_accel_mss,
            max_steer_angle_rad: params.max_steer_angle_rad,
        }
    }

    /// Get the steering wheel angle which achieves the target yaw rate.
    pub fn get_steering(
        &self,
        target_linear_ms: f64,
        target_angular_rads: f64,
        current_linear_ms: f64
    ) -> f64 {
        self.calc_steering(target_linear_ms, target_angular_rads, current_linear_ms)
            .angle_rad
    }

    /// Calculate the steering demand for the target yaw rate, reporting
    /// which limits were applied.
    pub fn calc_steering(
        &self,
        target_linear_ms: f64,
        target_angular_rads: f64,
        current_linear_ms: f64
    ) -> SteerDemand {
        // Limit the yaw rate so that the lateral acceleration at the current
        // speed (a = v * w) stays within the limit.
        let max_yaw_rate_rads = self.max_lat_accel_mss
            / current_linear_ms.abs().max(self.min_velocity_ms);
        let (yaw_rate_rads, yaw_rate_limited) = clamp(
            &target_angular_rads,
            &-max_yaw_rate_rads,
            &max_yaw_rate_rads
        );

        // Curvature of the turn at the target speed
        let speed_ms = sign_or_pos(target_linear_ms)
            * target_linear_ms.abs().max(self.min_velocity_ms);
        let curv_m = yaw_rate_rads / speed_ms;

        // Road wheel angle from the bicycle model, scaled up to the steering
        // wheel.
        let angle_rad = (self.wheel_base_m * curv_m).atan() * self.steer_ratio;

        let (angle_rad, angle_limited) = clamp(
            &angle_rad,
            &-self.max_steer_angle_rad,
            &self.max_steer_angle_rad
        );

        SteerDemand {
            angle_rad,
            yaw_rate_limited,
            angle_limited,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn yaw_ctrl() -> YawController {
        YawController::new(&VehicleParams::default())
    }

    #[test]
    fn test_straight() {
        let y = yaw_ctrl();
        assert_eq!(y.get_steering(10.0, 0.0, 10.0), 0.0);
        assert_eq!(y.get_steering(0.0, 0.0, 0.0), 0.0);
        assert_eq!(y.get_steering(-3.0, 0.0, -3.0), 0.0);
    }

    #[test]
    fn test_bicycle_model() {
        let y = yaw_ctrl();
        let p = VehicleParams::default();

        // 0.2 rad/s at 10 m/s is within the lateral limit of 3 m/s^2
        let d = y.calc_steering(10.0, 0.2, 10.0);
        let expected = (p.wheel_base_m * 0.2 / 10.0).atan() * p.steer_ratio;
        assert!((d.angle_rad - expected).abs() < 1e-12);
        assert!(!d.yaw_rate_limited);
        assert!(!d.angle_limited);

        // Left turns are positive, right turns negative
        assert!(y.get_steering(10.0, 0.2, 10.0) > 0.0);
        assert!(y.get_steering(10.0, -0.2, 10.0) < 0.0);
        assert_eq!(
            y.get_steering(10.0, 0.2, 10.0),
            -y.get_steering(10.0, -0.2, 10.0)
        );

        // Reversing flips the curvature
        assert!(y.get_steering(-5.0, 0.2, -5.0) < 0.0);
    }

    #[test]
    fn test_pure() {
        let y = yaw_ctrl();
        let a = y.calc_steering(7.3, 0.11, 6.9);
        for _ in 0..10 {
            assert_eq!(y.calc_steering(7.3, 0.11, 6.9), a);
        }
    }

    #[test]
    fn test_bounded() {
        let y = yaw_ctrl();
        let max = VehicleParams::default().max_steer_angle_rad;

        for &v in &[-20.0, -1.0, -0.01, 0.0, 0.01, 0.5, 2.0, 30.0] {
            for &w in &[-10.0, -1.0, -0.1, 0.0, 0.1, 1.0, 10.0] {
                for &c in &[0.0, 0.05, 1.0, 25.0] {
                    let s = y.get_steering(v, w, c);
                    assert!(s.is_finite());
                    assert!(s >= -max && s <= max, "steer {} out of bounds", s);
                }
            }
        }
    }

    #[test]
    fn test_low_speed_limits() {
        let y = yaw_ctrl();

        // At standstill the speed floor keeps the angle finite, and the large
        // curvature saturates the steering.
        let d = y.calc_steering(0.0, 0.5, 0.0);
        assert!(d.angle_rad.is_finite());
        assert!(d.angle_limited);
        assert_eq!(d.angle_rad, VehicleParams::default().max_steer_angle_rad);
    }

    #[test]
    fn test_monotonic_until_clamp() {
        let y = yaw_ctrl();

        // Max yaw rate at 10 m/s is 3.0 / 10.0 = 0.3 rad/s
        let mut prev = 0.0;
        let mut flat = None;
        for i in 1..=100 {
            let w = i as f64 * 0.01;
            let d = y.calc_steering(10.0, w, 10.0);

            if w <= 0.3 - 1e-9 {
                assert!(d.angle_rad > prev, "not increasing at w = {}", w);
                assert!(!d.yaw_rate_limited);
            }
            else if w > 0.3 + 1e-9 {
                assert!(d.yaw_rate_limited);
                let f = *flat.get_or_insert(d.angle_rad);
                assert_eq!(d.angle_rad, f);
                assert!(d.angle_rad >= prev);
            }
            prev = d.angle_rad;
        }
        assert!(flat.is_some());
    }
}
