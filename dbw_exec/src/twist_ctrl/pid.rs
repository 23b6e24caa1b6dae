//! # PID controller
//!
//! A generic PID controller with output clamping and integral anti-windup.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use util::maths::clamp;

// Internal
use super::TwistCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Lower output limit
    min_output: f64,

    /// Upper output limit
    max_output: f64,

    /// Previous error, zero after construction or reset
    prev_error: f64,

    /// The integral accumulation
    integral: f64,

    /// The output of the last successful step
    last_output: f64,

    /// True if the last step's output was clamped
    saturated: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains and output limits.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, min_output: f64, max_output: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            min_output, max_output,
            integral: 0f64,
            prev_error: 0f64,
            last_output: 0f64,
            saturated: false,
        }
    }

    /// Step the controller with the given error and time since the last step.
    ///
    /// The output is clamped to the controller's limits. If clamping was
    /// needed the integral accumulated on this step is discarded, so that the
    /// integral cannot wind up while the output is saturated.
    ///
    /// A non-positive or non-finite `dt_s`, a non-finite error, or a step
    /// whose terms overflow, is rejected with `InvalidInput` and leaves the
    /// controller untouched. The previous output remains available from
    /// `last_output`.
    pub fn step(&mut self, error: f64, dt_s: f64) -> Result<f64, TwistCtrlError> {
        if !(dt_s.is_finite() && dt_s > 0.0) {
            return Err(TwistCtrlError::InvalidInput(format!(
                "PID time step must be positive, found {}", dt_s
            )));
        }
        if !error.is_finite() {
            return Err(TwistCtrlError::InvalidInput(format!(
                "PID error must be finite, found {}", error
            )));
        }

        // Accumulate the integral term, leaving the stored value alone until
        // the step is known to be good.
        let integral = self.integral + error * dt_s;

        // Calculate the derivative, skipped when unused as `0 * inf` is NaN.
        let deriv_term = if self.k_d == 0f64 {
            0f64
        }
        else {
            self.k_d * (error - self.prev_error) / dt_s
        };

        // Calculate the output
        let raw =
            self.k_p * error
            + self.k_i * integral
            + deriv_term;

        if !raw.is_finite() {
            return Err(TwistCtrlError::InvalidInput(format!(
                "PID output overflowed for error {} over {} s", error, dt_s
            )));
        }

        let (out, saturated) = clamp(&raw, &self.min_output, &self.max_output);

        // Anti-windup, the integral only grows while the output is unclamped
        if !saturated {
            self.integral = integral;
        }

        // Remember the previous error and output
        self.prev_error = error;
        self.last_output = out;
        self.saturated = saturated;

        Ok(out)
    }

    /// Clear the integral and derivative history of the controller.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = 0f64;
        self.last_output = 0f64;
        self.saturated = false;
    }

    /// The current integral accumulation.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// The output of the last successful step, or zero after a reset.
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    /// True if the last step's output was clamped to the limits.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }
}
