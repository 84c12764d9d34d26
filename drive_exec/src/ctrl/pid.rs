//! PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Controller, PidParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    params: PidParams,

    /// Previous error
    prev_error: Option<f64>,

    /// Previous measured state, only used by the state/reference form
    prev_state: Option<f64>,

    /// The integral accumulation
    integral: f64,

    output: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(params: PidParams) -> Self {
        Self {
            params,
            prev_error: None,
            prev_state: None,
            integral: 0f64,
            output: 0f64,
        }
    }

    pub fn params(&self) -> &PidParams {
        &self.params
    }

    /// Accumulate the error into the integral.
    ///
    /// The integral is dropped when the error is too large to be trusted and
    /// whenever the error crosses zero, so it cannot wind up through an
    /// overshoot.
    fn accumulate(&mut self, error: f64) {
        if error.abs() <= self.params.thresh_i {
            self.integral += self.params.k_i * error;
        }
        else {
            self.integral = 0f64;
        }

        if let Some(e) = self.prev_error {
            if e.is_sign_negative() != error.is_sign_negative() {
                self.integral = 0f64;
            }
        }

        self.integral = self.clamp(self.integral);
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.params.min_output).min(self.params.max_output)
    }
}

impl Controller for PidController {
    fn get(&mut self, error: f64) -> f64 {
        self.accumulate(error);

        // No derivative on the first sample, rather than a spike from zero
        let deriv = match self.prev_error {
            Some(e) => error - e,
            None => 0f64,
        };

        let out = self.params.k_p * error
            + self.integral
            + self.params.k_d * deriv
            + self.params.ff;

        self.prev_error = Some(error);
        self.output = self.clamp(out);

        trace!("PID: error = {:.4}, output = {:.4}", error, self.output);

        self.output
    }

    fn get_state_ref(&mut self, state: f64, reference: f64) -> f64 {
        let error = reference - state;

        self.accumulate(error);

        // Derivative on the measurement so a step in the reference doesn't
        // kick the output
        let deriv = match self.prev_state {
            Some(s) => s - state,
            None => 0f64,
        };

        let out = self.params.k_p * error
            + self.integral
            + self.params.k_d * deriv
            + self.params.ff * reference;

        self.prev_error = Some(error);
        self.prev_state = Some(state);
        self.output = self.clamp(out);

        trace!(
            "PID: state = {:.4}, reference = {:.4}, output = {:.4}",
            state, reference, self.output
        );

        self.output
    }

    fn output(&self) -> f64 {
        self.output
    }

    fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
        self.prev_state = None;
        self.output = 0f64;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proportional() {
        let mut pid = PidController::new(PidParams::p(2.0));

        assert_eq!(pid.get(1.5), 3.0);
        assert_eq!(pid.get(-0.5), -1.0);
        assert_eq!(pid.output(), -1.0);
    }

    #[test]
    fn test_integral_reset_on_sign_change() {
        let mut pid = PidController::new(PidParams::pid(0.0, 1.0, 0.0));

        pid.get(1.0);
        pid.get(1.0);
        assert_eq!(pid.get(1.0), 3.0);

        // Crossing zero drops the accumulated integral
        assert_eq!(pid.get(-1.0), 0.0);
        assert_eq!(pid.get(-1.0), -1.0);
    }

    #[test]
    fn test_integral_threshold() {
        let mut params = PidParams::pid(0.0, 1.0, 0.0);
        params.thresh_i = 2.0;
        let mut pid = PidController::new(params);

        assert_eq!(pid.get(1.0), 1.0);
        assert_eq!(pid.get(5.0), 0.0);
        assert_eq!(pid.get(1.0), 1.0);
    }

    #[test]
    fn test_derivative_and_limits() {
        let mut pid = PidController::new(PidParams::pid(0.0, 0.0, 1.0).with_limit(0.5));

        // No kick on the first sample
        assert_eq!(pid.get(3.0), 0.0);
        assert_eq!(pid.get(3.25), 0.25);
        assert_eq!(pid.get(5.0), 0.5);
        assert_eq!(pid.get(0.0), -0.5);
    }

    #[test]
    fn test_state_reference() {
        let mut params = PidParams::pid(1.0, 0.0, 1.0);
        params.ff = 0.5;
        let mut pid = PidController::new(params);

        // P on error plus feedforward on reference
        assert_eq!(pid.get_state_ref(0.0, 2.0), 3.0);

        // Changing the reference doesn't produce a derivative kick
        assert_eq!(pid.get_state_ref(0.0, 4.0), 6.0);

        // Moving the state does
        assert_eq!(pid.get_state_ref(1.0, 4.0), 4.0);

        pid.reset();
        assert_eq!(pid.output(), 0.0);
        assert_eq!(pid.get_state_ref(1.0, 4.0), 5.0);
    }
}
