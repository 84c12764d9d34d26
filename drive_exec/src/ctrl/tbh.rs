//! Take-back-half controller
//!
//! An integrating controller which, each time the error changes sign, sets its output to halfway
//! between the current output and the output at the previous crossing. This gives a hysteresis
//! around the reference that settles without tuning a derivative term, and suits velocity control
//! of high inertia loads.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Controller, TbhParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Clone)]
pub struct TbhController {
    params: TbhParams,

    output: f64,

    /// Output at the last zero crossing of the error
    output_at_crossing: f64,

    prev_error: f64,

    prev_reference: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TbhController {
    pub fn new(params: TbhParams) -> Self {
        Self {
            params,
            output: 0f64,
            output_at_crossing: 0f64,
            prev_error: 0f64,
            prev_reference: None,
        }
    }

    /// Reseed the controller for a new reference, starting from the feedforward estimate.
    fn reseed(&mut self, reference: f64, error: f64) {
        self.prev_reference = Some(reference);
        self.prev_error = error;
        self.output = self.params.ff * reference;
        self.output_at_crossing = self.output;
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.params.min_output).min(self.params.max_output)
    }
}

impl Controller for TbhController {
    fn get(&mut self, error: f64) -> f64 {
        self.output = self.clamp(self.output + error * self.params.k_tbh);

        if error.is_sign_negative() != self.prev_error.is_sign_negative() {
            self.output = 0.5 * (self.output + self.output_at_crossing);
            self.output_at_crossing = self.output;
            self.prev_error = error;
        }

        self.output = self.clamp(self.output);

        trace!("TBH: error = {:.4}, output = {:.4}", error, self.output);

        self.output
    }

    fn get_state_ref(&mut self, state: f64, reference: f64) -> f64 {
        let error = reference - state;

        if self.prev_reference != Some(reference) {
            self.reseed(reference, error);
        }

        self.get(error)
    }

    fn output(&self) -> f64 {
        self.output
    }

    fn reset(&mut self) {
        self.output = 0f64;
        self.output_at_crossing = 0f64;
        self.prev_error = 0f64;
        self.prev_reference = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> TbhParams {
        TbhParams {
            k_tbh: 0.1,
            ff: 0.0,
            min_output: -1.0,
            max_output: 1.0,
        }
    }

    #[test]
    fn test_take_back_half() {
        let mut tbh = TbhController::new(params());

        // Integrates while the error keeps its sign
        assert!((tbh.get(2.0) - 0.2).abs() < 1e-12);
        assert!((tbh.get(2.0) - 0.4).abs() < 1e-12);

        // On crossing, the output is halved back towards the last crossing
        // output (zero here)
        let out = tbh.get(-1.0);
        assert!((out - 0.15).abs() < 1e-12);

        // Limits are respected
        for _ in 0..100 {
            tbh.get(-10.0);
        }
        assert_eq!(tbh.output(), -1.0);
    }

    #[test]
    fn test_converges_on_first_order_plant() {
        let mut p = params();
        p.ff = 0.05;
        let mut tbh = TbhController::new(p);

        // Plant: velocity relaxes towards 20 * output
        let mut vel = 0f64;
        for _ in 0..2000 {
            let out = tbh.get_state_ref(vel, 10.0);
            vel += 0.05 * (20.0 * out - vel);
        }

        assert!((vel - 10.0).abs() < 0.5, "vel = {}", vel);
    }
}
