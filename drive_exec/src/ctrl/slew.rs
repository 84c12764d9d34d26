//! Slew rate limiter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits how quickly a value may change between successive calls.
#[derive(Debug, Serialize, Clone)]
pub struct SlewRate {
    /// Largest decrease per call
    dec_rate: f64,

    /// Largest increase per call
    inc_rate: f64,

    output: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SlewRate {
    /// Create a limiter with separate decrease and increase rates, starting
    /// from `initial`.
    pub fn new(dec_rate: f64, inc_rate: f64, initial: f64) -> Self {
        Self {
            dec_rate: dec_rate.abs(),
            inc_rate: inc_rate.abs(),
            output: initial,
        }
    }

    /// Create a limiter which treats increases and decreases the same.
    pub fn symmetric(rate: f64, initial: f64) -> Self {
        Self::new(rate, rate, initial)
    }

    /// Move the output towards `desired` by at most one step.
    pub fn slew(&mut self, desired: f64) -> f64 {
        self.output = if desired > self.output {
            (self.output + self.inc_rate).min(desired)
        }
        else {
            (self.output - self.dec_rate).max(desired)
        };

        trace!("Slew: desired = {:.4}, output = {:.4}", desired, self.output);

        self.output
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    /// Jump straight to the given value.
    pub fn reset(&mut self, value: f64) {
        self.output = value;
    }
}
