//! # Acceptance checking
//!
//! Decides when a controlled quantity is "close enough, for long enough". An error is accepted
//! once both it and its rate of change have stayed within bounds for the minimum dwell time. A
//! timeout, if one is set, always ends the check regardless of the error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of an acceptance check.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct AcceptParams {
    /// Time after the first check at which the check ends regardless of the error. Zero disables
    /// the timeout.
    #[serde(default)]
    pub timeout_s: f64,

    /// Largest absolute error that can be accepted
    pub max_error: f64,

    /// Largest absolute rate of change of the error that can be accepted
    #[serde(default = "unbounded")]
    pub max_error_deriv: f64,

    /// Time the error must continuously stay within bounds for
    #[serde(default)]
    pub min_dwell_s: f64,
}

/// Tracks an error over time against a set of [`AcceptParams`].
#[derive(Debug, Clone)]
pub struct AcceptanceChecker {
    params: AcceptParams,

    prev_error: Option<f64>,
    prev_time_s: Option<f64>,

    /// Time at which the error last came within bounds
    dwell_start_s: Option<f64>,

    /// Time of the first check since the last reset
    timeout_start_s: Option<f64>,

    last: Acceptance,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of an acceptance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Acceptance {
    /// Not yet acceptable
    Pending,

    /// Error within bounds for the dwell time
    Converged,

    /// Timeout elapsed before convergence
    TimedOut,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AcceptParams {
    /// Accept as soon as the error is within `max_error`, never timing out.
    pub fn new(max_error: f64) -> Self {
        Self {
            timeout_s: 0.0,
            max_error,
            max_error_deriv: unbounded(),
            min_dwell_s: 0.0,
        }
    }

    pub fn with_timeout(mut self, timeout_s: f64) -> Self {
        self.timeout_s = timeout_s;
        self
    }

    pub fn with_max_deriv(mut self, max_error_deriv: f64) -> Self {
        self.max_error_deriv = max_error_deriv;
        self
    }

    pub fn with_dwell(mut self, min_dwell_s: f64) -> Self {
        self.min_dwell_s = min_dwell_s;
        self
    }
}

impl Acceptance {
    /// True for either terminal state.
    pub fn is_done(&self) -> bool {
        !matches!(self, Acceptance::Pending)
    }
}

impl AcceptanceChecker {
    pub fn new(params: AcceptParams) -> Self {
        Self {
            params,
            prev_error: None,
            prev_time_s: None,
            dwell_start_s: None,
            timeout_start_s: None,
            last: Acceptance::Pending,
        }
    }

    pub fn params(&self) -> &AcceptParams {
        &self.params
    }

    /// Change the timeout, taking effect from the next reset.
    pub fn set_timeout(&mut self, timeout_s: f64) {
        self.params.timeout_s = timeout_s.max(0.0);
    }

    /// Forget all history, the next check starts the timeout again.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.prev_time_s = None;
        self.dwell_start_s = None;
        self.timeout_start_s = None;
        self.last = Acceptance::Pending;
    }

    /// Check a reference against a measured state.
    pub fn check_state(&mut self, state: f64, reference: f64, now_s: f64) -> Acceptance {
        self.check(reference - state, now_s)
    }

    /// Check the given error, measured at time `now_s`.
    pub fn check(&mut self, error: f64, now_s: f64) -> Acceptance {
        let timeout_start_s = *self.timeout_start_s.get_or_insert(now_s);

        // The first sample has nothing to differentiate against so it is treated as steady
        let deriv = match (self.prev_error, self.prev_time_s) {
            (Some(e), Some(t)) if now_s > t => (error - e) / (now_s - t),
            _ => 0.0,
        };

        let in_bounds = error.abs() <= self.params.max_error
            && deriv.abs() <= self.params.max_error_deriv;

        let dwelled = if in_bounds {
            let dwell_start_s = *self.dwell_start_s.get_or_insert(now_s);
            now_s - dwell_start_s >= self.params.min_dwell_s
        }
        else {
            self.dwell_start_s = None;
            false
        };

        let timed_out = self.params.timeout_s > 0.0
            && now_s - timeout_start_s >= self.params.timeout_s;

        self.last = if timed_out {
            Acceptance::TimedOut
        }
        else if dwelled {
            Acceptance::Converged
        }
        else {
            Acceptance::Pending
        };

        trace!(
            "Acceptance: error = {:.4}, deriv = {:.4}, result = {:?}",
            error, deriv, self.last
        );
        if self.last.is_done() {
            debug!("Acceptance check complete: {:?}", self.last);
        }

        self.prev_error = Some(error);
        self.prev_time_s = Some(now_s);

        self.last
    }

    /// The result of the most recent check.
    pub fn last(&self) -> Acceptance {
        self.last
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn unbounded() -> f64 {
    f64::MAX
}
