//! Controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{Controller, PidController, TbhController};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for a [`PidController`].
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct PidParams {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    #[serde(default)]
    pub k_i: f64,

    /// Derivative gain
    #[serde(default)]
    pub k_d: f64,

    /// Feedforward. Added as a constant when driven by an error, scaled by
    /// the reference when driven by a state and reference.
    #[serde(default)]
    pub ff: f64,

    /// Errors larger than this do not accumulate into the integral
    #[serde(default = "infinity")]
    pub thresh_i: f64,

    /// Minimum output (and integral) value
    #[serde(default = "neg_infinity")]
    pub min_output: f64,

    /// Maximum output (and integral) value
    #[serde(default = "infinity")]
    pub max_output: f64,
}

/// Parameters for a [`TbhController`].
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TbhParams {
    /// Rate at which the error is integrated into the output
    pub k_tbh: f64,

    /// Output estimate per unit of reference, used to seed the output when
    /// the reference changes
    #[serde(default)]
    pub ff: f64,

    /// Minimum output value
    #[serde(default = "neg_infinity")]
    pub min_output: f64,

    /// Maximum output value
    #[serde(default = "infinity")]
    pub max_output: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Parameters for any of the available controllers, tagged by `type` in
/// parameter files.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "type")]
pub enum CtrlParams {
    Pid(PidParams),
    Tbh(TbhParams),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidParams {
    /// Proportional only controller with no limits.
    pub fn p(k_p: f64) -> Self {
        Self::pid(k_p, 0.0, 0.0)
    }

    /// Controller with the given gains and no limits.
    pub fn pid(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            ff: 0.0,
            thresh_i: infinity(),
            min_output: neg_infinity(),
            max_output: infinity(),
        }
    }

    /// Clamp the output to `[-limit, limit]`.
    pub fn with_limit(mut self, limit: f64) -> Self {
        self.min_output = -limit.abs();
        self.max_output = limit.abs();
        self
    }
}

impl CtrlParams {
    /// Build a fresh controller from these parameters.
    pub fn build(&self) -> Box<dyn Controller> {
        match self {
            CtrlParams::Pid(p) => Box::new(PidController::new(*p)),
            CtrlParams::Tbh(p) => Box::new(TbhController::new(*p)),
        }
    }
}

impl From<PidParams> for CtrlParams {
    fn from(p: PidParams) -> Self {
        CtrlParams::Pid(p)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn infinity() -> f64 {
    f64::INFINITY
}

fn neg_infinity() -> f64 {
    f64::NEG_INFINITY
}
