//! Motion profile and profile follower parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::{MotionConstraints, MotionProfile, SCurveProfile, TrapezoidalProfile};
use crate::accept::AcceptParams;
use crate::ctrl::CtrlParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Which profile to use and its default constraints.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ProfileParams {
    pub kind: ProfileKind,

    /// Default constraints, overridable per motion
    pub constraints: MotionConstraints,
}

/// Parameters for a [`super::ProfileFollower`].
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct FollowerParams {
    pub profile: ProfileParams,

    /// Controller acting on the position error
    pub position_ctrl: CtrlParams,

    /// Controller acting on the velocity error
    pub velocity_ctrl: CtrlParams,

    /// Feedforward gain on the profile acceleration while speeding up
    pub k_accel: f64,

    /// Feedforward gain on the profile acceleration while slowing down
    pub k_decel: f64,

    /// Acceptance timeout as a multiple of the profile duration. Zero keeps
    /// the timeout from `accept`.
    #[serde(default = "default_timeout_scaling")]
    pub timeout_scaling: f64,

    /// Conditions under which the motion is complete
    pub accept: AcceptParams,
}

/// The pair of followers used by the motion commands.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct FollowerSet {
    /// Driving along lines and paths, in metres
    pub lateral: FollowerParams,

    /// Turning on the spot, in radians
    pub angular: FollowerParams,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Trapezoidal,
    SCurve,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileParams {
    /// Build a new profile from these parameters.
    pub fn build(&self) -> Box<dyn MotionProfile> {
        match self.kind {
            ProfileKind::Trapezoidal => Box::new(TrapezoidalProfile::new(self.constraints)),
            ProfileKind::SCurve => Box::new(SCurveProfile::new(self.constraints)),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

pub(crate) fn default_timeout_scaling() -> f64 {
    1.1
}
