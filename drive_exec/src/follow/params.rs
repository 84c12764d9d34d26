//! Motion command parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::ctrl::CtrlParams;
use crate::path::PathParams;
use crate::profile::{default_timeout_scaling, FollowerParams, FollowerSet};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for all motion commands.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct FollowParams {
    /// Profile follower driving along a line or path, in metres
    pub lateral: FollowerParams,

    /// Profile follower for turns, in radians
    pub angular: FollowerParams,

    /// Controller turning onto the heading reference while driving
    pub heading_ctrl: CtrlParams,

    /// Within this distance of the target the heading reference stops tracking the target and
    /// holds the final heading
    pub distance_to_switch_m: f64,

    /// Distance ahead of the robot at which the path is aimed for
    pub lookahead_m: f64,

    /// Default path generation parameters
    pub path: PathParams,

    pub ramsete: RamseteParams,
}

/// Parameters of the RAMSETE path follower.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RamseteParams {
    /// Aggressiveness of the correction, > 0
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Damping of the correction, in (0, 1)
    #[serde(default = "default_zeta")]
    pub zeta: f64,

    /// Velocity controller for each side of the drivetrain
    pub wheel_ctrl: CtrlParams,

    /// The path is complete once its time has elapsed and the robot is within this distance of
    /// the end
    pub end_tolerance_m: f64,

    /// Timeout as a multiple of the path duration. Zero disables the timeout.
    #[serde(default = "default_timeout_scaling")]
    pub timeout_scaling: f64,
}

/// Parameters of the commands themselves, without the profile followers or the path defaults
/// which are kept with their own modules.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct CommandParams {
    pub heading_ctrl: CtrlParams,
    pub distance_to_switch_m: f64,
    pub lookahead_m: f64,
    pub ramsete: RamseteParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FollowParams {
    /// Combine parameters loaded from separate files.
    pub fn from_parts(followers: FollowerSet, path: PathParams, commands: CommandParams) -> Self {
        Self {
            lateral: followers.lateral,
            angular: followers.angular,
            heading_ctrl: commands.heading_ctrl,
            distance_to_switch_m: commands.distance_to_switch_m,
            lookahead_m: commands.lookahead_m,
            path,
            ramsete: commands.ramsete,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_beta() -> f64 {
    2.0
}

fn default_zeta() -> f64 {
    0.7
}
