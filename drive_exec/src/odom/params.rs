//! Odometry parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the pose tracker.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct OdomParams {
    /// Average the forward tracking wheel with the drivetrain's own measurement of forward travel
    #[serde(default)]
    pub drive_cross_check: bool,

    /// Period of the tracker task
    #[serde(default = "default_period_s")]
    pub period_s: f64,

    /// Absolute position sensor blending
    #[serde(default)]
    pub absolute: AbsoluteParams,
}

/// How far readings from an absolute position sensor are trusted.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AbsoluteParams {
    /// Weight of the sensor's x and y when reseeding, in [0, 1]
    pub full_pose_trust: f64,

    /// Weight of the sensor's heading when blending headings, in [0, 1]
    pub heading_trust: f64,

    /// Readings with a larger reported error are ignored
    pub max_error_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for OdomParams {
    fn default() -> Self {
        Self {
            drive_cross_check: false,
            period_s: default_period_s(),
            absolute: AbsoluteParams::default(),
        }
    }
}

impl Default for AbsoluteParams {
    fn default() -> Self {
        Self {
            full_pose_trust: 1.0,
            heading_trust: 0.5,
            max_error_m: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_period_s() -> f64 {
    0.01
}
