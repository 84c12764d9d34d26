//! Path generation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::PathError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters used to generate a path
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct PathParams {
    /// Magnitude of the tangent at each waypoint. Larger values hold the
    /// waypoint heading for longer, giving wider curves.
    pub curviness_m: f64,

    /// Maximum velocity along the path
    pub max_vel_ms: f64,

    /// Maximum acceleration (and deceleration) along the path
    pub max_accel_mss: f64,

    /// Track width of the robot, used to slow down on tight curves
    pub track_width_m: f64,

    /// Target distance between consecutive path points
    #[serde(default = "default_spacing_m")]
    pub spacing_m: f64,

    /// Allowed deviation from `spacing_m`
    #[serde(default = "default_max_spacing_error_m")]
    pub max_spacing_error_m: f64,

    /// How far the point search window moves towards its lower bound on each
    /// step, in (0, 1)
    #[serde(default = "default_binary_search_scaling")]
    pub binary_search_scaling: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathParams {
    /// Apply per-path overrides. Curviness and the velocity and acceleration
    /// limits are taken from `special` where they are non-zero, the geometry
    /// and resampling settings always come from `self`.
    pub fn overridden_by(&self, special: Option<PathParams>) -> Self {
        match special {
            Some(s) => Self {
                curviness_m: if s.curviness_m != 0.0 { s.curviness_m } else { self.curviness_m },
                max_vel_ms: if s.max_vel_ms != 0.0 { s.max_vel_ms } else { self.max_vel_ms },
                max_accel_mss: if s.max_accel_mss != 0.0 { s.max_accel_mss } else { self.max_accel_mss },
                ..*self
            },
            None => *self,
        }
    }

    /// Check that the parameters can generate a path.
    pub fn validate(&self) -> Result<(), PathError> {
        let positive = [
            ("max_vel_ms", self.max_vel_ms),
            ("max_accel_mss", self.max_accel_mss),
            ("track_width_m", self.track_width_m),
            ("spacing_m", self.spacing_m),
            ("max_spacing_error_m", self.max_spacing_error_m),
        ];

        for (name, value) in positive.iter() {
            if !(*value > 0.0) || !value.is_finite() {
                return Err(PathError::InvalidParams(format!(
                    "{} must be positive and finite, found {}", name, value
                )));
            }
        }

        if self.max_spacing_error_m >= self.spacing_m {
            return Err(PathError::InvalidParams(format!(
                "max_spacing_error_m ({}) must be less than spacing_m ({})",
                self.max_spacing_error_m, self.spacing_m
            )));
        }

        if !(self.binary_search_scaling > 0.0 && self.binary_search_scaling < 1.0) {
            return Err(PathError::InvalidParams(format!(
                "binary_search_scaling must be in (0, 1), found {}",
                self.binary_search_scaling
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Half an inch
fn default_spacing_m() -> f64 {
    0.0127
}

/// Twentieth of an inch
fn default_max_spacing_error_m() -> f64 {
    0.00127
}

fn default_binary_search_scaling() -> f64 {
    0.75
}
