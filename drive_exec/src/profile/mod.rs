//! # Motion profiles
//!
//! One dimensional motion profiles which take a system at rest to rest again a given distance
//! away, respecting velocity, acceleration and (for the S-curve) jerk limits. Profiles are used
//! both for linear motion (metres) and for turning (radians), the maths is the same.
//!
//! Profiles always start at zero position and time. The [`ProfileFollower`] offsets them to the
//! actual start of a motion.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod follower;
mod params;
mod s_curve;
mod trapezoidal;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use follower::*;
pub use params::*;
pub use s_curve::*;
pub use trapezoidal::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of bisections used when searching a profile for a position.
const POSITION_SEARCH_ITERATIONS: usize = 40;

/// Sample times this far past the end of a profile still return the final step, absorbing the
/// rounding in the cumulative phase times.
pub(crate) const END_TIME_TOLERANCE_S: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits on a motion. Units follow the profile, e.g. m/s or rad/s.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionConstraints {
    /// Maximum velocity
    pub max_vel: f64,

    /// Maximum acceleration
    pub max_accel: f64,

    /// Maximum jerk, ignored by the trapezoidal profile
    #[serde(default)]
    pub max_jerk: f64,
}

/// Kinematic state sampled from a profile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MotionStep {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A rest-to-rest motion profile.
pub trait MotionProfile: Send {
    /// Plan a new motion to `target`, using `special` to override the
    /// profile's default constraints for this motion only.
    fn set_parameters(&mut self, target: f64, special: Option<MotionConstraints>);

    /// Sample the profile at the given time since the start of the motion.
    ///
    /// Returns `None` outside the `[0, total_time]` range.
    fn sample(&self, t_s: f64) -> Option<MotionStep>;

    /// Duration of the planned motion.
    fn total_time(&self) -> f64;

    /// Signed distance of the planned motion.
    fn target(&self) -> f64;

    /// The constraints the current motion was planned with.
    fn constraints(&self) -> MotionConstraints;

    /// Find the time at which the profile reaches the given position.
    ///
    /// Positions before the start map to zero and positions past the target map to the total
    /// time.
    fn time_at_position(&self, position: f64) -> f64 {
        let target = self.target();
        let total = self.total_time();
        if target == 0.0 || total <= 0.0 {
            return 0.0;
        }

        // Work in the direction of motion so the position is increasing in time
        let wanted = position * target.signum();
        if wanted <= 0.0 {
            return 0.0;
        }
        if wanted >= target.abs() {
            return total;
        }

        let mut lo = 0.0;
        let mut hi = total;
        for _ in 0..POSITION_SEARCH_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            let reached = self.sample(mid)
                .map(|s| s.position * target.signum())
                .unwrap_or(target.abs());
            if reached < wanted {
                lo = mid;
            }
            else {
                hi = mid;
            }
        }

        0.5 * (lo + hi)
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionConstraints {
    pub fn new(max_vel: f64, max_accel: f64, max_jerk: f64) -> Self {
        Self {
            max_vel,
            max_accel,
            max_jerk,
        }
    }

    /// Apply special constraints on top of these defaults. Any field left at
    /// zero in `special` keeps the default value.
    pub fn overridden_by(&self, special: Option<MotionConstraints>) -> Self {
        match special {
            Some(s) => Self {
                max_vel: if s.max_vel != 0.0 { s.max_vel.abs() } else { self.max_vel },
                max_accel: if s.max_accel != 0.0 { s.max_accel.abs() } else { self.max_accel },
                max_jerk: if s.max_jerk != 0.0 { s.max_jerk.abs() } else { self.max_jerk },
            },
            None => *self,
        }
    }
}

impl MotionStep {
    pub fn new(position: f64, velocity: f64, acceleration: f64) -> Self {
        Self {
            position,
            velocity,
            acceleration,
        }
    }

    /// The step reached after applying a constant jerk for `dt_s`.
    pub fn integrate(&self, jerk: f64, dt_s: f64) -> Self {
        let dt2 = dt_s * dt_s;
        Self {
            position: self.position
                + self.velocity * dt_s
                + 0.5 * self.acceleration * dt2
                + jerk * dt2 * dt_s / 6.0,
            velocity: self.velocity + self.acceleration * dt_s + 0.5 * jerk * dt2,
            acceleration: self.acceleration + jerk * dt_s,
        }
    }

    /// The step mirrored about zero.
    pub fn negated(&self) -> Self {
        Self {
            position: -self.position,
            velocity: -self.velocity,
            acceleration: -self.acceleration,
        }
    }
}
