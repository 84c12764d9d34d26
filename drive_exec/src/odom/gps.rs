//! Correcting the odometry with an absolute position sensor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error};

// Internal
use super::{AbsoluteParams, Odometry};
use crate::hw::AbsolutePositionSensor;
use util::maths::ang_dist;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    /// Pull the tracked position towards the absolute sensor's reading.
    ///
    /// Position is weighted by `full_pose_trust` and heading by `heading_trust`. Returns false if
    /// the sensor is missing or its reading is not accurate enough to use.
    pub fn reseed(&mut self, sensor: &dyn AbsolutePositionSensor) -> bool {
        let params = self.params().absolute;

        if !sensor.is_installed() {
            error!("Absolute position sensor is not installed, cannot reseed odometry");
            return false;
        }

        let error_m = sensor.error_m();
        if !(error_m < params.max_error_m) {
            debug!(
                "Absolute position error {:.3} m is above the limit of {:.3} m, not reseeding",
                error_m, params.max_error_m
            );
            return false;
        }

        let measured = sensor.pose();
        let mut pose = self.pose();
        pose.x_m = blend(pose.x_m, measured.x_m, params.full_pose_trust);
        pose.y_m = blend(pose.y_m, measured.y_m, params.full_pose_trust);
        pose.heading_rad = blend_heading(sensor, &params, pose.heading_rad);

        self.set_pose(pose);
        true
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Blend a heading with the absolute sensor's heading by `heading_trust`.
///
/// Falls back on `other_heading_rad` when the sensor is missing. The blend is taken along the
/// shortest angle between the two, so the result is continuous with `other_heading_rad`.
fn blend_heading(
    sensor: &dyn AbsolutePositionSensor,
    params: &AbsoluteParams,
    other_heading_rad: f64,
) -> f64 {
    if !sensor.is_installed() {
        return other_heading_rad;
    }

    let measured = sensor.pose().heading_rad;
    other_heading_rad + params.heading_trust * ang_dist(other_heading_rad, measured)
}

fn blend(current: f64, measured: f64, trust: f64) -> f64 {
    trust * measured + (1.0 - trust) * current
}
