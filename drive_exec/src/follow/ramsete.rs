//! RAMSETE tracking control law

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::pose::Pose;
use util::maths::{sinc, wrap_pi};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the (linear, angular) velocity which steers `pose` onto a target moving with the
/// given velocities.
///
/// `beta` (> 0) sets how hard errors are corrected and `zeta` (in (0, 1)) how damped the
/// correction is.
pub fn ramsete(
    pose: &Pose,
    target: &Pose,
    target_vel_ms: f64,
    target_ang_vel_rads: f64,
    beta: f64,
    zeta: f64,
) -> (f64, f64) {
    // Error in the robot frame
    let (sin_h, cos_h) = pose.heading_rad.sin_cos();
    let dx = target.x_m - pose.x_m;
    let dy = target.y_m - pose.y_m;
    let e_x = cos_h * dx + sin_h * dy;
    let e_y = -sin_h * dx + cos_h * dy;
    let e_h = wrap_pi(target.heading_rad - pose.heading_rad);

    let k = 2.0 * zeta * (target_ang_vel_rads.powi(2) + beta * target_vel_ms.powi(2)).sqrt();

    let v = target_vel_ms * e_h.cos() + k * e_x;
    let w = target_ang_vel_rads + k * e_h + beta * target_vel_ms * sinc(e_h) * e_y;

    (v, w)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_no_error() {
        let pose = Pose::new(1.0, 2.0, 0.7);
        assert_eq!(ramsete(&pose, &pose, 0.0, 0.0, 2.0, 0.7), (0.0, 0.0));

        // On target the target velocities pass straight through
        let (v, w) = ramsete(&pose, &pose, 1.2, -0.5, 2.0, 0.7);
        assert!((v - 1.2).abs() < 1e-12);
        assert!((w + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_corrections() {
        let pose = Pose::new(0.0, 0.0, PI / 2.0);

        // Target ahead of the robot speeds it up
        let (v, w) = ramsete(&pose, &Pose::new(0.0, 0.1, PI / 2.0), 1.0, 0.0, 2.0, 0.7);
        assert!(v > 1.0);
        assert!(w.abs() < 1e-12);

        // Target to the robot's left turns it left
        let (v, w) = ramsete(&pose, &Pose::new(-0.1, 0.0, PI / 2.0), 1.0, 0.0, 2.0, 0.7);
        assert!((v - 1.0).abs() < 1e-12);
        assert!(w > 0.0);

        // Heading error across the wrap point is small
        let pose = Pose::new(0.0, 0.0, PI - 0.05);
        let (_, w) = ramsete(&pose, &Pose::new(0.0, 0.0, -PI + 0.05), 1.0, 0.0, 2.0, 0.7);
        assert!(w > 0.0 && w < 1.0);
    }
}
