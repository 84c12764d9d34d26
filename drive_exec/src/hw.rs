//! # Hardware interfaces
//!
//! Traits implemented by the device layer (or by [`crate::sim`]) which the motion control core
//! drives and reads. Device I/O itself lives outside this crate.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::pose::Pose;
use crate::units::{Angle, Length};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed geometry of a differential drivetrain.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DriveGeometry {
    /// Distance between the left and right wheel contact patches
    pub track_width_m: f64,

    /// Circumference of the drive wheels
    pub wheel_circumference_m: f64,

    /// Wheel revolutions per motor revolution
    pub gear_ratio: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A differential (tank) drivetrain.
///
/// Demands are in volts, velocities in m/s at the wheel.
pub trait Drivetrain {
    /// Command the left and right sides independently.
    fn tank(&mut self, left_v: f64, right_v: f64);

    /// Command a forward and a turning (counter-clockwise positive) demand.
    fn arcade(&mut self, forward_v: f64, turn_v: f64) {
        self.tank(forward_v - turn_v, forward_v + turn_v)
    }

    /// Stop and hold.
    fn brake(&mut self);

    /// Forward velocity of the robot.
    fn linear_velocity(&self) -> f64 {
        let (l, r) = self.wheel_velocities();
        0.5 * (l + r)
    }

    /// Angular velocity of the robot, counter-clockwise positive.
    fn angular_velocity(&self) -> f64 {
        let (l, r) = self.wheel_velocities();
        (r - l) / self.geometry().track_width_m
    }

    /// Velocities of the (left, right) sides.
    fn wheel_velocities(&self) -> (f64, f64);

    fn geometry(&self) -> DriveGeometry;

    /// Forward distance travelled by the drivetrain as a whole since the last call, if the
    /// drivetrain can measure it.
    fn traveled(&mut self) -> Option<Length> {
        None
    }
}

/// A tracking wheel, reporting travel along its rolling direction.
///
/// The forward wheel reports positive travel moving forwards, the side wheel moving left.
pub trait Odometer: Send {
    /// Distance travelled since the last call.
    fn traveled(&mut self) -> Length;

    /// Perpendicular offset of the wheel from the robot's turning centre.
    ///
    /// For the forward wheel positive is to the left of the centre, for the side wheel positive
    /// is behind it.
    fn from_center(&self) -> Length;
}

/// A sensor measuring rotation of the robot about the vertical axis.
pub trait HeadingSensor: Send {
    /// Rotation since the last call, counter-clockwise positive.
    fn heading_delta(&mut self) -> Angle;
}

/// A sensor measuring the robot's position in the field directly (e.g. a vision based positioning
/// system).
pub trait AbsolutePositionSensor: Send {
    /// False if the device is missing.
    fn is_installed(&self) -> bool;

    /// Latest measured pose.
    fn pose(&self) -> Pose;

    /// Estimated position error of the latest measurement.
    fn error_m(&self) -> f64;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveGeometry {
    /// Convert a body velocity and angular velocity into (left, right) wheel velocities.
    pub fn to_wheel_velocities(&self, lin_vel_ms: f64, ang_vel_rads: f64) -> (f64, f64) {
        let half_track = 0.5 * self.track_width_m;
        (
            lin_vel_ms - ang_vel_rads * half_track,
            lin_vel_ms + ang_vel_rads * half_track,
        )
    }

    /// Wheel surface speed for a motor speed in revolutions per minute.
    pub fn rpm_to_ms(&self, motor_rpm: f64) -> f64 {
        motor_rpm * self.gear_ratio * self.wheel_circumference_m / 60.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wheel_velocities() {
        let geom = DriveGeometry {
            track_width_m: 0.3,
            wheel_circumference_m: 0.25,
            gear_ratio: 0.6,
        };

        assert_eq!(geom.to_wheel_velocities(1.0, 0.0), (1.0, 1.0));

        // Turning on the spot counter-clockwise
        let (l, r) = geom.to_wheel_velocities(0.0, 2.0);
        assert!((l + 0.3).abs() < 1e-12);
        assert!((r - 0.3).abs() < 1e-12);

        assert!((geom.rpm_to_ms(600.0) - 1.5).abs() < 1e-12);
    }
}
