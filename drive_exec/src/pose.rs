//! # Pose
//!
//! The planar pose of the robot in the field frame, along with the single-writer store the pose
//! tracker publishes into.
//!
//! Headings are measured counter-clockwise from the field +X axis. In the robot body frame +X is
//! forward and +Y is to the left.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};
use std::sync::{Arc, RwLock};

// Internal
use util::maths::ang_dist;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position, heading and velocity of the robot in the field frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// X position in the field frame
    pub x_m: f64,

    /// Y position in the field frame
    pub y_m: f64,

    /// Heading, angle to the field +X axis. Not wrapped, so a continuously
    /// turning robot accumulates heading.
    pub heading_rad: f64,

    /// Forward velocity along the heading
    #[serde(default)]
    pub lin_vel_ms: f64,

    /// Angular velocity about the vertical axis, +ve counter-clockwise
    #[serde(default)]
    pub ang_vel_rads: f64,
}

/// Writer side of the shared robot pose.
///
/// There is exactly one of these per tracked robot and it cannot be cloned, any number of
/// [`PoseHandle`]s can be made to read the pose.
#[derive(Debug)]
pub struct PoseStore {
    pose: Arc<RwLock<Pose>>,
}

/// Read-only view of a [`PoseStore`].
#[derive(Debug, Clone)]
pub struct PoseHandle {
    pose: Arc<RwLock<Pose>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a new stationary pose.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad,
            ..Default::default()
        }
    }

    /// Get the 2D position vector of the pose.
    pub fn position2(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    /// Unit vector pointing along the heading.
    pub fn forward2(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Straight line distance between the positions of two poses.
    pub fn distance(&self, other: &Pose) -> f64 {
        (other.position2() - self.position2()).norm()
    }

    /// Bearing of `other`'s position as seen from this pose's position.
    pub fn angle_to(&self, other: &Pose) -> f64 {
        (other.y_m - self.y_m).atan2(other.x_m - self.x_m)
    }

    /// Shortest signed rotation which would point this pose at `other`.
    pub fn heading_error_to(&self, other: &Pose) -> f64 {
        ang_dist(self.heading_rad, self.angle_to(other))
    }

    /// Copy of this pose with the heading replaced.
    pub fn with_heading(mut self, heading_rad: f64) -> Self {
        self.heading_rad = heading_rad;
        self
    }

    /// Copy of this pose turned around by half a revolution.
    pub fn flipped(self) -> Self {
        self.with_heading(self.heading_rad + std::f64::consts::PI)
    }
}

impl Add for Pose {
    type Output = Pose;

    fn add(mut self, rhs: Pose) -> Pose {
        self.x_m += rhs.x_m;
        self.y_m += rhs.y_m;
        self
    }
}

impl Sub for Pose {
    type Output = Pose;

    fn sub(mut self, rhs: Pose) -> Pose {
        self.x_m -= rhs.x_m;
        self.y_m -= rhs.y_m;
        self
    }
}

impl Mul<f64> for Pose {
    type Output = Pose;

    fn mul(mut self, rhs: f64) -> Pose {
        self.x_m *= rhs;
        self.y_m *= rhs;
        self
    }
}

impl PoseStore {
    pub fn new(initial: Pose) -> Self {
        Self {
            pose: Arc::new(RwLock::new(initial)),
        }
    }

    /// Publish a new pose.
    pub fn set(&self, pose: Pose) {
        match self.pose.write() {
            Ok(mut p) => *p = pose,
            Err(e) => *e.into_inner() = pose,
        }
    }

    /// Copy of the current pose.
    pub fn get(&self) -> Pose {
        read_pose(&self.pose)
    }

    /// Create a new reader of this store.
    pub fn handle(&self) -> PoseHandle {
        PoseHandle {
            pose: self.pose.clone(),
        }
    }
}

impl PoseHandle {
    /// Copy of the current pose.
    pub fn get(&self) -> Pose {
        read_pose(&self.pose)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The pose is plain data so a poisoned lock still holds a usable value.
fn read_pose(pose: &RwLock<Pose>) -> Pose {
    match pose.read() {
        Ok(p) => *p,
        Err(e) => *e.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_arithmetic() {
        let mut a = Pose::new(1.0, 2.0, 0.5);
        a.lin_vel_ms = 0.3;
        let b = Pose::new(0.5, -1.0, 2.0);

        let sum = a + b;
        assert_eq!(sum.x_m, 1.5);
        assert_eq!(sum.y_m, 1.0);
        assert_eq!(sum.heading_rad, 0.5);
        assert_eq!(sum.lin_vel_ms, 0.3);

        let diff = a - b;
        assert_eq!(diff.x_m, 0.5);
        assert_eq!(diff.y_m, 3.0);
        assert_eq!(diff.heading_rad, 0.5);

        let scaled = a * 2.0;
        assert_eq!(scaled.x_m, 2.0);
        assert_eq!(scaled.y_m, 4.0);
        assert_eq!(scaled.heading_rad, 0.5);
    }

    #[test]
    fn test_geometry() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(0.0, 2.0, 0.0);

        assert!((a.distance(&b) - 2.0).abs() < 1e-12);
        assert!((a.angle_to(&b) - PI / 2.0).abs() < 1e-12);
        assert!((a.heading_error_to(&b) - PI / 2.0).abs() < 1e-12);

        // Heading error is wrapped even if the pose has accumulated turns
        let spun = a.with_heading(4.0 * PI);
        assert!((spun.heading_error_to(&b) - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_store() {
        let store = PoseStore::new(Pose::default());
        let handle = store.handle();
        let other = handle.clone();

        store.set(Pose::new(1.0, 1.0, 1.0));

        assert_eq!(handle.get(), Pose::new(1.0, 1.0, 1.0));
        assert_eq!(other.get(), store.get());
    }
}
