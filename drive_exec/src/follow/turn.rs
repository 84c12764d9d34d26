//! Turning on the spot

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use std::f64::consts::PI;

// Internal
use super::{Follower, Outcome};
use crate::hw::Drivetrain;
use crate::pose::Pose;
use util::maths::ang_dist;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Follower {
    /// Turn to face `heading_rad`, through the shortest angle.
    pub fn turn_to_heading(&mut self, drive: &mut dyn Drivetrain, heading_rad: f64) -> Outcome {
        let start = self.pose.get().heading_rad;
        let end = start + ang_dist(start, heading_rad);

        debug!("Turning from {:.4} rad to {:.4} rad", start, end);

        self.angular.start_profile(start, end, None);

        let outcome = loop {
            if self.is_cancelled() {
                break Outcome::Interrupted;
            }

            let pose = self.pose.get();
            let out = self.angular.output(pose.heading_rad, pose.ang_vel_rads);
            drive.arcade(0.0, out);

            if self.angular.is_done() {
                break self.angular.acceptance().into();
            }

            self.wait_tick();
        };

        self.finish(drive, "Turn", outcome)
    }

    /// Turn to face the point (`x_m`, `y_m`).
    pub fn turn_toward(&mut self, drive: &mut dyn Drivetrain, x_m: f64, y_m: f64) -> Outcome {
        let heading = self.pose.get().angle_to(&Pose::new(x_m, y_m, 0.0));
        self.turn_to_heading(drive, heading)
    }

    /// Turn so the back of the robot faces the point (`x_m`, `y_m`).
    pub fn turn_away(&mut self, drive: &mut dyn Drivetrain, x_m: f64, y_m: f64) -> Outcome {
        let heading = self.pose.get().angle_to(&Pose::new(x_m, y_m, 0.0)) + PI;
        self.turn_to_heading(drive, heading)
    }
}
