//! Moving to a point in a straight line

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use std::f64::consts::PI;

// Internal
use super::{Follower, Outcome};
use crate::hw::Drivetrain;
use crate::pose::Pose;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Follower {
    /// Drive to the point (`x_m`, `y_m`), turning to face it first.
    ///
    /// When `reversed` the robot turns its back to the point and drives backwards.
    pub fn move_to(
        &mut self,
        drive: &mut dyn Drivetrain,
        x_m: f64,
        y_m: f64,
        reversed: bool,
    ) -> Outcome {
        let turned = if reversed {
            self.turn_away(drive, x_m, y_m)
        }
        else {
            self.turn_toward(drive, x_m, y_m)
        };
        if turned == Outcome::Interrupted {
            return turned;
        }

        let target = Pose::new(x_m, y_m, 0.0);
        let initial = self.pose.get();
        let line_heading = initial.angle_to(&target);
        let line = Pose::new(0.0, 0.0, line_heading).forward2();
        let distance = initial.distance(&target);
        let direction = if reversed { -1.0 } else { 1.0 };

        debug!(
            "Moving {:.3} m from {:?} to ({:.3}, {:.3}){}",
            distance, initial, x_m, y_m, if reversed { " in reverse" } else { "" }
        );

        self.lateral.start_profile(0.0, distance, None);
        self.heading.reset();

        let outcome = loop {
            if self.is_cancelled() {
                break Outcome::Interrupted;
            }

            let pose = self.pose.get();

            // Progress along the line, so an overshoot is seen as one
            let measured = (pose.position2() - initial.position2()).dot(&line);
            let velocity = direction * pose.lin_vel_ms;

            // Aim at the target until close, then hold the line so the robot does not spin
            // around the point as it arrives
            let mut heading_ref = if pose.distance(&target) < self.params.distance_to_switch_m {
                line_heading
            }
            else {
                pose.angle_to(&target)
            };
            if reversed {
                heading_ref += PI;
            }

            let forward = direction * self.lateral.output(measured, velocity);
            let turn = self.heading.get(wrap_pi(heading_ref - pose.heading_rad));

            trace!("MoveTo: progress {:.4}/{:.4}, forward {:.3}, turn {:.3}", measured, distance, forward, turn);

            drive.arcade(forward, turn);

            if self.lateral.is_done() {
                break self.lateral.acceptance().into();
            }

            self.wait_tick();
        };

        self.finish(drive, "MoveTo", turned.and(outcome))
    }
}
