//! # Path following
//!
//! Following generated paths, and running lists of motion commands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

// Internal
use super::{ramsete, Follower, Outcome};
use crate::hw::Drivetrain;
use crate::ctrl::SlewRate;
use crate::path::{Path, PathParams, PathPoint, PathStoreError, Waypoint};
use crate::pose::Pose;
use crate::profile::MotionConstraints;
use crate::CONTROL_PERIOD_S;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How a path is followed.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Profile along the path length, steering towards a look-ahead point
    Profile,

    /// RAMSETE tracking of the timed path
    Ramsete,
}

/// A single motion command.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Command {
    TurnTo {
        heading_rad: f64,
    },
    TurnToward {
        x_m: f64,
        y_m: f64,
        #[serde(default)]
        reversed: bool,
    },
    MoveTo {
        x_m: f64,
        y_m: f64,
        #[serde(default)]
        reversed: bool,
    },
    Path {
        /// Waypoints after the robot's current pose
        waypoints: Vec<Waypoint>,
        strategy: Strategy,
        #[serde(default)]
        reversed: bool,

        /// Overrides the default curviness and limits where non-zero
        #[serde(default)]
        params: Option<PathParams>,

        /// Name to load and save the path under
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("Cannot get the path to follow: {0}")]
    PathError(#[from] PathStoreError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Follower {
    /// Run the commands in order, stopping early if one is interrupted.
    pub fn follow(
        &mut self,
        drive: &mut dyn Drivetrain,
        commands: &[Command],
    ) -> Result<Outcome, FollowError> {
        let mut outcome = Outcome::Converged;

        for (i, command) in commands.iter().enumerate() {
            info!("Command {}/{}: {:?}", i + 1, commands.len(), command);

            outcome = outcome.and(self.execute(drive, command)?);
            if outcome == Outcome::Interrupted {
                break;
            }
        }

        Ok(outcome)
    }

    /// Run a single command.
    pub fn execute(
        &mut self,
        drive: &mut dyn Drivetrain,
        command: &Command,
    ) -> Result<Outcome, FollowError> {
        Ok(match command {
            Command::TurnTo { heading_rad } => self.turn_to_heading(drive, *heading_rad),
            Command::TurnToward { x_m, y_m, reversed: false } => self.turn_toward(drive, *x_m, *y_m),
            Command::TurnToward { x_m, y_m, reversed: true } => self.turn_away(drive, *x_m, *y_m),
            Command::MoveTo { x_m, y_m, reversed } => self.move_to(drive, *x_m, *y_m, *reversed),
            Command::Path {
                waypoints,
                strategy,
                reversed,
                params,
                name,
            } => {
                self.follow_path(drive, waypoints, *strategy, *reversed, *params, name.as_deref())?
            }
        })
    }

    /// Generate (or load) a path from the current pose through `waypoints` and follow it.
    ///
    /// When `reversed` the robot drives the path backwards, the waypoint headings are the
    /// direction the robot's front faces.
    pub fn follow_path(
        &mut self,
        drive: &mut dyn Drivetrain,
        waypoints: &[Waypoint],
        strategy: Strategy,
        reversed: bool,
        params: Option<PathParams>,
        name: Option<&str>,
    ) -> Result<Outcome, FollowError> {
        let path = self.make_path(waypoints, reversed, params, name)?;

        Ok(match strategy {
            Strategy::Profile => self.follow_profile(drive, &path, reversed),
            Strategy::Ramsete => self.follow_ramsete(drive, &path, reversed),
        })
    }

    /// Path from the current pose, with the headings turned round when driving backwards.
    fn make_path(
        &self,
        waypoints: &[Waypoint],
        reversed: bool,
        params: Option<PathParams>,
        name: Option<&str>,
    ) -> Result<Path, PathStoreError> {
        let facing = |pose: Pose| {
            let pose = Pose::new(pose.x_m, pose.y_m, pose.heading_rad);
            if reversed { pose.flipped() } else { pose }
        };

        let mut all = Vec::with_capacity(waypoints.len() + 1);
        all.push(Waypoint::new(facing(self.pose.get())));
        all.extend(waypoints.iter().map(|w| Waypoint {
            pose: facing(w.pose),
            ..*w
        }));

        let params = self.params.path.overridden_by(params);

        match (name, self.store.as_ref()) {
            (Some(name), Some(store)) => store.generate_or_load(name, &all, &params),
            _ => Ok(Path::generate(&all, &params)?),
        }
    }

    /// Follow with a lateral profile along the path length.
    ///
    /// Progress is measured at the closest path point, and the robot steers towards a point a
    /// look-ahead distance further along the path. Close to the end the final heading is held
    /// instead.
    fn follow_profile(&mut self, drive: &mut dyn Drivetrain, path: &Path, reversed: bool) -> Outcome {
        let end = match path.last() {
            Some(p) => p.pose,
            None => return self.finish(drive, "Path", Outcome::Converged),
        };
        let direction = if reversed { -1.0 } else { 1.0 };
        let lookahead_m = self.params.lookahead_m;
        let switch_m = self.params.distance_to_switch_m;

        debug!("Following {:.3} m path with a profile", path.length());

        let path_params = path.params();
        self.lateral.start_profile(
            0.0,
            path.length(),
            Some(MotionConstraints::new(path_params.max_vel_ms, path_params.max_accel_mss, 0.0)),
        );
        self.heading.reset();

        let mut closest = 0;
        let outcome = loop {
            if self.is_cancelled() {
                break Outcome::Interrupted;
            }

            let pose = self.pose.get();
            let facing = if reversed { pose.flipped() } else { pose };

            closest = path.closest_index(&facing, closest);
            let point = match path.point(closest) {
                Some(p) => *p,
                None => break Outcome::Converged,
            };

            // Arc length at the closest point plus the remainder along its tangent
            let measured = point.distance_m
                + (facing.position2() - point.pose.position2()).dot(&point.pose.forward2());

            let heading_ref = if facing.distance(&end) < switch_m {
                end.heading_rad
            }
            else {
                match path.lookahead_index(&facing, closest, lookahead_m).and_then(|i| path.point(i)) {
                    Some(p) => facing.angle_to(&p.pose),
                    None => end.heading_rad,
                }
            };

            let forward = direction * self.lateral.output(measured, direction * pose.lin_vel_ms);
            let turn = self.heading.get(wrap_pi(heading_ref - facing.heading_rad));

            trace!(
                "Path profile: closest {} progress {:.4}, forward {:.3}, turn {:.3}",
                closest, measured, forward, turn
            );

            drive.arcade(forward, turn);

            if self.lateral.is_done() {
                break self.lateral.acceptance().into();
            }

            self.wait_tick();
        };

        self.finish(drive, "Path", outcome)
    }

    /// Follow the timed path with the RAMSETE controller and per-side velocity control.
    fn follow_ramsete(&mut self, drive: &mut dyn Drivetrain, path: &Path, reversed: bool) -> Outcome {
        let end = match path.last() {
            Some(p) => p.pose,
            None => return self.finish(drive, "RAMSETE", Outcome::Converged),
        };
        let params = self.params.ramsete;
        let geometry = drive.geometry();

        let total_s = path.total_time();
        let timeout_s = if params.timeout_scaling > 0.0 {
            params.timeout_scaling * total_s
        }
        else {
            f64::INFINITY
        };

        debug!(
            "Following {:.3} m path with RAMSETE, {:.3} s long, timeout {:.3} s",
            path.length(), total_s, timeout_s
        );

        self.left.reset();
        self.right.reset();
        let direction = if reversed { -1.0 } else { 1.0 };
        self.start_velocity_limit(path, direction * self.pose.get().lin_vel_ms);
        let start_s = self.clock.now();

        let outcome = loop {
            if self.is_cancelled() {
                break Outcome::Interrupted;
            }

            let elapsed_s = self.clock.now() - start_s;
            let pose = self.pose.get();
            let facing = if reversed { pose.flipped() } else { pose };

            let target = match path.sample_at_time(elapsed_s) {
                Some(t) => t,
                None => break Outcome::Converged,
            };

            let (ref_v, ref_w) = self.limit_velocity_ref(&target);
            let (v, w) = ramsete(
                &facing,
                &target.pose,
                ref_v,
                ref_w,
                params.beta,
                params.zeta,
            );
            let (ref_left, ref_right) = geometry.to_wheel_velocities(v, w);
            let (left, right) = drive.wheel_velocities();

            // Backwards the sides swap and run the other way
            let (left_out, right_out) = if reversed {
                (
                    self.left.get_state_ref(left, -ref_right),
                    self.right.get_state_ref(right, -ref_left),
                )
            }
            else {
                (
                    self.left.get_state_ref(left, ref_left),
                    self.right.get_state_ref(right, ref_right),
                )
            };

            trace!(
                "RAMSETE t = {:.3}: v {:.3} w {:.3}, out ({:.3}, {:.3})",
                elapsed_s, v, w, left_out, right_out
            );

            drive.tank(left_out, right_out);

            if elapsed_s >= total_s && facing.distance(&end) < params.end_tolerance_m {
                break Outcome::Converged;
            }
            if elapsed_s >= timeout_s {
                break Outcome::TimedOut;
            }

            self.wait_tick();
        };

        self.finish(drive, "RAMSETE", outcome)
    }

    /// Start limiting the velocity reference to the path's acceleration, from the robot's
    /// velocity along the path.
    fn start_velocity_limit(&mut self, path: &Path, initial_ms: f64) {
        let max_change = path.params().max_accel_mss * CONTROL_PERIOD_S;
        self.velocity_ref = SlewRate::symmetric(max_change, initial_ms);
    }

    /// Linear and angular velocity references for a path point, the linear one slewed.
    ///
    /// When the slew bites the angular reference is taken from the path curvature so the robot
    /// stays on the path's arc.
    fn limit_velocity_ref(&mut self, target: &PathPoint) -> (f64, f64) {
        let v = self.velocity_ref.slew(target.velocity_ms);

        if v == target.velocity_ms {
            (v, target.ang_vel_rads)
        }
        else {
            (v, v * target.curvature_m)
        }
    }
}
