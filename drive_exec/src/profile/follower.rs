//! # Profile follower
//!
//! Runs a [`MotionProfile`] against measured feedback. The output is the sum of:
//!
//! - a position term, comparing the measured position against the profile position just ahead of
//!   where the profile reaches the measured position. Indexing by position rather than time means
//!   a robot which is held back (by another robot, say) is not dragged forward by a reference that
//!   has run away from it.
//! - a velocity term, comparing the measured velocity against the profile velocity at the elapsed
//!   time.
//! - an acceleration feedforward from the profile acceleration, with separate gains for speeding
//!   up and slowing down.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use std::sync::Arc;

// Internal
use super::{FollowerParams, MotionConstraints, MotionProfile, MotionStep};
use crate::accept::{Acceptance, AcceptanceChecker};
use crate::ctrl::Controller;
use crate::CONTROL_PERIOD_S;
use util::time::Clock;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follows a motion profile using position and velocity feedback.
pub struct ProfileFollower {
    profile: Box<dyn MotionProfile>,
    position: Box<dyn Controller>,
    velocity: Box<dyn Controller>,

    k_accel: f64,
    k_decel: f64,
    timeout_scaling: f64,

    checker: AcceptanceChecker,
    clock: Arc<dyn Clock>,

    /// Absolute position the profile starts from
    start: f64,

    /// Absolute position the profile ends at
    end: f64,

    start_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ProfileFollower {
    pub fn new(params: &FollowerParams, clock: Arc<dyn Clock>) -> Self {
        Self {
            profile: params.profile.build(),
            position: params.position_ctrl.build(),
            velocity: params.velocity_ctrl.build(),
            k_accel: params.k_accel,
            k_decel: params.k_decel,
            timeout_scaling: params.timeout_scaling,
            checker: AcceptanceChecker::new(params.accept),
            start_time_s: clock.now(),
            clock,
            start: 0.0,
            end: 0.0,
        }
    }

    /// Start a new motion from `start` to `end`.
    ///
    /// Controllers and the acceptance check are reset. If a timeout scaling is set the acceptance
    /// timeout becomes that multiple of the new profile's duration.
    pub fn start_profile(&mut self, start: f64, end: f64, special: Option<MotionConstraints>) {
        self.profile.set_parameters(end - start, special);
        self.position.reset();
        self.velocity.reset();
        self.checker.reset();

        if self.timeout_scaling > 0.0 {
            self.checker.set_timeout(self.timeout_scaling * self.profile.total_time());
        }

        self.start = start;
        self.end = end;
        self.start_time_s = self.clock.now();

        debug!(
            "Starting profile from {:.4} to {:.4}, duration {:.3} s, timeout {:.3} s",
            start, end, self.profile.total_time(), self.checker.params().timeout_s
        );
    }

    /// Get the control output for the measured position and velocity.
    ///
    /// Once the profile has finished the final rest state is held as the reference.
    pub fn output(&mut self, measured_position: f64, measured_velocity: f64) -> f64 {
        let now_s = self.clock.now();
        let elapsed_s = now_s - self.start_time_s;

        let timed = self.step_at(elapsed_s);

        // Position reference a single control period ahead of the measured progress
        let progress = measured_position - self.start;
        let lead_time_s = self.profile.time_at_position(progress) + CONTROL_PERIOD_S;
        let position_ref = self.start + self.step_at(lead_time_s).position;

        let position_out = self.position.get_state_ref(measured_position, position_ref);
        let velocity_out = self.velocity.get_state_ref(measured_velocity, timed.velocity);
        let accel_ff = self.accel_feedforward(timed.acceleration);

        self.checker.check(self.end - measured_position, now_s);

        trace!(
            "Profile t = {:.3}: pos {:.4}/{:.4}, vel {:.4}/{:.4}, out P {:.3} V {:.3} A {:.3}",
            elapsed_s,
            measured_position,
            position_ref,
            measured_velocity,
            timed.velocity,
            position_out,
            velocity_out,
            accel_ff
        );

        position_out + velocity_out + accel_ff
    }

    /// True once the acceptance check has converged or timed out.
    pub fn is_done(&self) -> bool {
        self.checker.last().is_done()
    }

    /// Result of the latest acceptance check.
    pub fn acceptance(&self) -> Acceptance {
        self.checker.last()
    }

    pub fn profile(&self) -> &dyn MotionProfile {
        self.profile.as_ref()
    }

    /// Sample the profile, holding the end state once it is over.
    fn step_at(&self, t_s: f64) -> MotionStep {
        match self.profile.sample(t_s) {
            Some(s) => s,
            None if t_s <= 0.0 => MotionStep::default(),
            None => MotionStep::new(self.profile.target(), 0.0, 0.0),
        }
    }

    /// Acceleration feedforward, using the deceleration gain whenever the
    /// acceleration opposes the direction of travel.
    fn accel_feedforward(&self, acceleration: f64) -> f64 {
        let direction = if self.profile.target() < 0.0 { -1.0 } else { 1.0 };

        if acceleration * direction >= 0.0 {
            self.k_accel * acceleration
        }
        else {
            self.k_decel * acceleration
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::accept::AcceptParams;
    use crate::ctrl::PidParams;
    use crate::profile::{ProfileKind, ProfileParams};
    use util::time::SimClock;

    fn params() -> FollowerParams {
        FollowerParams {
            profile: ProfileParams {
                kind: ProfileKind::Trapezoidal,
                constraints: MotionConstraints::new(1.0, 2.0, 0.0),
            },
            position_ctrl: PidParams::p(4.0).into(),
            velocity_ctrl: PidParams::p(0.0).into(),
            k_accel: 0.1,
            k_decel: 0.05,
            timeout_scaling: 1.5,
            accept: AcceptParams::new(0.01).with_dwell(0.05),
        }
    }

    /// Ideal plant where the output is the commanded velocity
    #[test]
    fn test_follow_velocity_plant() {
        let clock = SimClock::new();
        let mut follower = ProfileFollower::new(&params(), Arc::new(clock.clone()));

        follower.start_profile(1.0, 3.0, None);
        let total = follower.profile().total_time();

        let mut pos = 1.0;
        let mut vel = 0.0;
        let mut ticks = 0;
        while !follower.is_done() {
            let out = follower.output(pos, vel);
            let expected = follower.profile().sample(clock.now()).map(|s| s.velocity);

            // Feed the velocity reference straight through plus the position correction
            vel = expected.unwrap_or(0.0) + out;
            pos += vel * CONTROL_PERIOD_S;

            clock.sleep(CONTROL_PERIOD_S);
            ticks += 1;
            assert!(ticks < 10_000);
        }

        assert_eq!(follower.acceptance(), Acceptance::Converged);
        assert!((pos - 3.0).abs() < 0.01);
        assert!(clock.now() < 1.5 * total + 0.1);
    }

    #[test]
    fn test_stalled_robot_times_out() {
        let clock = SimClock::new();
        let mut follower = ProfileFollower::new(&params(), Arc::new(clock.clone()));

        follower.start_profile(0.0, -2.0, None);
        let total = follower.profile().total_time();

        let mut first_out = None;
        let mut ticks = 0;
        while !follower.is_done() {
            let out = follower.output(0.0, 0.0);
            first_out.get_or_insert(out);

            // Held in place, the position term stays bounded rather than
            // growing with the timed reference
            assert!(out.abs() < 1.0, "output {} grew while stalled", out);

            clock.sleep(CONTROL_PERIOD_S);
            ticks += 1;
            assert!(ticks < 10_000);
        }

        assert_eq!(follower.acceptance(), Acceptance::TimedOut);
        assert!((clock.now() - 1.5 * total).abs() < 2.0 * CONTROL_PERIOD_S);

        // Pushing backwards for a negative motion
        assert!(first_out.unwrap() < 0.0);
    }

    #[test]
    fn test_accel_feedforward_direction() {
        let clock = SimClock::new();
        let mut follower = ProfileFollower::new(&params(), Arc::new(clock.clone()));

        follower.start_profile(0.0, 1.0, None);
        assert!((follower.accel_feedforward(2.0) - 0.2).abs() < 1e-12);
        assert!((follower.accel_feedforward(-2.0) + 0.1).abs() < 1e-12);

        // Running backwards a negative acceleration is speeding up
        follower.start_profile(0.0, -1.0, None);
        assert!((follower.accel_feedforward(-2.0) + 0.2).abs() < 1e-12);
        assert!((follower.accel_feedforward(2.0) - 0.1).abs() < 1e-12);
    }
}
