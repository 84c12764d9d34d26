//! # Motion commands
//!
//! Closed loop commands which drive the robot to a target using the pose from the tracker:
//!
//! - turning on the spot to a heading, or to face (or face away from) a point,
//! - moving to a point in a straight line,
//! - following a generated path, either with a profile along its length steered by a look-ahead
//!   point, or with the RAMSETE tracking controller.
//!
//! All commands run on the caller's thread at [`CONTROL_PERIOD_S`] until they are done or their
//! [`CancelToken`] is cancelled. They finish by zeroing the drivetrain output and clearing the
//! token.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod move_to;
mod params;
mod path_follower;
mod ramsete;
mod turn;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use serde::Serialize;
use std::sync::Arc;

// Internal
pub use params::*;
pub use path_follower::*;
pub use ramsete::*;
use crate::accept::Acceptance;
use crate::cancel::CancelToken;
use crate::ctrl::{Controller, SlewRate};
use crate::hw::Drivetrain;
use crate::path::PathStore;
use crate::pose::PoseHandle;
use crate::profile::ProfileFollower;
use crate::CONTROL_PERIOD_S;
use util::time::Clock;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Runs motion commands on a drivetrain.
pub struct Follower {
    params: FollowParams,

    lateral: ProfileFollower,
    angular: ProfileFollower,
    heading: Box<dyn Controller>,
    left: Box<dyn Controller>,
    right: Box<dyn Controller>,

    /// Limits the change per tick of the path velocity reference
    velocity_ref: SlewRate,

    pose: PoseHandle,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    store: Option<PathStore>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How a motion command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// The target was reached
    Converged,

    /// The command ran out of time before reaching the target
    TimedOut,

    /// The command was cancelled
    Interrupted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Follower {
    /// Create a follower reading the pose from `pose`.
    pub fn new(params: &FollowParams, pose: PoseHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            params: *params,
            lateral: ProfileFollower::new(&params.lateral, clock.clone()),
            angular: ProfileFollower::new(&params.angular, clock.clone()),
            heading: params.heading_ctrl.build(),
            left: params.ramsete.wheel_ctrl.build(),
            right: params.ramsete.wheel_ctrl.build(),
            velocity_ref: SlewRate::symmetric(params.path.max_accel_mss * CONTROL_PERIOD_S, 0.0),
            pose,
            clock,
            cancel: CancelToken::new(),
            store: None,
        }
    }

    /// Load and save named paths in `store`.
    pub fn with_store(mut self, store: PathStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn params(&self) -> &FollowParams {
        &self.params
    }

    /// Token which interrupts the running command when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn wait_tick(&self) {
        self.clock.sleep(CONTROL_PERIOD_S);
    }

    /// End a command, stopping the drivetrain and clearing any cancellation.
    fn finish(&self, drive: &mut dyn Drivetrain, what: &str, outcome: Outcome) -> Outcome {
        drive.tank(0.0, 0.0);
        self.cancel.clear();

        info!("{} finished: {:?} at {:?}", what, outcome, self.pose.get());

        outcome
    }
}

impl Outcome {
    /// Combine the outcomes of consecutive commands, keeping the worst.
    pub fn and(self, other: Outcome) -> Outcome {
        match (self, other) {
            (Outcome::Interrupted, _) | (_, Outcome::Interrupted) => Outcome::Interrupted,
            (Outcome::TimedOut, _) | (_, Outcome::TimedOut) => Outcome::TimedOut,
            _ => Outcome::Converged,
        }
    }
}

impl From<Acceptance> for Outcome {
    fn from(a: Acceptance) -> Self {
        match a {
            Acceptance::Converged => Outcome::Converged,
            Acceptance::TimedOut | Acceptance::Pending => Outcome::TimedOut,
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::accept::AcceptParams;
    use crate::ctrl::PidParams;
    use crate::odom::{OdomParams, Odometry};
    use crate::path::PathParams;
    use crate::pose::Pose;
    use crate::profile::{FollowerParams, MotionConstraints, ProfileKind, ProfileParams};
    use crate::sim::{SimDrive, SimParams};
    use util::time::SimClock;

    /// Parameters tuned for the default simulated robot.
    pub(crate) fn sim_params() -> FollowParams {
        FollowParams {
            lateral: FollowerParams {
                profile: ProfileParams {
                    kind: ProfileKind::Trapezoidal,
                    constraints: MotionConstraints::new(1.2, 3.0, 0.0),
                },
                position_ctrl: PidParams::p(30.0).into(),
                velocity_ctrl: PidParams { ff: 6.67, ..PidParams::p(5.0) }.into(),
                k_accel: 0.33,
                k_decel: 0.33,
                timeout_scaling: 2.0,
                accept: AcceptParams::new(0.01).with_dwell(0.1),
            },
            angular: FollowerParams {
                profile: ProfileParams {
                    kind: ProfileKind::Trapezoidal,
                    constraints: MotionConstraints::new(4.0, 12.0, 0.0),
                },
                position_ctrl: PidParams::p(8.0).into(),
                velocity_ctrl: PidParams { ff: 1.0, ..PidParams::p(1.0) }.into(),
                k_accel: 0.05,
                k_decel: 0.05,
                timeout_scaling: 2.0,
                accept: AcceptParams::new(0.02).with_dwell(0.1),
            },
            heading_ctrl: PidParams::p(6.0).with_limit(6.0).into(),
            distance_to_switch_m: 0.15,
            lookahead_m: 0.25,
            path: PathParams {
                curviness_m: 1.0,
                max_vel_ms: 1.0,
                max_accel_mss: 2.0,
                track_width_m: 0.3,
                spacing_m: 0.0127,
                max_spacing_error_m: 0.00127,
                binary_search_scaling: 0.75,
            },
            ramsete: RamseteParams {
                beta: 2.0,
                zeta: 0.7,
                wheel_ctrl: PidParams { ff: 6.67, ..PidParams::p(5.0) }.into(),
                end_tolerance_m: 0.05,
                timeout_scaling: 2.0,
            },
        }
    }

    /// The simulated robot's parameters with jerk limited S-curve profiles.
    pub(crate) fn s_curve_params() -> FollowParams {
        let mut params = sim_params();
        params.lateral.profile = ProfileParams {
            kind: ProfileKind::SCurve,
            constraints: MotionConstraints::new(1.2, 3.0, 20.0),
        };
        params.angular.profile = ProfileParams {
            kind: ProfileKind::SCurve,
            constraints: MotionConstraints::new(4.0, 12.0, 80.0),
        };
        params
    }

    /// A simulated robot with odometry, and a follower driving it.
    pub(crate) fn sim_robot(start: Pose) -> (SimClock, SimDrive, Follower) {
        sim_robot_with(start, &sim_params())
    }

    pub(crate) fn sim_robot_with(start: Pose, params: &FollowParams) -> (SimClock, SimDrive, Follower) {
        let clock = SimClock::new();
        let drive = SimDrive::new(SimParams::default(), start, &clock);
        let odom = Odometry::new(
            drive.sensors(),
            OdomParams::default(),
            start,
            Arc::new(clock.clone()),
        );
        let pose = drive.track(odom, &clock);
        let follower = Follower::new(params, pose, Arc::new(clock.clone()));

        (clock, drive, follower)
    }

    #[test]
    fn test_outcome_and() {
        use Outcome::*;

        assert_eq!(Converged.and(Converged), Converged);
        assert_eq!(Converged.and(TimedOut), TimedOut);
        assert_eq!(TimedOut.and(Interrupted), Interrupted);
        assert_eq!(Outcome::from(Acceptance::Converged), Converged);
        assert_eq!(Outcome::from(Acceptance::TimedOut), TimedOut);
    }
}
