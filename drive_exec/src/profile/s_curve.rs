//! Jerk limited (S-curve) motion profile
//!
//! A full S-curve has seven phases:
//!
//! | Phase | Jerk | Duration         |
//! |-------|------|------------------|
//! | 0     | +J   | jerk time        |
//! | 1     | 0    | const accel time |
//! | 2     | -J   | jerk time        |
//! | 3     | 0    | cruise time      |
//! | 4     | -J   | jerk time        |
//! | 5     | 0    | const accel time |
//! | 6     | +J   | jerk time        |
//!
//! Short motions drop phases. Which phases survive depends on whether the acceleration limit can
//! be reached before the velocity limit, and on whether the distance is long enough to reach
//! either limit at all, giving the four [`Regime`]s. [`plan`] picks the regime and the phase
//! durations in closed form, the profile then integrates the jerk analytically across the phases.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error};
use serde::Serialize;

// Internal
use super::{MotionConstraints, MotionProfile, MotionStep, END_TIME_TOLERANCE_S};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of phases in a full S-curve.
pub const NUM_PHASES: usize = 7;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Phase durations of an S-curve, the output of [`plan`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SCurvePlan {
    pub regime: Regime,

    /// Duration of each of the four jerk phases
    pub jerk_time_s: f64,

    /// Duration of each of the two constant acceleration phases
    pub const_accel_time_s: f64,

    /// Duration of the constant velocity phase
    pub cruise_time_s: f64,
}

/// A phase of constant jerk.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Phase {
    /// Time since the start of the profile at which this phase starts
    pub start_time_s: f64,

    pub duration_s: f64,

    pub jerk: f64,

    /// State at the start of the phase
    pub start: MotionStep,
}

/// Jerk limited motion profile.
#[derive(Debug, Clone)]
pub struct SCurveProfile {
    defaults: MotionConstraints,
    active: MotionConstraints,

    target: f64,

    plan: Option<SCurvePlan>,

    phases: [Phase; NUM_PHASES],

    total_time_s: f64,

    /// Set once the first motion has been planned
    planned: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The set of phases an S-curve motion uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Regime {
    /// Too short to reach either limit, jerk phases only
    FourStage,

    /// The velocity limit is reached before the acceleration limit, no constant acceleration
    FiveStage,

    /// The acceleration limit is reached but the motion is too short to cruise
    SixStage,

    /// Both limits reached
    SevenStage,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SCurvePlan {
    /// Durations of the seven phases in order.
    pub fn durations(&self) -> [f64; NUM_PHASES] {
        let tj = self.jerk_time_s;
        let tc = self.const_accel_time_s;
        [tj, tc, tj, self.cruise_time_s, tj, tc, tj]
    }

    pub fn total_time(&self) -> f64 {
        4.0 * self.jerk_time_s + 2.0 * self.const_accel_time_s + self.cruise_time_s
    }
}

impl SCurveProfile {
    pub fn new(defaults: MotionConstraints) -> Self {
        Self {
            defaults,
            active: defaults,
            target: 0.0,
            plan: None,
            phases: [Phase::default(); NUM_PHASES],
            total_time_s: 0.0,
            planned: false,
        }
    }

    /// The plan of the current motion, `None` if there is no motion.
    pub fn plan(&self) -> Option<&SCurvePlan> {
        self.plan.as_ref()
    }

    pub fn phases(&self) -> &[Phase; NUM_PHASES] {
        &self.phases
    }

    fn clear(&mut self) {
        self.target = 0.0;
        self.plan = None;
        self.phases = [Phase::default(); NUM_PHASES];
        self.total_time_s = 0.0;
    }
}

impl MotionProfile for SCurveProfile {
    fn set_parameters(&mut self, target: f64, special: Option<MotionConstraints>) {
        self.active = self.defaults.overridden_by(special);
        self.clear();
        self.planned = true;

        if !(self.active.max_vel > 0.0 && self.active.max_accel > 0.0 && self.active.max_jerk > 0.0) {
            error!(
                "S-curve profile needs positive velocity, acceleration and jerk limits, got {:?}",
                self.active
            );
            return;
        }
        if target == 0.0 || !target.is_finite() {
            return;
        }

        let plan = plan(target.abs(), &self.active);
        let sign = target.signum();
        let jerk = sign * self.active.max_jerk;
        let jerks = [jerk, 0.0, -jerk, 0.0, -jerk, 0.0, jerk];

        // Integrate through the phases from rest. Since the jerk already carries the sign of the
        // target every boundary state comes out mirrored for a negative target.
        let mut state = MotionStep::default();
        let mut time_s = 0.0;
        for (i, duration_s) in plan.durations().iter().enumerate() {
            self.phases[i] = Phase {
                start_time_s: time_s,
                duration_s: *duration_s,
                jerk: jerks[i],
                start: state,
            };
            state = state.integrate(jerks[i], *duration_s);
            time_s += duration_s;
        }

        self.target = target;
        self.total_time_s = time_s;
        self.plan = Some(plan);

        debug!(
            "S-curve profile to {:.4}: {:?}, total {:.4} s, end error {:.2e}",
            target, plan.regime, time_s, state.position - target
        );
    }

    fn sample(&self, t_s: f64) -> Option<MotionStep> {
        debug_assert!(self.planned, "Profile sampled before set_parameters");

        if t_s < 0.0 || t_s > self.total_time_s + END_TIME_TOLERANCE_S {
            return None;
        }

        if self.plan.is_none() {
            return Some(MotionStep::default());
        }

        // The end is reported exactly rather than through the integration, so followers
        // converge on the target itself
        if t_s >= self.total_time_s {
            return Some(MotionStep::new(self.target, 0.0, 0.0));
        }

        let phase = self.phases
            .iter()
            .rev()
            .find(|p| p.duration_s > 0.0 && p.start_time_s <= t_s)
            .unwrap_or(&self.phases[0]);

        Some(phase.start.integrate(phase.jerk, t_s - phase.start_time_s))
    }

    fn total_time(&self) -> f64 {
        self.total_time_s
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn constraints(&self) -> MotionConstraints {
        self.active
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Plan an S-curve over the unsigned `distance`.
///
/// All constraints must be positive.
pub fn plan(distance: f64, constraints: &MotionConstraints) -> SCurvePlan {
    let j = constraints.max_jerk;
    let a = constraints.max_accel;
    let v = constraints.max_vel;
    let d = distance.abs();

    // Velocity gained by ramping the acceleration up to the limit and back
    // down again. If this is below the velocity limit the acceleration limit
    // is reachable.
    let reaches_max_accel = a * a / j < v;

    let jerk_time_s = if reaches_max_accel { a / j } else { (v / j).sqrt() };

    // Distance covered by the four jerk phases alone
    let jerk_distance = 2.0 * j * jerk_time_s.powi(3);

    if d < jerk_distance {
        return SCurvePlan {
            regime: Regime::FourStage,
            jerk_time_s: (d / (2.0 * j)).cbrt(),
            const_accel_time_s: 0.0,
            cruise_time_s: 0.0,
        };
    }

    if !reaches_max_accel {
        return SCurvePlan {
            regime: Regime::FiveStage,
            jerk_time_s,
            const_accel_time_s: 0.0,
            cruise_time_s: (d - jerk_distance) / v,
        };
    }

    // Constant acceleration needed to reach the velocity limit, and the
    // distance covered getting there and back down again
    let full_const_accel_time_s = (v - a * a / j) / a;
    let full_distance = accel_decel_distance(a, j, full_const_accel_time_s);

    if d < full_distance {
        // Solve accel_decel_distance(tc) = d for tc
        let qa = a;
        let qb = 3.0 * a * a / j;
        let qc = 2.0 * a.powi(3) / (j * j) - d;
        let disc = (qb * qb - 4.0 * qa * qc).max(0.0);
        let const_accel_time_s = ((-qb + disc.sqrt()) / (2.0 * qa)).max(0.0);

        return SCurvePlan {
            regime: Regime::SixStage,
            jerk_time_s,
            const_accel_time_s,
            cruise_time_s: 0.0,
        };
    }

    SCurvePlan {
        regime: Regime::SevenStage,
        jerk_time_s,
        const_accel_time_s: full_const_accel_time_s,
        cruise_time_s: (d - full_distance) / v,
    }
}

/// Distance covered accelerating from rest to a peak and decelerating back to rest, with the
/// acceleration limit held for `const_accel_time_s` in each half.
fn accel_decel_distance(a: f64, j: f64, const_accel_time_s: f64) -> f64 {
    let tc = const_accel_time_s;
    2.0 * a.powi(3) / (j * j) + 3.0 * a * a * tc / j + a * tc * tc
}
