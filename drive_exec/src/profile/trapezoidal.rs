//! Trapezoidal motion profile

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error};

// Internal
use super::{MotionConstraints, MotionProfile, MotionStep, END_TIME_TOLERANCE_S};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Constant acceleration to a peak velocity, an optional cruise, then a
/// symmetric deceleration.
#[derive(Debug, Clone)]
pub struct TrapezoidalProfile {
    defaults: MotionConstraints,
    active: MotionConstraints,

    target: f64,

    /// Time spent accelerating, also the time spent decelerating
    accel_time_s: f64,

    cruise_time_s: f64,

    /// Unsigned velocity reached at the end of the acceleration
    peak_vel: f64,

    total_time_s: f64,

    /// Set once the first motion has been planned
    planned: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrapezoidalProfile {
    pub fn new(defaults: MotionConstraints) -> Self {
        Self {
            defaults,
            active: defaults,
            target: 0.0,
            accel_time_s: 0.0,
            cruise_time_s: 0.0,
            peak_vel: 0.0,
            total_time_s: 0.0,
            planned: false,
        }
    }

    /// Duration of the cruise phase of the current motion.
    pub fn cruise_time(&self) -> f64 {
        self.cruise_time_s
    }

    /// Unsigned peak velocity of the current motion.
    pub fn peak_velocity(&self) -> f64 {
        self.peak_vel
    }

    fn clear(&mut self) {
        self.target = 0.0;
        self.accel_time_s = 0.0;
        self.cruise_time_s = 0.0;
        self.peak_vel = 0.0;
        self.total_time_s = 0.0;
    }
}

impl MotionProfile for TrapezoidalProfile {
    fn set_parameters(&mut self, target: f64, special: Option<MotionConstraints>) {
        self.active = self.defaults.overridden_by(special);
        self.clear();
        self.planned = true;

        let v = self.active.max_vel;
        let a = self.active.max_accel;

        if !(v > 0.0 && a > 0.0) {
            error!(
                "Trapezoidal profile needs positive velocity and acceleration limits, got {:?}",
                self.active
            );
            return;
        }
        if target == 0.0 || !target.is_finite() {
            return;
        }

        self.target = target;
        let d = target.abs();

        // Distance covered getting up to max velocity and back down again
        let accel_decel_dist = v * v / a;

        if d > accel_decel_dist {
            self.peak_vel = v;
            self.cruise_time_s = (d - accel_decel_dist) / v;
        }
        else {
            self.peak_vel = (a * d).sqrt();
        }
        self.accel_time_s = self.peak_vel / a;
        self.total_time_s = 2.0 * self.accel_time_s + self.cruise_time_s;

        debug!(
            "Trapezoidal profile to {:.4}: peak velocity {:.4}, cruise {:.4} s, total {:.4} s",
            target, self.peak_vel, self.cruise_time_s, self.total_time_s
        );
    }

    fn sample(&self, t_s: f64) -> Option<MotionStep> {
        debug_assert!(self.planned, "Profile sampled before set_parameters");

        if t_s < 0.0 || t_s > self.total_time_s + END_TIME_TOLERANCE_S {
            return None;
        }
        let t_s = t_s.min(self.total_time_s);

        let a = self.active.max_accel;
        let accel_dist = 0.5 * self.peak_vel * self.accel_time_s;
        let decel_start_s = self.accel_time_s + self.cruise_time_s;

        let step = if t_s < self.accel_time_s {
            MotionStep::new(0.5 * a * t_s * t_s, a * t_s, a)
        }
        else if t_s < decel_start_s {
            MotionStep::new(
                accel_dist + self.peak_vel * (t_s - self.accel_time_s),
                self.peak_vel,
                0.0
            )
        }
        else {
            let td = t_s - decel_start_s;
            MotionStep::new(
                accel_dist + self.peak_vel * self.cruise_time_s
                    + self.peak_vel * td - 0.5 * a * td * td,
                self.peak_vel - a * td,
                if t_s < self.total_time_s { -a } else { 0.0 }
            )
        };

        Some(if self.target < 0.0 { step.negated() } else { step })
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

#[cfg(test)]
mod test {
    use super::*;

    /// Integrate the profile's velocity over its duration.
    fn integrate_distance(profile: &dyn MotionProfile) -> f64 {
        let n = 20_000;
        let dt = profile.total_time() / n as f64;
        let mut dist = 0.0;
        for i in 0..n {
            let v0 = profile.sample(i as f64 * dt).unwrap().velocity;
            let v1 = profile.sample((i + 1) as f64 * dt).unwrap().velocity;
            dist += 0.5 * (v0 + v1) * dt;
        }
        dist
    }

    #[test]
    fn test_cruise() {
        let mut profile = TrapezoidalProfile::new(MotionConstraints::new(1.0, 2.0, 0.0));
        profile.set_parameters(3.0, None);

        // 0.5 s up, 2.5 s cruise, 0.5 s down
        assert!((profile.peak_velocity() - 1.0).abs() < 1e-12);
        assert!((profile.cruise_time() - 2.5).abs() < 1e-12);
        assert!((profile.total_time() - 3.5).abs() < 1e-12);

        assert!((integrate_distance(&profile) - 3.0).abs() < 1e-6);

        let end = profile.sample(profile.total_time()).unwrap();
        assert!((end.position - 3.0).abs() < 1e-12);
        assert!(end.velocity.abs() < 1e-12);
        assert_eq!(end.acceleration, 0.0);
    }

    #[test]
    fn test_no_cruise() {
        let mut profile = TrapezoidalProfile::new(MotionConstraints::new(1.0, 2.0, 0.0));
        profile.set_parameters(0.25, None);

        assert_eq!(profile.cruise_time(), 0.0);
        assert!(profile.peak_velocity() < 1.0);
        assert!((profile.peak_velocity() - 0.5f64.sqrt()).abs() < 1e-12);
        assert!((integrate_distance(&profile) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_negative_and_special() {
        let mut profile = TrapezoidalProfile::new(MotionConstraints::new(1.0, 2.0, 0.0));
        profile.set_parameters(2.0, None);
        let forward: Vec<MotionStep> = (0..25)
            .map(|i| profile.sample(i as f64 * 0.1).unwrap())
            .collect();
        let total = profile.total_time();

        profile.set_parameters(-2.0, None);
        assert_eq!(profile.total_time(), total);
        for (i, f) in forward.iter().enumerate() {
            let r = profile.sample(i as f64 * 0.1).unwrap();
            assert_eq!(r.position, -f.position);
            assert_eq!(r.velocity, -f.velocity);
        }

        // Halving the velocity limit for one motion only
        profile.set_parameters(2.0, Some(MotionConstraints::new(0.5, 0.0, 0.0)));
        assert!((profile.peak_velocity() - 0.5).abs() < 1e-12);
        profile.set_parameters(2.0, None);
        assert!((profile.peak_velocity() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_and_out_of_range() {
        let mut profile = TrapezoidalProfile::new(MotionConstraints::new(1.0, 2.0, 0.0));
        profile.set_parameters(0.0, None);

        assert_eq!(profile.total_time(), 0.0);
        assert_eq!(profile.sample(0.0), Some(MotionStep::default()));
        assert_eq!(profile.sample(0.1), None);

        profile.set_parameters(1.0, None);
        assert_eq!(profile.sample(-0.1), None);
        assert_eq!(profile.sample(profile.total_time() + 0.1), None);
    }
}
