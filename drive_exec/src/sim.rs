//! # Simulation
//!
//! A differential drive robot simulated on a [`SimClock`], used by the tests and the demo
//! executable.
//!
//! Each side's wheel speed follows its voltage demand with a first order lag. Every time the clock
//! advances the robot is moved along the arc given by its wheel speeds, and the simulated tracking
//! wheels and heading sensor accumulate what a real robot's sensors would have measured.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};

// Internal
use crate::hw::{DriveGeometry, Drivetrain, HeadingSensor, Odometer};
use crate::odom::{OdomSensors, Odometry};
use crate::pose::{Pose, PoseHandle};
use crate::units::{Angle, Length};
use util::time::SimClock;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated robot.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub geometry: DriveGeometry,

    /// Steady state motor speed per volt of demand
    pub rpm_per_volt: f64,

    /// Time constant of the wheel speed response
    pub time_constant_s: f64,

    /// Demands are clamped to this voltage
    pub max_voltage_v: f64,

    /// Offset of the forward tracking wheel to the left of the centre
    pub forward_offset_m: f64,

    /// Offset of the side tracking wheel behind the centre
    pub side_offset_m: f64,
}

/// Handle to a simulated drivetrain. Clones drive the same robot.
#[derive(Clone)]
pub struct SimDrive {
    plant: Arc<Mutex<Plant>>,
}

/// A simulated tracking wheel.
pub struct SimOdometer {
    plant: Arc<Mutex<Plant>>,
    wheel: Wheel,
}

/// A simulated heading sensor.
pub struct SimHeading {
    plant: Arc<Mutex<Plant>>,
}

struct Plant {
    params: SimParams,

    /// True pose of the robot
    pose: Pose,

    left_ms: f64,
    right_ms: f64,
    left_demand_v: f64,
    right_demand_v: f64,
    braked: bool,

    // Sensor accumulators, emptied when read
    forward_travel_m: f64,
    side_travel_m: f64,
    heading_delta_rad: f64,
    drive_travel_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wheel {
    Forward,
    Side,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            geometry: DriveGeometry {
                track_width_m: 0.3,
                wheel_circumference_m: 0.32,
                gear_ratio: 1.0,
            },
            rpm_per_volt: 28.125,
            time_constant_s: 0.05,
            max_voltage_v: 12.0,
            forward_offset_m: 0.05,
            side_offset_m: 0.08,
        }
    }
}

impl SimDrive {
    /// Create a robot at `initial` which moves whenever `clock` advances.
    pub fn new(params: SimParams, initial: Pose, clock: &SimClock) -> Self {
        let plant = Arc::new(Mutex::new(Plant {
            params,
            pose: initial,
            left_ms: 0.0,
            right_ms: 0.0,
            left_demand_v: 0.0,
            right_demand_v: 0.0,
            braked: false,
            forward_travel_m: 0.0,
            side_travel_m: 0.0,
            heading_delta_rad: 0.0,
            drive_travel_m: 0.0,
        }));

        let plant_clone = plant.clone();
        clock.on_advance(Box::new(move |dt_s, _| lock(&plant_clone).step(dt_s)));

        Self { plant }
    }

    /// Sensors of this robot, ready to hand to [`Odometry::new`].
    pub fn sensors(&self) -> OdomSensors {
        OdomSensors {
            forward: Some(Box::new(SimOdometer {
                plant: self.plant.clone(),
                wheel: Wheel::Forward,
            })),
            side: Some(Box::new(SimOdometer {
                plant: self.plant.clone(),
                wheel: Wheel::Side,
            })),
            heading: Some(Box::new(SimHeading {
                plant: self.plant.clone(),
            })),
            drive: Some(Box::new(self.clone())),
        }
    }

    /// Run `odom` every time `clock` advances, after the robot has moved.
    pub fn track(&self, odom: Odometry, clock: &SimClock) -> PoseHandle {
        let handle = odom.pose_handle();
        let mut odom = odom;
        clock.on_advance(Box::new(move |_, _| {
            odom.update();
        }));
        handle
    }

    /// The robot's actual pose.
    pub fn true_pose(&self) -> Pose {
        lock(&self.plant).pose
    }

    /// Last (left, right) demand.
    pub fn demands(&self) -> (f64, f64) {
        let p = lock(&self.plant);
        (p.left_demand_v, p.right_demand_v)
    }
}

impl Drivetrain for SimDrive {
    fn tank(&mut self, left_v: f64, right_v: f64) {
        let mut p = lock(&self.plant);
        let max = p.params.max_voltage_v;
        p.left_demand_v = left_v.max(-max).min(max);
        p.right_demand_v = right_v.max(-max).min(max);
        p.braked = false;
    }

    fn brake(&mut self) {
        let mut p = lock(&self.plant);
        p.left_demand_v = 0.0;
        p.right_demand_v = 0.0;
        p.braked = true;
    }

    fn wheel_velocities(&self) -> (f64, f64) {
        let p = lock(&self.plant);
        (p.left_ms, p.right_ms)
    }

    fn geometry(&self) -> DriveGeometry {
        lock(&self.plant).params.geometry
    }

    fn traveled(&mut self) -> Option<Length> {
        let mut p = lock(&self.plant);
        let traveled = Length::from_m(p.drive_travel_m);
        p.drive_travel_m = 0.0;
        Some(traveled)
    }
}

impl Odometer for SimOdometer {
    fn traveled(&mut self) -> Length {
        let mut p = lock(&self.plant);
        let traveled = match self.wheel {
            Wheel::Forward => std::mem::take(&mut p.forward_travel_m),
            Wheel::Side => std::mem::take(&mut p.side_travel_m),
        };
        Length::from_m(traveled)
    }

    fn from_center(&self) -> Length {
        let p = lock(&self.plant);
        match self.wheel {
            Wheel::Forward => Length::from_m(p.params.forward_offset_m),
            Wheel::Side => Length::from_m(p.params.side_offset_m),
        }
    }
}

impl HeadingSensor for SimHeading {
    fn heading_delta(&mut self) -> Angle {
        Angle::from_rad(std::mem::take(&mut lock(&self.plant).heading_delta_rad))
    }
}

impl Plant {
    fn step(&mut self, dt_s: f64) {
        // First order response towards the demanded speed, braking stops three times faster
        let tau = if self.braked {
            self.params.time_constant_s / 3.0
        }
        else {
            self.params.time_constant_s
        };
        let alpha = dt_s / (tau + dt_s);

        let geometry = &self.params.geometry;
        let left_target = geometry.rpm_to_ms(self.left_demand_v * self.params.rpm_per_volt);
        let right_target = geometry.rpm_to_ms(self.right_demand_v * self.params.rpm_per_volt);
        self.left_ms += alpha * (left_target - self.left_ms);
        self.right_ms += alpha * (right_target - self.right_ms);

        let v = 0.5 * (self.left_ms + self.right_ms);
        let w = (self.right_ms - self.left_ms) / self.params.geometry.track_width_m;
        let dh = w * dt_s;

        // Move along the arc
        let h = self.pose.heading_rad;
        if dh.abs() > 1e-12 {
            let r = v / w;
            self.pose.x_m += r * ((h + dh).sin() - h.sin());
            self.pose.y_m -= r * ((h + dh).cos() - h.cos());
        }
        else {
            self.pose.x_m += v * dt_s * h.cos();
            self.pose.y_m += v * dt_s * h.sin();
        }
        self.pose.heading_rad += dh;
        self.pose.lin_vel_ms = v;
        self.pose.ang_vel_rads = w;

        // What the sensors see
        self.forward_travel_m += v * dt_s - self.params.forward_offset_m * dh;
        self.side_travel_m -= self.params.side_offset_m * dh;
        self.heading_delta_rad += dh;
        self.drive_travel_m += v * dt_s;

        trace!(
            "Sim: pose ({:.4}, {:.4}, {:.4}), wheels ({:.3}, {:.3})",
            self.pose.x_m, self.pose.y_m, self.pose.heading_rad, self.left_ms, self.right_ms
        );
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn lock(plant: &Mutex<Plant>) -> MutexGuard<Plant> {
    match plant.lock() {
        Ok(p) => p,
        Err(e) => e.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::odom::OdomParams;
    use util::time::Clock;

    #[test]
    fn test_straight_response() {
        let clock = SimClock::new();
        let mut drive = SimDrive::new(SimParams::default(), Pose::default(), &clock);

        drive.tank(6.0, 6.0);
        for _ in 0..100 {
            clock.sleep(0.01);
        }

        // Settled at the steady state speed after many time constants
        assert!((drive.linear_velocity() - 0.9).abs() < 1e-3);
        assert!(drive.angular_velocity().abs() < 1e-12);

        let pose = drive.true_pose();
        assert!(pose.x_m > 0.8 && pose.x_m < 0.9);
        assert_eq!(pose.y_m, 0.0);

        // Demands are clamped
        drive.tank(100.0, -100.0);
        assert_eq!(drive.demands(), (12.0, -12.0));

        drive.brake();
        for _ in 0..50 {
            clock.sleep(0.01);
        }
        assert!(drive.linear_velocity().abs() < 1e-3);
    }

    #[test]
    fn test_geared_response() {
        let clock = SimClock::new();
        let mut params = SimParams::default();
        params.geometry.gear_ratio = 0.5;
        let mut drive = SimDrive::new(params, Pose::default(), &clock);

        drive.tank(6.0, 6.0);
        for _ in 0..100 {
            clock.sleep(0.01);
        }

        // Half the wheel speed of the direct drive
        assert!((drive.linear_velocity() - 0.45).abs() < 1e-3);
    }

    #[test]
    fn test_odometry_follows_true_pose() {
        let clock = SimClock::new();
        let mut drive = SimDrive::new(SimParams::default(), Pose::new(1.0, -1.0, 0.5), &clock);

        let odom = Odometry::new(
            drive.sensors(),
            OdomParams { drive_cross_check: true, ..Default::default() },
            Pose::new(1.0, -1.0, 0.5),
            Arc::new(clock.clone()),
        );
        let handle = drive.track(odom, &clock);

        // A curve to the left then a tighter one to the right
        drive.tank(4.0, 8.0);
        for _ in 0..150 {
            clock.sleep(0.01);
        }
        drive.tank(9.0, 2.0);
        for _ in 0..150 {
            clock.sleep(0.01);
        }

        let truth = drive.true_pose();
        let tracked = handle.get();
        assert!((truth.heading_rad - 0.5).abs() > 1.0);
        assert!(tracked.distance(&truth) < 1e-3, "{:?} vs {:?}", tracked, truth);
        assert!((tracked.heading_rad - truth.heading_rad).abs() < 1e-9);
        assert!((tracked.ang_vel_rads - truth.ang_vel_rads).abs() < 1e-6);
    }
}
