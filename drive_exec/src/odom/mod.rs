//! # Odometry
//!
//! Dead reckoning from a forward and a side tracking wheel plus a heading sensor.
//!
//! Each update reads how far the wheels have rolled and how far the robot has turned since the
//! previous update. The wheel readings are corrected for the rotation that happened over the
//! interval, so that a robot driving an arc is integrated along the arc instead of along the
//! tangent at its start. The displacement is then rotated into the field frame using the heading
//! from before the update.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod gps;
mod params;
mod tracker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, trace, warn};
use std::sync::Arc;

// Internal
pub use gps::*;
pub use params::*;
pub use tracker::*;
use crate::hw::{Drivetrain, HeadingSensor, Odometer};
use crate::pose::{Pose, PoseHandle, PoseStore};
use util::time::Clock;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The sensors used for odometry. Any of them may be missing, in which case their contribution is
/// zero.
#[derive(Default)]
pub struct OdomSensors {
    pub forward: Option<Box<dyn Odometer>>,
    pub side: Option<Box<dyn Odometer>>,
    pub heading: Option<Box<dyn HeadingSensor>>,

    /// Used for the forward cross-check when enabled
    pub drive: Option<Box<dyn Drivetrain + Send>>,
}

/// Raw sensor readings over one update interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OdomReading {
    pub forward_m: f64,
    pub forward_offset_m: f64,
    pub side_m: f64,
    pub side_offset_m: f64,
    pub heading_delta_rad: f64,

    /// Forward travel measured by the drivetrain, when cross-checking
    pub drive_m: Option<f64>,
}

/// Displacement of the robot's centre over one interval, in the body frame at the start of it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Displacement {
    pub forward_m: f64,
    pub left_m: f64,
    pub heading_rad: f64,
}

/// Pose tracker fusing wheel and heading sensors.
pub struct Odometry {
    sensors: OdomSensors,
    params: OdomParams,
    store: PoseStore,
    clock: Arc<dyn Clock>,
    last_update_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    /// Create a new tracker starting from `initial`.
    ///
    /// Missing sensors are reported here once, after which they silently contribute nothing.
    pub fn new(
        sensors: OdomSensors,
        params: OdomParams,
        initial: Pose,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if sensors.forward.is_none() {
            error!("The forward odometer must be provided, forward travel will not be tracked");
        }
        if sensors.side.is_none() {
            error!("The side odometer was not provided, sideways travel will not be tracked");
        }
        if sensors.heading.is_none() {
            error!("A heading sensor must be provided, rotation will not be tracked");
        }

        let mut params = params;
        if params.drive_cross_check && sensors.drive.is_none() {
            error!("Drive cross-check is enabled but no drivetrain was provided, disabling it");
            params.drive_cross_check = false;
        }

        info!("Odometry initialised at {:?}", initial);

        Self {
            sensors,
            params,
            store: PoseStore::new(initial),
            last_update_s: clock.now(),
            clock,
        }
    }

    pub fn params(&self) -> &OdomParams {
        &self.params
    }

    /// Latest pose estimate.
    pub fn pose(&self) -> Pose {
        self.store.get()
    }

    /// Get a read-only handle to the pose estimate.
    pub fn pose_handle(&self) -> PoseHandle {
        self.store.handle()
    }

    /// Overwrite the pose estimate, e.g. at the start of a routine.
    pub fn set_pose(&mut self, pose: Pose) {
        info!("Odometry pose set to {:?}", pose);
        self.store.set(pose);
    }

    /// Read the sensors and integrate the new pose.
    pub fn update(&mut self) -> Pose {
        let reading = self.read_sensors();
        let displacement = body_displacement(&reading);

        let now_s = self.clock.now();
        let dt_s = now_s - self.last_update_s;
        self.last_update_s = now_s;

        let pose = integrate(&self.store.get(), &displacement, dt_s);
        self.store.set(pose);

        trace!(
            "Odometry: reading {:?}, pose ({:.4}, {:.4}, {:.4})",
            reading, pose.x_m, pose.y_m, pose.heading_rad
        );

        pose
    }

    fn read_sensors(&mut self) -> OdomReading {
        let mut reading = OdomReading::default();

        if let Some(ref mut f) = self.sensors.forward {
            reading.forward_m = f.traveled().as_m();
            reading.forward_offset_m = f.from_center().as_m();
        }

        if let Some(ref mut s) = self.sensors.side {
            reading.side_m = s.traveled().as_m();
            reading.side_offset_m = s.from_center().as_m();
        }

        if let Some(ref mut h) = self.sensors.heading {
            reading.heading_delta_rad = h.heading_delta().as_rad();
        }

        if self.params.drive_cross_check {
            if let Some(ref mut d) = self.sensors.drive {
                reading.drive_m = d.traveled().map(|l| l.as_m());
            }
        }

        reading
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Turn raw sensor readings into the displacement of the robot's centre.
///
/// Non-finite readings are treated as a sensor fault and give no displacement.
pub fn body_displacement(reading: &OdomReading) -> Displacement {
    let dh = reading.heading_delta_rad;

    let mut forward = reading.forward_m;
    let mut left = reading.side_m;

    // Limits as dh goes to zero
    let mut sin_over_dh = 1.0;
    let mut cos_minus_one_over_dh = 0.0;

    if dh != 0.0 {
        // Chord travelled by the centre, from the arc travelled by each wheel
        let chord = 2.0 * (dh / 2.0).sin();
        forward = chord * (forward / dh + reading.forward_offset_m);
        left = chord * (left / dh + reading.side_offset_m);

        sin_over_dh = dh.sin() / dh;
        cos_minus_one_over_dh = (dh.cos() - 1.0) / dh;
    }

    if let Some(drive_m) = reading.drive_m {
        let drive_forward = if dh != 0.0 {
            2.0 * (dh / 2.0).sin() * (drive_m / dh)
        }
        else {
            drive_m
        };
        forward = 0.5 * (forward + drive_forward);
    }

    let displacement = Displacement {
        forward_m: sin_over_dh * forward + cos_minus_one_over_dh * left,
        left_m: -cos_minus_one_over_dh * forward + sin_over_dh * left,
        heading_rad: dh,
    };

    if !displacement.forward_m.is_finite()
        || !displacement.left_m.is_finite()
        || !displacement.heading_rad.is_finite()
    {
        warn!("Invalid values read from the odometry sensors: {:?}", reading);
        return Displacement::default();
    }

    displacement
}

/// Apply a body frame displacement to a pose.
///
/// The displacement is rotated by the heading before the update. Velocities are only updated when
/// time has passed.
pub fn integrate(pose: &Pose, displacement: &Displacement, dt_s: f64) -> Pose {
    let (sin_h, cos_h) = pose.heading_rad.sin_cos();

    let mut next = *pose;
    next.x_m += cos_h * displacement.forward_m - sin_h * displacement.left_m;
    next.y_m += sin_h * displacement.forward_m + cos_h * displacement.left_m;
    next.heading_rad += displacement.heading_rad;

    if dt_s > 0.0 {
        next.lin_vel_ms = displacement.forward_m / dt_s;
        next.ang_vel_rads = displacement.heading_rad / dt_s;
    }

    next
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::units::{Angle, Length};
    use std::f64::consts::PI;
    use util::time::SimClock;

    struct FixedOdometer {
        per_update_m: f64,
        offset_m: f64,
    }

    impl Odometer for FixedOdometer {
        fn traveled(&mut self) -> Length {
            Length::from_m(self.per_update_m)
        }

        fn from_center(&self) -> Length {
            Length::from_m(self.offset_m)
        }
    }

    struct FixedHeading(f64);

    impl HeadingSensor for FixedHeading {
        fn heading_delta(&mut self) -> Angle {
            Angle::from_rad(self.0)
        }
    }

    #[test]
    fn test_straight_translation() {
        let d = body_displacement(&OdomReading {
            forward_m: 0.5,
            side_m: 0.1,
            ..Default::default()
        });
        assert_eq!(d, Displacement { forward_m: 0.5, left_m: 0.1, heading_rad: 0.0 });

        // Along the heading
        let pose = integrate(&Pose::new(1.0, 1.0, PI / 2.0), &d, 0.0);
        assert!((pose.x_m - 0.9).abs() < 1e-12);
        assert!((pose.y_m - 1.5).abs() < 1e-12);
        assert_eq!(pose.heading_rad, PI / 2.0);
    }

    #[test]
    fn test_turn_on_the_spot() {
        // The forward wheel is left of centre, so it rolls backwards when turning left
        let dh = PI / 2.0;
        let d = body_displacement(&OdomReading {
            forward_m: -0.1 * dh,
            forward_offset_m: 0.1,
            side_m: -0.05 * dh,
            side_offset_m: 0.05,
            heading_delta_rad: dh,
            drive_m: None,
        });

        assert!(d.forward_m.abs() < 1e-12);
        assert!(d.left_m.abs() < 1e-12);
        assert_eq!(d.heading_rad, dh);
    }

    #[test]
    fn test_arc() {
        // Driving a circle of radius 2 m, one tick at a time
        let radius = 2.0;
        let dh = 0.01;
        let d = body_displacement(&OdomReading {
            forward_m: radius * dh,
            heading_delta_rad: dh,
            ..Default::default()
        });

        assert!((d.forward_m - radius * dh.sin()).abs() < 1e-6);
        assert!((d.left_m - radius * (1.0 - dh.cos())).abs() < 1e-8);

        // A quarter circle ends up at (2, 2) facing +Y
        let mut pose = Pose::default();
        let ticks = (PI / 2.0 / dh).round() as usize;
        let step = PI / 2.0 / ticks as f64;
        let d = body_displacement(&OdomReading {
            forward_m: radius * step,
            heading_delta_rad: step,
            ..Default::default()
        });
        for _ in 0..ticks {
            pose = integrate(&pose, &d, 0.01);
        }
        assert!((pose.x_m - radius).abs() < 1e-4);
        assert!((pose.y_m - radius).abs() < 1e-4);
        assert!((pose.heading_rad - PI / 2.0).abs() < 1e-9);
        assert!((pose.lin_vel_ms - d.forward_m / 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_sensor_fault() {
        let d = body_displacement(&OdomReading {
            forward_m: f64::NAN,
            heading_delta_rad: 0.1,
            ..Default::default()
        });
        assert_eq!(d, Displacement::default());

        let d = body_displacement(&OdomReading {
            forward_m: 0.1,
            heading_delta_rad: f64::INFINITY,
            ..Default::default()
        });
        assert_eq!(d, Displacement::default());
    }

    #[test]
    fn test_drive_cross_check() {
        let d = body_displacement(&OdomReading {
            forward_m: 1.0,
            drive_m: Some(0.8),
            ..Default::default()
        });
        assert!((d.forward_m - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_update_with_missing_sensors() {
        let clock = SimClock::new();
        let sensors = OdomSensors {
            forward: Some(Box::new(FixedOdometer { per_update_m: 0.01, offset_m: 0.0 })),
            ..Default::default()
        };
        let mut odom = Odometry::new(
            sensors,
            OdomParams { drive_cross_check: true, ..Default::default() },
            Pose::new(0.0, 0.0, PI),
            Arc::new(clock.clone()),
        );

        // No drivetrain, so the cross-check is turned off
        assert!(!odom.params().drive_cross_check);

        let handle = odom.pose_handle();
        for _ in 0..10 {
            clock.advance(0.01);
            odom.update();
        }

        let pose = handle.get();
        assert!((pose.x_m + 0.1).abs() < 1e-9);
        assert!(pose.y_m.abs() < 1e-9);
        assert_eq!(pose.heading_rad, PI);
        assert!((pose.lin_vel_ms - 1.0).abs() < 1e-9);
        assert_eq!(pose.ang_vel_rads, 0.0);
    }

    #[test]
    fn test_update_turning() {
        let clock = SimClock::new();
        let sensors = OdomSensors {
            forward: Some(Box::new(FixedOdometer { per_update_m: 0.0, offset_m: 0.0 })),
            side: Some(Box::new(FixedOdometer { per_update_m: 0.0, offset_m: 0.0 })),
            heading: Some(Box::new(FixedHeading(0.02))),
            drive: None,
        };
        let mut odom = Odometry::new(
            sensors,
            OdomParams::default(),
            Pose::default(),
            Arc::new(clock.clone()),
        );

        clock.advance(0.01);
        let pose = odom.update();
        assert_eq!(pose.x_m, 0.0);
        assert_eq!(pose.y_m, 0.0);
        assert!((pose.heading_rad - 0.02).abs() < 1e-12);
        assert!((pose.ang_vel_rads - 2.0).abs() < 1e-9);

        odom.set_pose(Pose::new(3.0, 4.0, 0.0));
        assert_eq!(odom.pose().x_m, 3.0);
    }
}
