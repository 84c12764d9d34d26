//! # Tracker task
//!
//! Runs [`Odometry::update`] periodically on a background thread. The odometry is owned by the
//! task, other threads read the pose through a [`PoseHandle`] and may overwrite it through the
//! task.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
};

// Internal
use super::Odometry;
use crate::hw::AbsolutePositionSensor;
use crate::pose::{Pose, PoseHandle};
use crate::units::Time;
use util::time::Clock;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TrackerTask {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    odom: Arc<Mutex<Odometry>>,
    pose: PoseHandle,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("The tracker period must be positive and finite, found {0}")]
    InvalidPeriod(f64),

    #[error("Could not start the tracker thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The tracker thread panicked")]
    ThreadPanicked,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrackerTask {
    /// Start tracking, updating the odometry every `period_s` from its parameters.
    pub fn start(odom: Odometry, clock: Arc<dyn Clock>) -> Result<Self, TrackerError> {
        let period = Time::from_s(odom.params().period_s);
        if !(period.as_s() > 0.0) || !period.is_finite() {
            return Err(TrackerError::InvalidPeriod(period.as_s()));
        }

        let pose = odom.pose_handle();

        // Create the data shared objects
        let bg_run = Arc::new(AtomicBool::new(true));
        let odom = Arc::new(Mutex::new(odom));

        // Create clones of these to pass to the bg thread
        let bg_run_clone = bg_run.clone();
        let odom_clone = odom.clone();

        // Start BG thread
        let bg_jh = thread::Builder::new()
            .name("odom_tracker".into())
            .spawn(move || bg_thread(odom_clone, bg_run_clone, clock, period))
            .map_err(TrackerError::SpawnError)?;

        info!("Tracker task started with a period of {} s", period.as_s());

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            odom,
            pose,
        })
    }

    /// Get a read-only handle to the tracked pose.
    pub fn pose_handle(&self) -> PoseHandle {
        self.pose.clone()
    }

    pub fn pose(&self) -> Pose {
        self.pose.get()
    }

    /// Overwrite the tracked pose.
    pub fn set_pose(&self, pose: Pose) {
        lock(&self.odom).set_pose(pose);
    }

    /// Reseed the tracked position from an absolute position sensor.
    pub fn reseed(&self, sensor: &dyn AbsolutePositionSensor) -> bool {
        lock(&self.odom).reseed(sensor)
    }

    /// True while the background thread is running.
    pub fn is_running(&self) -> bool {
        self.bg_jh.is_some()
    }

    /// Stop the background thread and wait for it to finish.
    pub fn stop(&mut self) -> Result<(), TrackerError> {
        self.bg_run.store(false, Ordering::Relaxed);

        match self.bg_jh.take() {
            Some(jh) => {
                jh.join().map_err(|_| TrackerError::ThreadPanicked)?;
                info!("Tracker task stopped");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for TrackerTask {
    fn drop(&mut self) {
        self.stop().ok();
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Background thread, updates the odometry once per period while instructed to run.
fn bg_thread(
    odom: Arc<Mutex<Odometry>>,
    run: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
    period: Time,
) {
    while run.load(Ordering::Relaxed) {
        let start = Time::from_s(clock.now());

        let pose = lock(&odom).update();
        trace!("Tracked pose: {:?}", pose);

        // Sleep out the remainder of the period
        let elapsed = Time::from_s(clock.now()) - start;
        clock.sleep((period - elapsed).as_s());
    }
}

/// A panic mid-update leaves the odometry usable, so poisoning is ignored.
fn lock(odom: &Mutex<Odometry>) -> MutexGuard<Odometry> {
    match odom.lock() {
        Ok(o) => o,
        Err(e) => e.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hw::Odometer;
    use crate::odom::{OdomParams, OdomSensors};
    use crate::units::Length;
    use util::time::SystemClock;

    struct Creeping;

    impl Odometer for Creeping {
        fn traveled(&mut self) -> Length {
            Length::from_m(0.001)
        }

        fn from_center(&self) -> Length {
            Length::from_m(0.0)
        }
    }

    #[test]
    fn test_tracker_runs_until_stopped() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let odom = Odometry::new(
            OdomSensors {
                forward: Some(Box::new(Creeping)),
                ..Default::default()
            },
            OdomParams::default(),
            Pose::default(),
            clock.clone(),
        );

        let mut task = TrackerTask::start(odom, clock.clone()).unwrap();
        let handle = task.pose_handle();
        assert!(task.is_running());

        clock.sleep(0.1);
        let moved = handle.get().x_m;
        assert!(moved > 0.0);

        task.stop().unwrap();
        assert!(!task.is_running());
        let stopped = handle.get().x_m;
        clock.sleep(0.05);
        assert_eq!(handle.get().x_m, stopped);

        // Overwriting still works on a stopped task
        task.set_pose(Pose::new(5.0, 0.0, 0.0));
        assert_eq!(task.pose().x_m, 5.0);
    }

    #[test]
    fn test_invalid_period() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let odom = Odometry::new(
            OdomSensors::default(),
            OdomParams { period_s: 0.0, ..Default::default() },
            Pose::default(),
            clock.clone(),
        );

        match TrackerTask::start(odom, clock) {
            Err(TrackerError::InvalidPeriod(p)) => assert_eq!(p, 0.0),
            _ => panic!("Expected an invalid period error"),
        }
    }
}
