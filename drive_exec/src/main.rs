//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable runs a routine of motion commands against the simulated robot:
//!
//!     - Initialise the session and logging
//!     - Load the parameters and the routine
//!     - Build the simulated drivetrain, the odometry tracking it, and the follower
//!     - Run the routine's commands in order
//!     - Save the outcome and the trajectory driven to the session directory
//!
//! The routine is loaded from the path given as the only argument, or from
//! `params/routine.toml` if there are no arguments.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::{Arc, Mutex};

// Internal
use drive_lib::{
    follow::{CommandParams, Command, FollowParams, Follower, Outcome},
    odom::{OdomParams, Odometry},
    path::{PathParams, PathStore},
    pose::Pose,
    profile::FollowerSet,
    sim::{SimDrive, SimParams},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
    time::{Clock, SimClock},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period at which the driven trajectory is recorded.
const RECORD_PERIOD_S: f64 = 0.05;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A routine of motion commands and where the robot starts it.
#[derive(Deserialize, Debug)]
struct Routine {
    #[serde(default)]
    start: Pose,

    commands: Vec<Command>,
}

/// Summary of a run, saved into the session.
#[derive(Serialize, Debug)]
struct RunSummary {
    outcome: Outcome,

    /// Time the routine took on the simulated clock
    duration_s: f64,

    /// Where the odometry thinks the robot is
    odom_pose: Pose,

    /// Where the robot actually is
    true_pose: Pose,

    /// Distance between the odometry and true positions
    odom_error_m: f64,
}

/// A recorded point of the driven trajectory.
#[derive(Serialize, Debug, Clone, Copy)]
struct TrajectorySample {
    time_s: f64,
    odom: Pose,
    truth: Pose,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let sim_params: SimParams = util::params::load("drive.toml").wrap_err("Could not load drive params")?;
    let odom_params: OdomParams = util::params::load("odom.toml").wrap_err("Could not load odom params")?;
    let followers: FollowerSet =
        util::params::load("profile.toml").wrap_err("Could not load profile params")?;
    let path_params: PathParams = util::params::load("path.toml").wrap_err("Could not load path params")?;
    let command_params: CommandParams =
        util::params::load("follow.toml").wrap_err("Could not load follow params")?;

    path_params.validate().wrap_err("Invalid path params")?;

    let follow_params = FollowParams::from_parts(followers, path_params, command_params);

    info!("Exec parameters loaded");

    // ---- LOAD ROUTINE ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let routine: Routine = match args.len() {
        1 => util::params::load("routine.toml").wrap_err("Could not load the default routine")?,
        2 => {
            info!("Loading routine from \"{}\"", &args[1]);
            util::params::load_from(&args[1]).wrap_err("Could not load the routine")?
        }
        n => return Err(eyre!("Expected zero or one argument, found {}", n - 1)),
    };

    info!(
        "Loaded routine of {} commands starting at {:?}\n",
        routine.commands.len(),
        routine.start
    );

    // ---- INITIALISE SIMULATION ----

    let clock = SimClock::new();
    let mut drive = SimDrive::new(sim_params, routine.start, &clock);

    let odom = Odometry::new(drive.sensors(), odom_params, routine.start, Arc::new(clock.clone()));
    let pose = drive.track(odom, &clock);

    info!("Simulation initialised");

    // Record the trajectory at a fixed rate
    let trajectory = Arc::new(Mutex::new(Vec::new()));
    {
        let trajectory = trajectory.clone();
        let pose = pose.clone();
        let drive = drive.clone();
        let mut next_s = 0.0;
        clock.on_advance(Box::new(move |_, now_s| {
            if now_s < next_s {
                return;
            }
            next_s = now_s + RECORD_PERIOD_S;

            if let Ok(mut t) = trajectory.lock() {
                t.push(TrajectorySample {
                    time_s: now_s,
                    odom: pose.get(),
                    truth: drive.true_pose(),
                });
            }
        }));
    }

    // ---- INITIALISE FOLLOWER ----

    let mut path_dir = host::get_drive_sw_root().wrap_err("Could not find the software root")?;
    path_dir.push("paths");

    let mut follower = Follower::new(&follow_params, pose.clone(), Arc::new(clock.clone()))
        .with_store(PathStore::new(path_dir));

    info!("Follower initialised");

    // ---- RUN ROUTINE ----

    info!("Running routine\n");

    let outcome = follower
        .follow(&mut drive, &routine.commands)
        .wrap_err("Failed to run the routine")?;

    let odom_pose = pose.get();
    let true_pose = drive.true_pose();
    let summary = RunSummary {
        outcome,
        duration_s: clock.now(),
        odom_pose,
        true_pose,
        odom_error_m: odom_pose.distance(&true_pose),
    };

    match outcome {
        Outcome::Converged => info!("Routine complete in {:.2} s", summary.duration_s),
        _ => warn!("Routine ended {:?} after {:.2} s", outcome, summary.duration_s),
    }
    info!("    Final pose: {:?}", true_pose);
    info!("    Odometry error: {:.4} m", summary.odom_error_m);

    // ---- SAVE RESULTS ----

    session.save("summary.json", &summary).wrap_err("Failed to save the run summary")?;

    match trajectory.lock() {
        Ok(t) => {
            session.save("trajectory.json", &*t).wrap_err("Failed to save the trajectory")?;
        }
        Err(_) => warn!("Trajectory recording was poisoned, not saving it"),
    }

    info!("End of execution");

    Ok(())
}
