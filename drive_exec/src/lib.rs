//! # Drive library.
//!
//! Motion control for a differential drive robot: motion profiles and the followers that track
//! them, path generation and following, and the odometry which tells the followers where the
//! robot is. The drive executable and any other crates in the workspace use these items through
//! this library.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Acceptance checking - decides when a controlled quantity has settled
pub mod accept;

/// Cancellation token shared between the motion loops and whatever interrupts them
pub mod cancel;

/// Feedback controllers - PID, take back half, and slew rate limiting
pub mod ctrl;

/// Motion commands - turning, moving to a point, and following paths
pub mod follow;

/// Hardware interfaces implemented by the device layer
pub mod hw;

/// Odometry - keeps track of where the robot is
pub mod odom;

/// Path generation and persistence
pub mod path;

/// Pose of the robot and the store it is published through
pub mod pose;

/// Motion profiles and the profile follower
pub mod profile;

/// Simulated drivetrain and sensors
pub mod sim;

/// Strongly typed physical quantities
pub mod units;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Period of the motion control loops.
pub const CONTROL_PERIOD_S: f64 = 0.01;
