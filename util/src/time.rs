//! General time utility functions
//!
//! Control loops never read the system time directly, instead they are given a [`Clock`]. On the
//! robot this is a [`SystemClock`], in tests and simulation a [`SimClock`] is used so that time
//! only moves forward when a loop sleeps.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A monotonic source of time in seconds.
pub trait Clock: Send + Sync {
    /// Seconds elapsed since the clock's epoch.
    fn now(&self) -> f64;

    /// Block the calling thread for the given number of seconds.
    fn sleep(&self, seconds: f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Clock backed by the system's monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant
}

/// Function called each time a [`SimClock`] advances, with the step and the new time.
pub type AdvanceHook = Box<dyn FnMut(f64, f64) + Send>;

/// Simulated clock which advances only when slept on.
///
/// Clones share the same time, so a clone can be handed to each component of a simulation.
#[derive(Clone)]
pub struct SimClock {
    now_s: Arc<Mutex<f64>>,
    hooks: Arc<Mutex<Vec<AdvanceHook>>>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now()
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn sleep(&self, seconds: f64) {
        if seconds > 0.0 && seconds.is_finite() {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
    }
}

impl SimClock {
    /// Create a new simulated clock starting at zero.
    pub fn new() -> Self {
        Self {
            now_s: Arc::new(Mutex::new(0.0)),
            hooks: Arc::new(Mutex::new(Vec::new()))
        }
    }

    /// Register a function to be called every time the clock advances.
    ///
    /// Hooks must not sleep on the clock they are registered with.
    pub fn on_advance(&self, hook: AdvanceHook) {
        match self.hooks.lock() {
            Ok(mut h) => h.push(hook),
            Err(e) => e.into_inner().push(hook)
        }
    }

    /// Move the clock forward by the given number of seconds, running all hooks.
    pub fn advance(&self, seconds: f64) {
        if !(seconds > 0.0) || !seconds.is_finite() {
            return;
        }

        let now = {
            let mut now_s = match self.now_s.lock() {
                Ok(n) => n,
                Err(e) => e.into_inner()
            };
            *now_s += seconds;
            *now_s
        };

        let mut hooks = match self.hooks.lock() {
            Ok(h) => h,
            Err(e) => e.into_inner()
        };
        for hook in hooks.iter_mut() {
            hook(seconds, now);
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now(&self) -> f64 {
        match self.now_s.lock() {
            Ok(n) => *n,
            Err(e) => *e.into_inner()
        }
    }

    fn sleep(&self, seconds: f64) {
        self.advance(seconds)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration.num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}
