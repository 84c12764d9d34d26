//! # Feedback controllers
//!
//! Generic single-input single-output controllers used by the profile and path followers. All
//! controllers are stepped once per control tick, so their gains are per-tick quantities.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pid;
mod slew;
mod tbh;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use pid::*;
pub use slew::*;
pub use tbh::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A feedback controller.
pub trait Controller: Send {
    /// Get the output of the controller for the given error.
    fn get(&mut self, error: f64) -> f64;

    /// Get the output of the controller for a measured state and its reference.
    ///
    /// Controllers which can do better with the separate values (feedforward on the reference,
    /// derivative on the measurement) override this.
    fn get_state_ref(&mut self, state: f64, reference: f64) -> f64 {
        self.get(reference - state)
    }

    /// The most recent output.
    fn output(&self) -> f64;

    /// Clear all accumulated state.
    fn reset(&mut self);
}
