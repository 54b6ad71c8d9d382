//! Breathing cycle controller
//!
//! A repeating inhale, hold, exhale countdown paced by a one-second ticker.

mod controller;
pub mod state;

#[cfg(test)]
mod proptests;

pub use controller::{BreathingController, BreathingHandle};
pub use state::{BreathingState, Phase};
