//! Ambient emotion sampling
//!
//! While active, the loop owns a capture stream and classifies one frame per
//! sampling period, publishing each accepted label to the session's signal
//! slot.

mod ambient;
mod capture;
pub mod state;

pub use ambient::{ActivationOutcome, SamplingHandle, SamplingLoop, SamplingUpdate};
pub use capture::ActiveCapture;
pub use state::{Emotion, SamplingPhase, SamplingStatus};
