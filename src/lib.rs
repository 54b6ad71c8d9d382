//! Aura - wellness companion session core
//!
//! Timed state machines behind a companion app: delayed conversational
//! replies, a paced breathing cycle, and an ambient emotion-sampling loop
//! bound to a capture device.

pub mod affirmation;
pub mod breathing;
pub mod collaborators;
pub mod config;
pub mod conversation;
pub mod sampling;
pub mod session;
pub mod timer;

pub use config::SessionConfig;
pub use session::{Collaborators, Session, SessionError};
