//! Conversation engine
//!
//! Implements the Elm Architecture pattern: a pure transition function over the
//! turn-taking state, and an engine that executes the resulting effects.

mod effect;
mod engine;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use engine::{ConversationEngine, ConversationHandle, ConversationUpdate, SubmitOutcome};
pub use event::{Event, ResponseOutcome};
pub use state::{ConvContext, ConvState, LatencyWindow, Message, MessageId, Origin};
pub use transition::{transition, TransitionError, TransitionResult};
