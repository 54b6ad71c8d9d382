//! Effects produced by state transitions

use super::Origin;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the transcript and notify subscribers
    AppendMessage { origin: Origin, text: String },

    /// Start the latency timer for a turn
    ScheduleResponse { turn: u64 },

    /// Tell subscribers the pending flag changed
    NotifyPending { pending: bool },
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            origin: Origin::User,
            text: text.into(),
        }
    }

    pub fn append_companion(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            origin: Origin::Companion,
            text: text.into(),
        }
    }
}
