//! Events that drive the conversation state machine

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit { text: String },

    // Timer events
    ResponseReady { turn: u64, outcome: ResponseOutcome },
}

/// What came back from the response generator for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Generated(String),
    /// Error, timeout or panic; the engine substitutes its fallback reply
    Failed { reason: String },
}
