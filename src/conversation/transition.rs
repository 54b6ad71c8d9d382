//! Pure state transition function

use super::{ConvContext, ConvState, Effect, Event, ResponseOutcome};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event was not applied
///
/// None of these are failures: rejected input and stale timer events are
/// expected and leave the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Input is empty")]
    EmptyInput,
    #[error("Still waiting on the reply to turn {turn}")]
    ResponsePending { turn: u64 },
    #[error("Response for turn {turn} is no longer awaited")]
    StaleResponse { turn: u64 },
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; message ids,
/// timestamps and timers are left to the engine executing the effects.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Blank input is rejected in every state
        (_, Event::UserSubmit { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyInput)
        }

        // Idle + UserSubmit -> AwaitingResponse
        (ConvState::Idle { turns }, Event::UserSubmit { text }) => {
            let turn = turns.saturating_add(1);
            Ok(TransitionResult::new(ConvState::AwaitingResponse { turn })
                .with_effect(Effect::append_user(text))
                .with_effect(Effect::NotifyPending { pending: true })
                .with_effect(Effect::ScheduleResponse { turn }))
        }

        // AwaitingResponse + UserSubmit -> Reject
        (ConvState::AwaitingResponse { turn }, Event::UserSubmit { .. }) => {
            Err(TransitionError::ResponsePending { turn: *turn })
        }

        // AwaitingResponse + matching ResponseReady -> Idle
        (ConvState::AwaitingResponse { turn }, Event::ResponseReady { turn: ready, outcome })
            if *turn == ready =>
        {
            Ok(TransitionResult::new(ConvState::Idle { turns: *turn })
                .with_effect(Effect::append_companion(reply_text(outcome, context)))
                .with_effect(Effect::NotifyPending { pending: false }))
        }

        // Anything else carrying a turn number arrived late
        (_, Event::ResponseReady { turn, .. }) => Err(TransitionError::StaleResponse { turn }),
    }
}

fn reply_text(outcome: ResponseOutcome, context: &ConvContext) -> String {
    match outcome {
        ResponseOutcome::Generated(text) if !text.trim().is_empty() => text,
        ResponseOutcome::Generated(_) | ResponseOutcome::Failed { .. } => {
            context.fallback_reply.clone()
        }
    }
}
