//! Property-based tests for the conversation transition function

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_outcome() -> impl Strategy<Value = ResponseOutcome> {
    prop_oneof![
        "[a-zA-Z ]{0,30}".prop_map(ResponseOutcome::Generated),
        "[a-z]{1,10}".prop_map(|reason| ResponseOutcome::Failed { reason }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|text| Event::UserSubmit { text }),
        (0u64..6, arb_outcome()).prop_map(|(turn, outcome)| Event::ResponseReady { turn, outcome }),
    ]
}

/// Transcript as the engine would build it from the effects
fn replay(events: Vec<Event>) -> (ConvState, Vec<Origin>) {
    let context = ConvContext::default();
    let mut state = ConvState::default();
    let mut appended = Vec::new();

    for event in events {
        if let Ok(result) = transition(&state, &context, event) {
            state = result.new_state;
            for effect in result.effects {
                if let Effect::AppendMessage { origin, .. } = effect {
                    appended.push(origin);
                }
            }
        }
    }
    (state, appended)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Messages strictly alternate user, companion, user, ...
    #[test]
    fn prop_transcript_alternates(events in proptest::collection::vec(arb_event(), 0..40)) {
        let (state, appended) = replay(events);

        for (i, origin) in appended.iter().enumerate() {
            let expected = if i % 2 == 0 { Origin::User } else { Origin::Companion };
            prop_assert_eq!(*origin, expected);
        }

        // An odd count means exactly one reply is outstanding
        prop_assert_eq!(state.is_pending(), appended.len() % 2 == 1);
    }

    // At most one reply is ever scheduled per turn
    #[test]
    fn prop_one_schedule_per_turn(events in proptest::collection::vec(arb_event(), 0..40)) {
        let context = ConvContext::default();
        let mut state = ConvState::default();
        let mut scheduled = Vec::new();

        for event in events {
            if let Ok(result) = transition(&state, &context, event) {
                state = result.new_state;
                for effect in result.effects {
                    if let Effect::ScheduleResponse { turn } = effect {
                        prop_assert!(!scheduled.contains(&turn), "turn {} scheduled twice", turn);
                        scheduled.push(turn);
                    }
                }
            }
        }
    }

    // Blank input is rejected from every reachable state
    #[test]
    fn prop_blank_input_always_rejected(
        events in proptest::collection::vec(arb_event(), 0..20),
        blank in "[ \t\n]{0,5}",
    ) {
        let (state, _) = replay(events);
        let result = transition(&state, &ConvContext::default(), Event::UserSubmit { text: blank });
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyInput);
    }

    // A reply for any turn other than the awaited one is stale
    #[test]
    fn prop_mismatched_replies_are_stale(awaited in 1u64..100, other in 0u64..100, outcome in arb_outcome()) {
        prop_assume!(awaited != other);
        let state = ConvState::AwaitingResponse { turn: awaited };
        let result = transition(
            &state,
            &ConvContext::default(),
            Event::ResponseReady { turn: other, outcome },
        );
        prop_assert_eq!(result.unwrap_err(), TransitionError::StaleResponse { turn: other });
    }

    // Companion text is never blank
    #[test]
    fn prop_companion_text_never_blank(outcome in arb_outcome()) {
        let result = transition(
            &ConvState::AwaitingResponse { turn: 1 },
            &ConvContext::default(),
            Event::ResponseReady { turn: 1, outcome },
        ).unwrap();

        match &result.effects[0] {
            Effect::AppendMessage { origin, text } => {
                prop_assert_eq!(*origin, Origin::Companion);
                prop_assert!(!text.trim().is_empty());
            }
            other => prop_assert!(false, "unexpected effect {:?}", other),
        }
    }
}
