//! Property-based tests for the breathing state

use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Pause,
    Reset,
    Tick,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Pause),
        Just(Op::Reset),
        Just(Op::Tick),
        Just(Op::Tick),
        Just(Op::Tick),
    ]
}

fn apply(state: &mut BreathingState, op: Op) {
    match op {
        Op::Start => {
            state.start();
        }
        Op::Pause => {
            state.pause();
        }
        Op::Reset => state.reset(),
        Op::Tick => {
            state.tick();
        }
    }
}

const CYCLE_SECS: u64 = 14;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_remaining_always_within_phase(ops in proptest::collection::vec(arb_op(), 0..200)) {
        let mut state = BreathingState::new();
        for op in ops {
            apply(&mut state, op);
            prop_assert!(state.seconds_remaining() >= 1);
            prop_assert!(state.seconds_remaining() <= state.phase().duration_secs());
        }
    }

    #[test]
    fn prop_reset_always_returns_to_initial(ops in proptest::collection::vec(arb_op(), 0..100)) {
        let mut state = BreathingState::new();
        for op in ops {
            apply(&mut state, op);
        }
        state.reset();
        prop_assert_eq!(state, BreathingState::new());
    }

    // Only the number of running ticks matters, not how pauses were interleaved
    #[test]
    fn prop_position_depends_only_on_running_ticks(
        ops in proptest::collection::vec(prop_oneof![Just(Op::Start), Just(Op::Pause), Just(Op::Tick)], 0..200)
    ) {
        let mut state = BreathingState::new();
        let mut running_ticks = 0u64;
        for op in ops {
            if matches!(op, Op::Tick) && state.is_running() {
                running_ticks += 1;
            }
            apply(&mut state, op);
        }

        let mut reference = BreathingState::new();
        reference.start();
        for _ in 0..running_ticks {
            reference.tick();
        }

        prop_assert_eq!(state.phase(), reference.phase());
        prop_assert_eq!(state.seconds_remaining(), reference.seconds_remaining());
        prop_assert_eq!(state.completed_cycles(), running_ticks / CYCLE_SECS);
    }

    #[test]
    fn prop_phase_order_is_fixed(ticks in 1usize..100) {
        let mut state = BreathingState::new();
        state.start();
        let mut phase = state.phase();
        for _ in 0..ticks {
            if let Some(next) = state.tick() {
                prop_assert_eq!(next, phase.next());
                phase = next;
            }
        }
    }
}

#[test]
fn test_cycle_length_matches_durations() {
    let total: u32 = Phase::ALL.iter().map(|phase| phase.duration_secs()).sum();
    assert_eq!(u64::from(total), CYCLE_SECS);
}
