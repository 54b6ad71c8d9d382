//! Breathing state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// One segment of the breathing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Inhale,
    Hold,
    Exhale,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Inhale, Phase::Hold, Phase::Exhale];

    /// Countdown length of the phase in whole seconds
    pub fn duration_secs(self) -> u32 {
        match self {
            Phase::Inhale | Phase::Hold => 4,
            Phase::Exhale => 6,
        }
    }

    pub fn next(self) -> Phase {
        match self {
            Phase::Inhale => Phase::Hold,
            Phase::Hold => Phase::Exhale,
            Phase::Exhale => Phase::Inhale,
        }
    }

    /// Short label shown while the phase is active
    pub fn cue(self) -> &'static str {
        match self {
            Phase::Inhale => "Breathe In",
            Phase::Hold => "Hold",
            Phase::Exhale => "Breathe Out",
        }
    }

    /// Longer guidance shown under the cue
    pub fn instruction(self) -> &'static str {
        match self {
            Phase::Inhale => "Slowly breathe in through your nose",
            Phase::Hold => "Hold your breath gently",
            Phase::Exhale => "Slowly breathe out through your mouth",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Inhale => write!(f, "inhale"),
            Phase::Hold => write!(f, "hold"),
            Phase::Exhale => write!(f, "exhale"),
        }
    }
}

/// Position in the breathing cycle
///
/// `seconds_remaining` is always within `1..=phase.duration_secs()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingState {
    phase: Phase,
    seconds_remaining: u32,
    running: bool,
    completed_cycles: u64,
}

impl Default for BreathingState {
    fn default() -> Self {
        Self::new()
    }
}

impl BreathingState {
    /// Paused at the top of an inhale
    pub fn new() -> Self {
        Self {
            phase: Phase::Inhale,
            seconds_remaining: Phase::Inhale.duration_secs(),
            running: false,
            completed_cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    pub fn cue(&self) -> &'static str {
        self.phase.cue()
    }

    pub fn instruction(&self) -> &'static str {
        self.phase.instruction()
    }

    /// Returns false if already running
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    /// Returns false if already paused
    pub fn pause(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance by one second. Returns the new phase when the tick crossed a
    /// phase boundary. Paused states do not move.
    pub fn tick(&mut self) -> Option<Phase> {
        if !self.running {
            return None;
        }

        if self.seconds_remaining > 1 {
            self.seconds_remaining -= 1;
            return None;
        }

        if self.phase == Phase::Exhale {
            self.completed_cycles = self.completed_cycles.saturating_add(1);
        }
        self.phase = self.phase.next();
        self.seconds_remaining = self.phase.duration_secs();
        Some(self.phase)
    }
}
