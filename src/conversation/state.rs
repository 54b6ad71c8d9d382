//! Conversation state types

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Companion message seeded into every new transcript
pub const GREETING: &str = "Hi there! I'm Aura, your confidential AI companion. I'm here to listen and support you. How are you feeling today?";

/// Companion message used when the response generator fails or stalls
pub const FALLBACK_REPLY: &str = "I'm still right here with you. My thoughts got a little tangled just now, but I'd really like to hear more about what's on your mind.";

const DEFAULT_LATENCY: Duration = Duration::from_millis(2000);
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Companion,
}

/// A transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    text: String,
    origin: Origin,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(origin: Origin, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            origin,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ============================================================================
// Turn-taking state
// ============================================================================

/// Turn-taking state
///
/// Turns are numbered from 1. `Idle { turns }` records how many turns have
/// completed; the next submission opens turn `turns + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    Idle { turns: u64 },
    AwaitingResponse { turn: u64 },
}

impl Default for ConvState {
    fn default() -> Self {
        ConvState::Idle { turns: 0 }
    }
}

impl ConvState {
    /// True strictly between a user message and its paired reply
    pub fn is_pending(&self) -> bool {
        matches!(self, ConvState::AwaitingResponse { .. })
    }
}

// ============================================================================
// Context
// ============================================================================

/// Bounds for the artificial response latency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyWindow {
    min: Duration,
    max: Duration,
}

impl LatencyWindow {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// Window spanning `a` and `b`, in either order
    pub fn between(a: Duration, b: Duration) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::fixed(DEFAULT_LATENCY)
    }
}

/// Immutable settings the engine runs with
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub latency: LatencyWindow,
    /// Longest the generator may take once the latency window has elapsed
    pub response_timeout: Duration,
    pub greeting: String,
    pub fallback_reply: String,
}

impl Default for ConvContext {
    fn default() -> Self {
        Self {
            latency: LatencyWindow::default(),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            greeting: GREETING.to_string(),
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }
}
