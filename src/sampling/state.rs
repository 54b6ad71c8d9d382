//! Sampling state types

use crate::collaborators::CollaboratorError;
use crate::timer::Generation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotional signal produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Calm,
    Focused,
    Neutral,
    Thoughtful,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Happy,
        Emotion::Calm,
        Emotion::Focused,
        Emotion::Neutral,
        Emotion::Thoughtful,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Calm => "calm",
            Emotion::Focused => "focused",
            Emotion::Neutral => "neutral",
            Emotion::Thoughtful => "thoughtful",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = CollaboratorError;

    /// Case-insensitive; surrounding whitespace is ignored
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let trimmed = label.trim();
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CollaboratorError::InvalidLabel(label.to_string()))
    }
}

/// Lifecycle of the sampling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplingPhase {
    Inactive,
    /// Waiting on the capture provider
    Acquiring { generation: Generation },
    /// Holding a capture stream, sampling every period
    Active { generation: Generation },
}

impl SamplingPhase {
    pub fn is_inactive(&self) -> bool {
        matches!(self, SamplingPhase::Inactive)
    }
}

/// Published view of the loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplingStatus {
    pub phase: SamplingPhase,
    /// Present exactly while active
    pub stream_id: Option<String>,
    pub last_signal: Option<Emotion>,
    /// Accepted classifications since the last activation
    pub samples: u64,
}

impl Default for SamplingStatus {
    fn default() -> Self {
        Self {
            phase: SamplingPhase::Inactive,
            stream_id: None,
            last_signal: None,
            samples: 0,
        }
    }
}
