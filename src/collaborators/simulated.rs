//! Simulated collaborators
//!
//! Stand-ins used by the `aura` binary: no language model, no camera, no
//! speech engine.

use super::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const SUPPORTIVE_REPLY: &str = "I hear you, and I want you to know that your feelings are completely valid. It takes courage to share what's on your mind. Would you like to talk more about what's been on your mind, or would a breathing exercise help you feel more centered right now?";

/// Responder with a fixed supportive reply, opened by a line matching the
/// current emotional signal when there is one
#[derive(Debug, Default, Clone)]
pub struct ScriptedResponder;

impl ScriptedResponder {
    fn opening(signal: Emotion) -> &'static str {
        match signal {
            Emotion::Happy => "It's lovely to sense some lightness in you today.",
            Emotion::Calm => "You seem fairly settled right now, which is a good place to talk from.",
            Emotion::Focused => "You seem really present with this.",
            Emotion::Neutral => "Thank you for sharing that with me.",
            Emotion::Thoughtful => "It looks like you're turning this over carefully.",
        }
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedResponder {
    async fn generate(&self, request: &ResponseRequest) -> Result<String, CollaboratorError> {
        Ok(match request.signal {
            Some(signal) => format!("{} {SUPPORTIVE_REPLY}", Self::opening(signal)),
            None => SUPPORTIVE_REPLY.to_string(),
        })
    }
}

/// Classifier picking a uniformly random label
pub struct RandomClassifier {
    rng: Mutex<StdRng>,
}

impl RandomClassifier {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl EmotionClassifier for RandomClassifier {
    async fn classify(&self, _frame: &Frame) -> Result<String, CollaboratorError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| CollaboratorError::Failed("classifier state poisoned".to_string()))?;
        Emotion::ALL
            .choose(&mut *rng)
            .map(|emotion| emotion.as_str().to_string())
            .ok_or(CollaboratorError::Unavailable)
    }
}

/// Camera producing noise frames, or refusing access when unavailable
pub struct SimulatedCamera {
    available: bool,
    next_id: AtomicU64,
}

impl SimulatedCamera {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            next_id: AtomicU64::new(1),
        }
    }
}

pub struct SimulatedStream {
    id: String,
    sequence: u64,
    rng: StdRng,
}

impl CaptureStream for SimulatedStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn current_frame(&mut self) -> Frame {
        const WIDTH: u32 = 64;
        const HEIGHT: u32 = 48;

        self.sequence += 1;
        let mut pixels = vec![0u8; (WIDTH * HEIGHT) as usize];
        self.rng.fill(pixels.as_mut_slice());
        Frame {
            stream_id: self.id.clone(),
            sequence: self.sequence,
            width: WIDTH,
            height: HEIGHT,
            pixels,
            captured_at: Utc::now(),
        }
    }
}

#[async_trait]
impl MediaCaptureProvider for SimulatedCamera {
    type Stream = SimulatedStream;

    async fn acquire(&self) -> Result<SimulatedStream, CaptureError> {
        if !self.available {
            return Err(CaptureError::PermissionDenied);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(stream = id, "Simulated camera opened");
        Ok(SimulatedStream {
            id: format!("simulated-camera-{id}"),
            sequence: 0,
            rng: StdRng::seed_from_u64(id),
        })
    }

    fn release(&self, stream: SimulatedStream) {
        tracing::info!(stream = %stream.id, frames = stream.sequence, "Simulated camera closed");
    }
}

/// Speech output that writes utterances to the log
#[derive(Debug, Default, Clone)]
pub struct LoggingSpeech;

impl SpeechOutput for LoggingSpeech {
    fn speak(&self, utterance: &Utterance) -> Result<(), CollaboratorError> {
        tracing::info!(
            text = %utterance.text,
            rate = utterance.rate,
            pitch = utterance.pitch,
            "Speaking"
        );
        Ok(())
    }
}
