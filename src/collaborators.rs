//! Collaborator seams
//!
//! The session core reaches response generation, emotion classification,
//! media capture and speech only through these traits, so tests can swap in
//! mocks and the binary can run against simulated implementations.

pub mod simulated;

#[cfg(test)]
pub mod testing;

use crate::conversation::{Message, Origin};
use crate::sampling::Emotion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a response generator, classifier or speech output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable")]
    Unavailable,
    #[error("{0}")]
    Failed(String),
    #[error("unknown emotion label: {0:?}")]
    InvalidLabel(String),
}

/// Failure to acquire a capture device
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no capture device available")]
    Unavailable,
    #[error("capture device error: {0}")]
    Device(String),
}

/// Everything a response generator gets to look at
#[derive(Debug, Clone)]
pub struct ResponseRequest {
    pub transcript: Arc<[Message]>,
    /// Latest emotional signal from the ambient sampling loop, if any
    pub signal: Option<Emotion>,
}

impl ResponseRequest {
    /// Text of the most recent user message
    pub fn last_user_text(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|message| message.origin() == Origin::User)
            .map(Message::text)
    }
}

/// Produces the companion's side of a turn
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, request: &ResponseRequest) -> Result<String, CollaboratorError>;
}

/// A single captured video frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub stream_id: String,
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// An acquired capture stream. Owned by exactly one sampling loop at a time.
pub trait CaptureStream: Send + 'static {
    fn id(&self) -> &str;

    fn current_frame(&mut self) -> Frame;
}

/// Platform access to a camera-like capture device
#[async_trait]
pub trait MediaCaptureProvider: Send + Sync {
    type Stream: CaptureStream;

    async fn acquire(&self) -> Result<Self::Stream, CaptureError>;

    /// Give the stream back to the platform. Synchronous so it can run from `Drop`.
    fn release(&self, stream: Self::Stream);
}

/// Maps a frame to an emotion label
///
/// Labels are plain strings at this boundary; anything outside the
/// [`Emotion`] set is rejected by the sampling loop.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<String, CollaboratorError>;
}

/// Text handed to a speech synthesiser
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
}

/// Best-effort speech synthesis
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, utterance: &Utterance) -> Result<(), CollaboratorError>;
}

// ============================================================================
// Arc implementations
// ============================================================================

#[async_trait]
impl<T: ResponseGenerator + ?Sized> ResponseGenerator for Arc<T> {
    async fn generate(&self, request: &ResponseRequest) -> Result<String, CollaboratorError> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<T: EmotionClassifier + ?Sized> EmotionClassifier for Arc<T> {
    async fn classify(&self, frame: &Frame) -> Result<String, CollaboratorError> {
        (**self).classify(frame).await
    }
}

#[async_trait]
impl<T: MediaCaptureProvider> MediaCaptureProvider for Arc<T> {
    type Stream = T::Stream;

    async fn acquire(&self) -> Result<Self::Stream, CaptureError> {
        (**self).acquire().await
    }

    fn release(&self, stream: Self::Stream) {
        (**self).release(stream);
    }
}

impl<T: SpeechOutput + ?Sized> SpeechOutput for Arc<T> {
    fn speak(&self, utterance: &Utterance) -> Result<(), CollaboratorError> {
        (**self).speak(utterance)
    }
}
