//! Session orchestration
//!
//! One `Session` owns every component. The sampling loop writes the current
//! emotional signal into a watch slot that the conversation engine reads
//! when it asks for a reply.

use crate::affirmation::AffirmationRotator;
use crate::breathing::{BreathingController, BreathingHandle};
use crate::collaborators::{
    EmotionClassifier, MediaCaptureProvider, ResponseGenerator, SpeechOutput,
};
use crate::config::SessionConfig;
use crate::conversation::{ConversationEngine, ConversationHandle};
use crate::sampling::{Emotion, SamplingHandle, SamplingLoop};
use rand::rngs::StdRng;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

const CONVERSATION_RNG: u64 = 0;
const AFFIRMATION_RNG: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0} has stopped")]
    ComponentStopped(&'static str),
}

/// External collaborators a session runs against
pub struct Collaborators<G, P, C> {
    pub responder: G,
    pub camera: P,
    pub classifier: C,
    pub speech: Arc<dyn SpeechOutput>,
}

pub struct Session {
    config: SessionConfig,
    conversation: ConversationHandle,
    sampling: SamplingHandle,
    signal_rx: watch::Receiver<Option<Emotion>>,
    breathing: Option<BreathingHandle>,
    affirmations: AffirmationRotator<StdRng>,
    speech: Arc<dyn SpeechOutput>,
}

impl Session {
    /// Spawn the conversation engine and sampling loop. Must be called from
    /// within a tokio runtime.
    pub fn start<G, P, C>(config: SessionConfig, collaborators: Collaborators<G, P, C>) -> Self
    where
        G: ResponseGenerator + 'static,
        P: MediaCaptureProvider + 'static,
        C: EmotionClassifier + 'static,
    {
        let Collaborators {
            responder,
            camera,
            classifier,
            speech,
        } = collaborators;

        let (signal_tx, signal_rx) = watch::channel(None);
        let conversation = ConversationEngine::spawn(
            config.conversation_context(),
            responder,
            signal_rx.clone(),
            config.rng(CONVERSATION_RNG),
        );
        let sampling = SamplingLoop::spawn(camera, classifier, config.sample_period, signal_tx);
        let affirmations = AffirmationRotator::new(config.rng(AFFIRMATION_RNG));

        tracing::info!(
            seeded = config.seed.is_some(),
            tick_ms = %config.breath_tick.as_millis(),
            "Session started"
        );

        Self {
            config,
            conversation,
            sampling,
            signal_rx,
            breathing: None,
            affirmations,
            speech,
        }
    }

    pub fn conversation(&self) -> &ConversationHandle {
        &self.conversation
    }

    pub fn sampling(&self) -> &SamplingHandle {
        &self.sampling
    }

    /// Latest accepted emotion, if sampling is active and has produced one
    pub fn current_signal(&self) -> Option<Emotion> {
        *self.signal_rx.borrow()
    }

    /// Open the breathing tool, or return the one already open
    pub fn open_breathing(&mut self) -> &BreathingHandle {
        let tick = self.config.breath_tick;
        self.breathing
            .get_or_insert_with(|| BreathingController::spawn(tick))
    }

    pub fn breathing(&self) -> Option<&BreathingHandle> {
        self.breathing.as_ref()
    }

    /// Tear down the breathing tool. Reopening starts a fresh cycle.
    pub async fn close_breathing(&mut self) {
        if let Some(breathing) = self.breathing.take() {
            breathing.close().await;
        }
    }

    pub fn affirmation(&self) -> &'static str {
        self.affirmations.current()
    }

    pub fn next_affirmation(&mut self) -> &'static str {
        self.affirmations.rotate()
    }

    pub fn speak_affirmation(&self) {
        self.affirmations.speak(self.speech.as_ref());
    }

    /// Stop every component. Safe to call more than once.
    pub async fn teardown(&mut self) {
        self.close_breathing().await;
        self.sampling.teardown().await;
        self.conversation.teardown().await;
        tracing::info!("Session torn down");
    }
}
