//! Sampling loop runtime

use super::{ActiveCapture, Emotion, SamplingPhase, SamplingStatus};
use crate::collaborators::{
    CaptureError, CollaboratorError, EmotionClassifier, Frame, MediaCaptureProvider,
};
use crate::session::SessionError;
use crate::timer::{Generation, TimerScope};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const COMPONENT: &str = "sampling loop";

/// Result of an activation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated { stream_id: String },
    /// Already active or still acquiring; nothing changed
    AlreadyActive,
    /// The provider refused; the loop stays inactive and may be retried
    Failed(CaptureError),
    /// Deactivated before the provider answered
    Abandoned,
}

/// Notifications for a presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplingUpdate {
    Activated { stream_id: String },
    AcquisitionFailed { reason: String },
    Signal { emotion: Emotion },
    Deactivated,
}

enum Command {
    Activate {
        reply: oneshot::Sender<ActivationOutcome>,
    },
    Deactivate {
        reply: oneshot::Sender<bool>,
    },
    Teardown {
        reply: oneshot::Sender<()>,
    },
}

enum LoopEvent<P: MediaCaptureProvider> {
    Acquired {
        generation: Generation,
        result: Result<ActiveCapture<P>, CaptureError>,
    },
    SampleDue {
        generation: Generation,
    },
    SampleReady {
        generation: Generation,
        result: Result<String, CollaboratorError>,
    },
}

/// Handle to a running sampling loop
pub struct SamplingHandle {
    command_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<SamplingStatus>,
    updates_tx: broadcast::Sender<SamplingUpdate>,
}

impl SamplingHandle {
    /// Acquire the capture stream and start sampling.
    ///
    /// Resolves once the provider has answered, or immediately when the loop
    /// is already active or acquiring.
    pub async fn activate(&self) -> Result<ActivationOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Activate { reply }).await?;
        rx.await.map_err(|_| SessionError::ComponentStopped(COMPONENT))
    }

    /// Stop sampling and release the stream. Returns false when already inactive.
    pub async fn deactivate(&self) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Deactivate { reply }).await?;
        rx.await.map_err(|_| SessionError::ComponentStopped(COMPONENT))
    }

    pub fn status(&self) -> SamplingStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SamplingUpdate> {
        self.updates_tx.subscribe()
    }

    /// Deactivate and stop the loop. Safe to call in any state.
    pub async fn teardown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.command_tx.send(Command::Teardown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SessionError::ComponentStopped(COMPONENT))
    }
}

/// Sampling loop generic over the capture provider and classifier
pub struct SamplingLoop<P, C>
where
    P: MediaCaptureProvider + 'static,
    C: EmotionClassifier + 'static,
{
    provider: Arc<P>,
    classifier: Arc<C>,
    period: Duration,
    phase: SamplingPhase,
    capture: Option<ActiveCapture<P>>,
    last_signal: Option<Emotion>,
    samples: u64,
    classifying: bool,
    pending_activation: Option<oneshot::Sender<ActivationOutcome>>,
    signal_tx: watch::Sender<Option<Emotion>>,
    timers: TimerScope,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<LoopEvent<P>>,
    event_rx: mpsc::Receiver<LoopEvent<P>>,
    status_tx: watch::Sender<SamplingStatus>,
    updates_tx: broadcast::Sender<SamplingUpdate>,
}

impl<P, C> SamplingLoop<P, C>
where
    P: MediaCaptureProvider + 'static,
    C: EmotionClassifier + 'static,
{
    /// Build an inactive loop that publishes accepted labels to `signal_tx`
    pub fn new(
        provider: P,
        classifier: C,
        period: Duration,
        signal_tx: watch::Sender<Option<Emotion>>,
    ) -> (Self, SamplingHandle) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(SamplingStatus::default());
        let (updates_tx, _) = broadcast::channel(64);

        let sampler = Self {
            provider: Arc::new(provider),
            classifier: Arc::new(classifier),
            period,
            phase: SamplingPhase::Inactive,
            capture: None,
            last_signal: None,
            samples: 0,
            classifying: false,
            pending_activation: None,
            signal_tx,
            timers: TimerScope::new("sampling"),
            command_rx,
            event_tx,
            event_rx,
            status_tx,
            updates_tx: updates_tx.clone(),
        };
        let handle = SamplingHandle {
            command_tx,
            status_rx,
            updates_tx,
        };
        (sampler, handle)
    }

    pub fn spawn(
        provider: P,
        classifier: C,
        period: Duration,
        signal_tx: watch::Sender<Option<Emotion>>,
    ) -> SamplingHandle {
        let (sampler, handle) = Self::new(provider, classifier, period, signal_tx);
        tokio::spawn(sampler.run());
        handle
    }

    pub async fn run(mut self) {
        tracing::info!(period_ms = %self.period.as_millis(), "Starting sampling loop");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(Command::Activate { reply }) => self.activate(reply),
                    Some(Command::Deactivate { reply }) => {
                        let _ = reply.send(self.deactivate());
                    }
                    Some(Command::Teardown { reply }) => {
                        self.deactivate();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.deactivate();
                        break;
                    }
                },
                Some(event) = self.event_rx.recv() => self.handle_event(event),
            }
        }

        tracing::info!("Sampling loop stopped");
    }

    fn activate(&mut self, reply: oneshot::Sender<ActivationOutcome>) {
        if !self.phase.is_inactive() {
            let _ = reply.send(ActivationOutcome::AlreadyActive);
            return;
        }

        let generation = self.timers.generation();
        self.phase = SamplingPhase::Acquiring { generation };
        self.pending_activation = Some(reply);
        self.publish_status();
        tracing::debug!(%generation, "Acquiring capture stream");

        // Not tied to the timer scope: a stream that arrives after deactivation
        // must still reach the loop so it can be released.
        let provider = Arc::clone(&self.provider);
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = provider
                .acquire()
                .await
                .map(|stream| ActiveCapture::new(Arc::clone(&provider), stream));
            // If the loop is gone the guard drops here and releases the stream
            let _ = event_tx
                .send(LoopEvent::Acquired { generation, result })
                .await;
        });
    }

    fn deactivate(&mut self) -> bool {
        if self.phase.is_inactive() {
            return false;
        }

        self.timers.cancel_all();
        if let Some(reply) = self.pending_activation.take() {
            let _ = reply.send(ActivationOutcome::Abandoned);
        }
        if let Some(capture) = self.capture.take() {
            capture.release();
        }
        self.phase = SamplingPhase::Inactive;
        self.last_signal = None;
        self.classifying = false;
        self.signal_tx.send_replace(None);
        self.publish_status();
        let _ = self.updates_tx.send(SamplingUpdate::Deactivated);
        tracing::info!(samples = self.samples, "Sampling deactivated");
        true
    }

    fn handle_event(&mut self, event: LoopEvent<P>) {
        match event {
            LoopEvent::Acquired { generation, result } => self.on_acquired(generation, result),
            LoopEvent::SampleDue { generation } => self.on_sample_due(generation),
            LoopEvent::SampleReady { generation, result } => {
                self.on_sample_ready(generation, result);
            }
        }
    }

    fn on_acquired(
        &mut self,
        generation: Generation,
        result: Result<ActiveCapture<P>, CaptureError>,
    ) {
        if self.phase != (SamplingPhase::Acquiring { generation }) {
            tracing::debug!(%generation, "Discarding abandoned acquisition");
            if let Ok(capture) = result {
                capture.release();
            }
            return;
        }

        let reply = self.pending_activation.take();
        match result {
            Ok(capture) => {
                let stream_id = capture.stream_id().unwrap_or_default().to_string();
                self.capture = Some(capture);
                self.phase = SamplingPhase::Active { generation };
                self.samples = 0;
                self.timers.every(self.period, &self.event_tx, |generation| {
                    LoopEvent::SampleDue { generation }
                });
                self.publish_status();
                let _ = self.updates_tx.send(SamplingUpdate::Activated {
                    stream_id: stream_id.clone(),
                });
                tracing::info!(stream = %stream_id, "Sampling activated");
                if let Some(reply) = reply {
                    let _ = reply.send(ActivationOutcome::Activated { stream_id });
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Capture acquisition failed");
                self.phase = SamplingPhase::Inactive;
                self.publish_status();
                let _ = self.updates_tx.send(SamplingUpdate::AcquisitionFailed {
                    reason: e.to_string(),
                });
                if let Some(reply) = reply {
                    let _ = reply.send(ActivationOutcome::Failed(e));
                }
            }
        }
    }

    fn on_sample_due(&mut self, generation: Generation) {
        if !self.timers.is_current(generation) {
            tracing::debug!(%generation, "Ignoring stale sample tick");
            return;
        }
        if self.classifying {
            tracing::debug!("Previous classification still running, skipping sample");
            return;
        }
        let Some(frame) = self.capture.as_mut().and_then(ActiveCapture::current_frame) else {
            return;
        };

        self.classifying = true;
        let classifier = Arc::clone(&self.classifier);
        let event_tx = self.event_tx.clone();
        let limit = self.period;
        self.timers.spawn(async move {
            let result = classify_frame(classifier.as_ref(), &frame, limit).await;
            let _ = event_tx
                .send(LoopEvent::SampleReady { generation, result })
                .await;
        });
    }

    fn on_sample_ready(&mut self, generation: Generation, result: Result<String, CollaboratorError>) {
        if !self.timers.is_current(generation) || self.capture.is_none() {
            tracing::debug!(%generation, "Discarding classification from a stopped sampler");
            return;
        }
        self.classifying = false;

        let emotion = match result.and_then(|label| label.parse::<Emotion>()) {
            Ok(emotion) => emotion,
            Err(e) => {
                tracing::debug!(error = %e, "Classification produced no signal");
                return;
            }
        };

        self.last_signal = Some(emotion);
        self.samples = self.samples.saturating_add(1);
        self.signal_tx.send_replace(Some(emotion));
        self.publish_status();
        let _ = self.updates_tx.send(SamplingUpdate::Signal { emotion });
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(SamplingStatus {
            phase: self.phase,
            stream_id: self
                .capture
                .as_ref()
                .and_then(ActiveCapture::stream_id)
                .map(str::to_string),
            last_signal: self.last_signal,
            samples: self.samples,
        });
    }
}

/// Run one classification, turning a panic or an overrun into an error so
/// the sampler always hears back
async fn classify_frame<C: EmotionClassifier + ?Sized>(
    classifier: &C,
    frame: &Frame,
    limit: Duration,
) -> Result<String, CollaboratorError> {
    let call = AssertUnwindSafe(classifier.classify(frame)).catch_unwind();
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => {
            tracing::warn!(sequence = frame.sequence, "Emotion classifier panicked");
            Err(CollaboratorError::Failed("classifier panicked".to_string()))
        }
        Err(_) => {
            tracing::warn!(
                sequence = frame.sequence,
                limit_ms = %limit.as_millis(),
                "Emotion classifier timed out"
            );
            Err(CollaboratorError::Unavailable)
        }
    }
}
