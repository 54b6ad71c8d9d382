//! Conversation engine runtime
//!
//! Owns the transcript and the latency timer, applies the pure transition
//! function, and executes the effects it returns.

use super::{
    transition, ConvContext, ConvState, Effect, Event, Message, Origin, ResponseOutcome,
    TransitionError,
};
use crate::collaborators::{ResponseGenerator, ResponseRequest};
use crate::sampling::Emotion;
use crate::session::SessionError;
use crate::timer::{Generation, TimerScope};
use futures::FutureExt;
use rand::rngs::StdRng;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const COMPONENT: &str = "conversation engine";

/// How a submission was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Blank input or a reply still pending; nothing was appended
    Ignored(TransitionError),
}

/// Notifications for a presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationUpdate {
    MessageAppended { message: Message },
    PendingChanged { pending: bool },
}

#[derive(Debug, Clone)]
struct Snapshot {
    transcript: Arc<[Message]>,
    pending: bool,
}

/// Event delivered by a timer, stamped with the generation it was scheduled under
#[derive(Debug)]
struct TimerEvent {
    generation: Generation,
    event: Event,
}

enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Teardown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to interact with a running conversation engine
pub struct ConversationHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<Snapshot>,
    updates_tx: broadcast::Sender<ConversationUpdate>,
}

impl ConversationHandle {
    /// Offer user input. Blank input or input while a reply is pending is ignored.
    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmitOutcome, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Submit {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| SessionError::ComponentStopped(COMPONENT))?;
        rx.await.map_err(|_| SessionError::ComponentStopped(COMPONENT))
    }

    /// Owned copy of the transcript as of the last applied event
    pub fn current_transcript(&self) -> Vec<Message> {
        self.snapshot_rx.borrow().transcript.to_vec()
    }

    pub fn pending_response(&self) -> bool {
        self.snapshot_rx.borrow().pending
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationUpdate> {
        self.updates_tx.subscribe()
    }

    /// Stop the engine and cancel the latency timer. Safe to call in any state.
    pub async fn teardown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.command_tx.send(Command::Teardown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

/// Conversation engine generic over the response generator
pub struct ConversationEngine<G: ResponseGenerator + 'static> {
    context: ConvContext,
    state: ConvState,
    transcript: Vec<Message>,
    generator: Arc<G>,
    signal_rx: watch::Receiver<Option<Emotion>>,
    rng: StdRng,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<TimerEvent>,
    event_rx: mpsc::Receiver<TimerEvent>,
    snapshot_tx: watch::Sender<Snapshot>,
    updates_tx: broadcast::Sender<ConversationUpdate>,
    timers: TimerScope,
}

impl<G: ResponseGenerator + 'static> ConversationEngine<G> {
    /// Build an engine whose transcript is seeded with the companion greeting
    pub fn new(
        context: ConvContext,
        generator: G,
        signal_rx: watch::Receiver<Option<Emotion>>,
        rng: StdRng,
    ) -> (Self, ConversationHandle) {
        let transcript = vec![Message::new(Origin::Companion, context.greeting.clone())];
        let (command_tx, command_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(32);
        let (updates_tx, _) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot {
            transcript: transcript.clone().into(),
            pending: false,
        });

        let engine = Self {
            context,
            state: ConvState::default(),
            transcript,
            generator: Arc::new(generator),
            signal_rx,
            rng,
            command_rx,
            event_tx,
            event_rx,
            snapshot_tx,
            updates_tx: updates_tx.clone(),
            timers: TimerScope::new("conversation"),
        };
        let handle = ConversationHandle {
            command_tx,
            snapshot_rx,
            updates_tx,
        };
        (engine, handle)
    }

    /// Build an engine and run it as a background task
    pub fn spawn(
        context: ConvContext,
        generator: G,
        signal_rx: watch::Receiver<Option<Emotion>>,
        rng: StdRng,
    ) -> ConversationHandle {
        let (engine, handle) = Self::new(context, generator, signal_rx, rng);
        tokio::spawn(engine.run());
        handle
    }

    pub async fn run(mut self) {
        tracing::info!("Starting conversation engine");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(Command::Submit { text, reply }) => {
                        let _ = reply.send(self.submit(text));
                    }
                    Some(Command::Teardown { reply }) => {
                        self.teardown();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.teardown();
                        break;
                    }
                },
                Some(event) = self.event_rx.recv() => self.handle_event(event),
            }
        }

        tracing::info!(turns = ?self.state, "Conversation engine stopped");
    }

    fn submit(&mut self, text: String) -> SubmitOutcome {
        match self.apply(Event::UserSubmit { text }) {
            Ok(()) => SubmitOutcome::Accepted,
            Err(reason) => {
                tracing::debug!(%reason, "Ignoring submission");
                SubmitOutcome::Ignored(reason)
            }
        }
    }

    fn handle_event(&mut self, TimerEvent { generation, event }: TimerEvent) {
        if !self.timers.is_current(generation) {
            tracing::debug!(%generation, "Discarding event from cancelled timer");
            return;
        }

        if let Event::ResponseReady {
            turn,
            outcome: ResponseOutcome::Failed { reason },
        } = &event
        {
            tracing::warn!(turn, %reason, "Response generation failed, using fallback reply");
        }

        if let Err(e) = self.apply(event) {
            tracing::debug!(error = %e, "Discarding conversation event");
        }
    }

    fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        let result = transition(&self.state, &self.context, event)?;
        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { origin, text } => {
                let message = Message::new(origin, text);
                tracing::debug!(id = %message.id(), ?origin, "Appending message");
                self.transcript.push(message.clone());
                self.publish_snapshot();
                let _ = self
                    .updates_tx
                    .send(ConversationUpdate::MessageAppended { message });
            }

            Effect::NotifyPending { pending } => {
                self.publish_snapshot();
                let _ = self
                    .updates_tx
                    .send(ConversationUpdate::PendingChanged { pending });
            }

            Effect::ScheduleResponse { turn } => self.schedule_response(turn),
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(Snapshot {
            transcript: self.transcript.clone().into(),
            pending: self.state.is_pending(),
        });
    }

    fn schedule_response(&mut self, turn: u64) {
        let delay = self.context.latency.sample(&mut self.rng);
        let limit = self.context.response_timeout;
        let transcript: Arc<[Message]> = self.transcript.clone().into();
        let generator = Arc::clone(&self.generator);
        let signal_rx = self.signal_rx.clone();
        let event_tx = self.event_tx.clone();
        let generation = self.timers.generation();

        tracing::debug!(turn, delay_ms = %delay.as_millis(), "Scheduling companion response");

        self.timers.spawn(async move {
            tokio::time::sleep(delay).await;
            let signal = *signal_rx.borrow();
            let request = ResponseRequest { transcript, signal };
            let outcome = generate_reply(generator.as_ref(), &request, limit).await;
            let event = Event::ResponseReady { turn, outcome };
            let _ = event_tx.send(TimerEvent { generation, event }).await;
        });
    }

    fn teardown(&mut self) {
        self.timers.cancel_all();
    }
}

/// Ask the generator for a reply, folding errors, timeouts and panics into a
/// failed outcome so the turn always completes.
async fn generate_reply<G: ResponseGenerator + ?Sized>(
    generator: &G,
    request: &ResponseRequest,
    limit: Duration,
) -> ResponseOutcome {
    let call = AssertUnwindSafe(generator.generate(request)).catch_unwind();
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(Ok(text))) => ResponseOutcome::Generated(text),
        Ok(Ok(Err(e))) => ResponseOutcome::Failed {
            reason: e.to_string(),
        },
        Ok(Err(_)) => ResponseOutcome::Failed {
            reason: "response generator panicked".to_string(),
        },
        Err(_) => ResponseOutcome::Failed {
            reason: format!("no response within {}ms", limit.as_millis()),
        },
    }
}
