//! Aura - terminal front end
//!
//! Drives one session with the simulated collaborators. Plain lines are
//! sent to the companion; slash commands control the tools. Every update is
//! printed to stdout as one JSON object per line, logs go to stderr.

use aura_companion::collaborators::simulated::{
    LoggingSpeech, RandomClassifier, ScriptedResponder, SimulatedCamera,
};
use aura_companion::{Collaborators, Session, SessionConfig};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CLASSIFIER_RNG: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreathAction {
    Open,
    Start,
    Pause,
    Toggle,
    Reset,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Say(String),
    Breathe(BreathAction),
    Affirm,
    Listen,
    Sense(bool),
    Status,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Say(line.to_string());
    };

    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("breathe"), None | Some("open")) => Input::Breathe(BreathAction::Open),
        (Some("breathe"), Some("start")) => Input::Breathe(BreathAction::Start),
        (Some("breathe"), Some("pause")) => Input::Breathe(BreathAction::Pause),
        (Some("breathe"), Some("toggle")) => Input::Breathe(BreathAction::Toggle),
        (Some("breathe"), Some("reset")) => Input::Breathe(BreathAction::Reset),
        (Some("breathe"), Some("close")) => Input::Breathe(BreathAction::Close),
        (Some("affirm"), None) => Input::Affirm,
        (Some("listen"), None) => Input::Listen,
        (Some("sense"), Some("on")) => Input::Sense(true),
        (Some("sense"), Some("off")) => Input::Sense(false),
        (Some("status"), None) => Input::Status,
        (Some("help"), None) => Input::Help,
        (Some("quit" | "exit"), None) => Input::Quit,
        _ => Input::Unknown(trimmed.to_string()),
    }
}

const HELP: &str = "commands: /breathe [open|start|pause|toggle|reset|close], /affirm, /listen, \
/sense on|off, /status, /quit; anything else is sent to Aura";

fn emit<T: Serialize>(source: &str, event: &T) {
    match serde_json::to_string(&serde_json::json!({ "source": source, "event": event })) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize update"),
    }
}

/// Print every update from `rx` until its sender goes away
fn forward<T>(source: &'static str, mut rx: broadcast::Receiver<T>)
where
    T: Clone + Serialize + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => emit(source, &update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(source, skipped, "Dropped updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn breathe(session: &mut Session, action: BreathAction) {
    if action == BreathAction::Close {
        session.close_breathing().await;
        emit("breathing", &"closed");
        return;
    }

    let opened = session.breathing().is_none();
    let breathing = session.open_breathing();
    if opened {
        forward("breathing", breathing.subscribe());
    }

    let result = match action {
        BreathAction::Open => Ok(breathing.state()),
        BreathAction::Start => breathing.start().await,
        BreathAction::Pause => breathing.pause().await,
        BreathAction::Toggle => breathing.toggle().await,
        BreathAction::Reset => breathing.reset().await,
        BreathAction::Close => return,
    };
    match result {
        Ok(state) => emit("breathing", &state),
        Err(e) => tracing::warn!(error = %e, "Breathing command failed"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aura_companion=info,aura=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = SessionConfig::from_env();
    tracing::info!(?config, "Configuration loaded");

    let collaborators = Collaborators {
        responder: ScriptedResponder,
        camera: SimulatedCamera::new(config.camera_available),
        classifier: RandomClassifier::new(config.rng(CLASSIFIER_RNG)),
        speech: Arc::new(LoggingSpeech),
    };
    let mut session = Session::start(config, collaborators);

    forward("conversation", session.conversation().subscribe());
    forward("sampling", session.sampling().subscribe());
    for message in session.conversation().current_transcript() {
        emit("conversation", &message);
    }
    eprintln!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Say(text) => match session.conversation().submit(text).await {
                Ok(outcome) => tracing::debug!(?outcome, "Submitted"),
                Err(e) => tracing::warn!(error = %e, "Conversation unavailable"),
            },
            Input::Breathe(action) => breathe(&mut session, action).await,
            Input::Affirm => emit("affirmation", &session.next_affirmation()),
            Input::Listen => session.speak_affirmation(),
            Input::Sense(true) => match session.sampling().activate().await {
                Ok(outcome) => tracing::info!(?outcome, "Sampling activation"),
                Err(e) => tracing::warn!(error = %e, "Sampling unavailable"),
            },
            Input::Sense(false) => {
                if let Err(e) = session.sampling().deactivate().await {
                    tracing::warn!(error = %e, "Sampling unavailable");
                }
            }
            Input::Status => {
                emit(
                    "status",
                    &serde_json::json!({
                        "pending_response": session.conversation().pending_response(),
                        "signal": session.current_signal(),
                        "sampling": session.sampling().status(),
                        "breathing": session.breathing().map(|b| b.state()),
                        "affirmation": session.affirmation(),
                    }),
                );
            }
            Input::Help => eprintln!("{HELP}"),
            Input::Quit => break,
            Input::Unknown(command) => eprintln!("unknown command: {command}"),
        }
    }

    session.teardown().await;
    Ok(())
}
