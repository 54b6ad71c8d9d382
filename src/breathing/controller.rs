//! Breathing controller runtime

use super::BreathingState;
use crate::session::SessionError;
use crate::timer::{Generation, TimerScope};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const COMPONENT: &str = "breathing controller";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Start,
    Pause,
    Toggle,
    Reset,
}

enum Command {
    Control {
        action: Action,
        reply: oneshot::Sender<BreathingState>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Tick {
    generation: Generation,
}

/// Handle to a running breathing controller
pub struct BreathingHandle {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<BreathingState>,
    updates_tx: broadcast::Sender<BreathingState>,
}

impl BreathingHandle {
    pub async fn start(&self) -> Result<BreathingState, SessionError> {
        self.control(Action::Start).await
    }

    pub async fn pause(&self) -> Result<BreathingState, SessionError> {
        self.control(Action::Pause).await
    }

    pub async fn toggle(&self) -> Result<BreathingState, SessionError> {
        self.control(Action::Toggle).await
    }

    pub async fn reset(&self) -> Result<BreathingState, SessionError> {
        self.control(Action::Reset).await
    }

    /// Latest published state. Still readable after close.
    pub fn state(&self) -> BreathingState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreathingState> {
        self.updates_tx.subscribe()
    }

    /// Stop the ticker for good. Safe to call repeatedly.
    pub async fn close(&self) {
        let (reply, rx) = oneshot::channel();
        if self.command_tx.send(Command::Close { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn control(&self, action: Action) -> Result<BreathingState, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(Command::Control { action, reply })
            .await
            .map_err(|_| SessionError::ComponentStopped(COMPONENT))?;
        rx.await.map_err(|_| SessionError::ComponentStopped(COMPONENT))
    }
}

pub struct BreathingController {
    state: BreathingState,
    tick_period: Duration,
    timers: TimerScope,
    command_rx: mpsc::Receiver<Command>,
    tick_tx: mpsc::Sender<Tick>,
    tick_rx: mpsc::Receiver<Tick>,
    state_tx: watch::Sender<BreathingState>,
    updates_tx: broadcast::Sender<BreathingState>,
}

impl BreathingController {
    pub fn new(tick_period: Duration) -> (Self, BreathingHandle) {
        let state = BreathingState::new();
        let (command_tx, command_rx) = mpsc::channel(16);
        let (tick_tx, tick_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(state);
        let (updates_tx, _) = broadcast::channel(64);

        let controller = Self {
            state,
            tick_period,
            timers: TimerScope::new("breathing"),
            command_rx,
            tick_tx,
            tick_rx,
            state_tx,
            updates_tx: updates_tx.clone(),
        };
        let handle = BreathingHandle {
            command_tx,
            state_rx,
            updates_tx,
        };
        (controller, handle)
    }

    /// Build a controller at `(inhale, 4, paused)` and run it in the background
    pub fn spawn(tick_period: Duration) -> BreathingHandle {
        let (controller, handle) = Self::new(tick_period);
        tokio::spawn(controller.run());
        handle
    }

    pub async fn run(mut self) {
        tracing::debug!(tick_ms = %self.tick_period.as_millis(), "Breathing controller opened");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(Command::Control { action, reply }) => {
                        self.apply(action);
                        let _ = reply.send(self.state);
                    }
                    Some(Command::Close { reply }) => {
                        self.close();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.close();
                        break;
                    }
                },
                Some(tick) = self.tick_rx.recv() => self.handle_tick(tick),
            }
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Start => {
                if self.state.start() {
                    self.timers
                        .every(self.tick_period, &self.tick_tx, |generation| Tick { generation });
                    self.publish();
                }
            }
            Action::Pause => {
                if self.state.pause() {
                    self.timers.cancel_all();
                    self.publish();
                }
            }
            Action::Toggle => {
                let next = if self.state.is_running() {
                    Action::Pause
                } else {
                    Action::Start
                };
                self.apply(next);
            }
            Action::Reset => {
                self.timers.cancel_all();
                self.state.reset();
                self.publish();
            }
        }
    }

    fn handle_tick(&mut self, tick: Tick) {
        if !self.timers.is_current(tick.generation) || !self.state.is_running() {
            tracing::debug!(generation = %tick.generation, "Ignoring stale breathing tick");
            return;
        }

        if let Some(phase) = self.state.tick() {
            tracing::debug!(
                %phase,
                cycles = self.state.completed_cycles(),
                "Breathing phase changed"
            );
        }
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state);
        let _ = self.updates_tx.send(self.state);
    }

    fn close(&mut self) {
        self.timers.cancel_all();
        tracing::debug!(cycles = self.state.completed_cycles(), "Breathing controller closed");
    }
}

#[cfg(test)]
mod tests {
    use super::super::Phase;
    use super::*;

    const TICK: Duration = Duration::from_secs(1);

    /// Sleep until halfway between ticks so every due tick has been applied
    async fn settle() {
        tokio::time::sleep(TICK / 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourteen_seconds_of_breathing() {
        let handle = BreathingController::spawn(TICK);
        let started = handle.start().await.unwrap();
        assert_eq!(started.phase(), Phase::Inhale);
        assert_eq!(started.seconds_remaining(), 4);
        assert!(started.is_running());

        settle().await;
        let mut seen = vec![(handle.state().phase(), handle.state().seconds_remaining())];
        for _ in 0..14 {
            tokio::time::sleep(TICK).await;
            let state = handle.state();
            seen.push((state.phase(), state.seconds_remaining()));
        }

        use Phase::*;
        assert_eq!(
            seen,
            vec![
                (Inhale, 4),
                (Inhale, 3),
                (Inhale, 2),
                (Inhale, 1),
                (Hold, 4),
                (Hold, 3),
                (Hold, 2),
                (Hold, 1),
                (Exhale, 6),
                (Exhale, 5),
                (Exhale, 4),
                (Exhale, 3),
                (Exhale, 2),
                (Exhale, 1),
                (Inhale, 4),
            ]
        );
        assert_eq!(handle.state().completed_cycles(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let handle = BreathingController::spawn(TICK);
        handle.start().await.unwrap();
        settle().await;
        handle.start().await.unwrap();
        tokio::time::sleep(TICK).await;

        // A second ticker would have moved two steps
        assert_eq!(handle.state().seconds_remaining(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_preserves_position() {
        let handle = BreathingController::spawn(TICK);
        handle.start().await.unwrap();
        settle().await;
        tokio::time::sleep(TICK * 5).await;

        let paused = handle.pause().await.unwrap();
        assert!(!paused.is_running());
        assert_eq!(paused.phase(), Phase::Hold);
        assert_eq!(paused.seconds_remaining(), 3);

        tokio::time::sleep(TICK * 30).await;
        assert_eq!(handle.state(), paused);

        // Resuming continues from where it stopped
        let resumed = handle.toggle().await.unwrap();
        assert!(resumed.is_running());
        tokio::time::sleep(TICK + TICK / 2).await;
        assert_eq!(handle.state().phase(), Phase::Hold);
        assert_eq!(handle.state().seconds_remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_flips_running() {
        let handle = BreathingController::spawn(TICK);
        assert!(handle.toggle().await.unwrap().is_running());
        assert!(!handle.toggle().await.unwrap().is_running());
        assert!(handle.toggle().await.unwrap().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_from_any_state() {
        let handle = BreathingController::spawn(TICK);
        assert_eq!(handle.reset().await.unwrap(), BreathingState::new());

        handle.start().await.unwrap();
        settle().await;
        tokio::time::sleep(TICK * 17).await;
        let reset = handle.reset().await.unwrap();
        assert_eq!(reset, BreathingState::new());

        // The ticker is gone after reset
        tokio::time::sleep(TICK * 5).await;
        assert_eq!(handle.state(), BreathingState::new());
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_are_broadcast() {
        let handle = BreathingController::spawn(TICK);
        let mut updates = handle.subscribe();

        handle.start().await.unwrap();
        assert!(updates.recv().await.unwrap().is_running());

        let ticked = updates.recv().await.unwrap();
        assert_eq!(ticked.seconds_remaining(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_changes_after_close() {
        let handle = BreathingController::spawn(TICK);
        handle.start().await.unwrap();
        settle().await;
        tokio::time::sleep(TICK * 2).await;
        handle.close().await;

        let closed = handle.state();
        tokio::time::sleep(TICK * 20).await;
        assert_eq!(handle.state(), closed);
        assert_eq!(
            handle.start().await.unwrap_err(),
            SessionError::ComponentStopped(COMPONENT)
        );

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_controller() {
        let (controller, handle) = BreathingController::new(TICK);
        let task = tokio::spawn(controller.run());
        handle.start().await.unwrap();
        drop(handle);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("controller should stop once its handle is gone")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_ticks_do_not_mutate_state() {
        let (mut controller, _handle) = BreathingController::new(TICK);
        let before_start = controller.timers.generation();

        controller.apply(Action::Start);
        let running_generation = controller.timers.generation();
        assert_eq!(before_start, running_generation);

        controller.apply(Action::Pause);
        let paused = controller.state;

        // A tick that slipped through before the pause
        controller.handle_tick(Tick {
            generation: running_generation,
        });
        assert_eq!(controller.state, paused);

        // Running again under a new generation still rejects the old one
        controller.apply(Action::Start);
        controller.handle_tick(Tick {
            generation: running_generation,
        });
        assert_eq!(controller.state.seconds_remaining(), 4);

        controller.handle_tick(Tick {
            generation: controller.timers.generation(),
        });
        assert_eq!(controller.state.seconds_remaining(), 3);

        // After close nothing applies
        controller.close();
        let closed = controller.state;
        controller.handle_tick(Tick {
            generation: running_generation.next(),
        });
        assert_eq!(controller.state, closed);
    }
}
