//! Per-component timer scopes
//!
//! Every component owns exactly one `TimerScope`. Timers are tokio tasks that
//! race the scope's cancellation token, and every event they deliver carries
//! the generation it was scheduled under. Cancelling advances the generation,
//! so an event that slips through after cancellation is recognisably stale.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Monotonic counter identifying one batch of scheduled timers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cancellable set of timers owned by a single component
pub struct TimerScope {
    name: &'static str,
    token: CancellationToken,
    generation: Generation,
}

impl TimerScope {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            token: CancellationToken::new(),
            generation: Generation::default(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether an event scheduled under `generation` may still be applied
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    /// Cancel every outstanding timer and advance the generation.
    pub fn cancel_all(&mut self) -> Generation {
        self.token.cancel();
        self.token = CancellationToken::new();
        self.generation = self.generation.next();
        tracing::debug!(scope = self.name, generation = %self.generation, "Timers cancelled");
        self.generation
    }

    /// Deliver `make_event(generation)` to `tx` once per `period`.
    ///
    /// The first delivery happens one full period from now, never immediately.
    pub fn every<E, F>(&self, period: Duration, tx: &mpsc::Sender<E>, mut make_event: F)
    where
        E: Send + 'static,
        F: FnMut(Generation) -> E + Send + 'static,
    {
        // tokio intervals panic on a zero period
        let period = period.max(Duration::from_millis(1));
        let tx = tx.clone();
        let generation = self.generation;
        self.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if tx.send(make_event(generation)).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Run `task` in the background until it finishes or the scope is cancelled
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = task => {}
            }
        });
    }
}

impl Drop for TimerScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
