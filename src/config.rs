//! Session configuration

use crate::conversation::{ConvContext, LatencyWindow};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::str::FromStr;
use std::time::Duration;

/// Timing and simulation settings for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub response_latency: LatencyWindow,
    pub response_timeout: Duration,
    pub breath_tick: Duration,
    pub sample_period: Duration,
    /// Fixed seed for every random source; entropy when unset
    pub seed: Option<u64>,
    /// Whether the simulated camera grants access
    pub camera_available: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_latency: LatencyWindow::default(),
            response_timeout: ConvContext::default().response_timeout,
            breath_tick: Duration::from_secs(1),
            sample_period: Duration::from_secs(3),
            seed: None,
            camera_available: true,
        }
    }
}

impl SessionConfig {
    /// Read `AURA_*` variables, keeping the default for anything missing or
    /// unparsable
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str| parsed::<u64>(&lookup, key);

        let delay = read("AURA_RESPONSE_DELAY_MS")
            .map_or(defaults.response_latency.min(), Duration::from_millis);
        let jitter = read("AURA_RESPONSE_JITTER_MS").map_or(Duration::ZERO, Duration::from_millis);

        Self {
            response_latency: LatencyWindow::between(delay, delay + jitter),
            response_timeout: read("AURA_RESPONSE_TIMEOUT_MS")
                .map_or(defaults.response_timeout, Duration::from_millis),
            breath_tick: read("AURA_BREATH_TICK_MS")
                .map_or(defaults.breath_tick, Duration::from_millis),
            sample_period: read("AURA_SAMPLE_PERIOD_MS")
                .map_or(defaults.sample_period, Duration::from_millis),
            seed: read("AURA_SEED"),
            camera_available: parsed::<bool>(&lookup, "AURA_CAMERA_AVAILABLE")
                .unwrap_or(defaults.camera_available),
        }
    }

    pub fn conversation_context(&self) -> ConvContext {
        ConvContext {
            latency: self.response_latency,
            response_timeout: self.response_timeout,
            ..ConvContext::default()
        }
    }

    /// Random source for one consumer. Seeded configs give each `stream` its
    /// own reproducible sequence.
    pub fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}
