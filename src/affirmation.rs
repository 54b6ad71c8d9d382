//! Affirmation rotator

use crate::collaborators::{SpeechOutput, Utterance};
use rand::Rng;

pub const AFFIRMATIONS: [&str; 10] = [
    "You are stronger than you think, and braver than you believe.",
    "Every challenge you face is making you wiser and more resilient.",
    "Your feelings are valid, and it's okay to take things one step at a time.",
    "You have survived difficult times before, and you will get through this too.",
    "You deserve love, kindness, and compassion - especially from yourself.",
    "Your mental health matters, and taking care of yourself is not selfish.",
    "You are worthy of peace, happiness, and all the good things life has to offer.",
    "It's okay to not be okay sometimes. Healing is not linear.",
    "You have the power to create positive change in your life.",
    "You are not alone in this journey. There are people who care about you.",
];

const SPEECH_RATE: f32 = 0.8;
const SPEECH_PITCH: f32 = 1.1;

/// Picks affirmations from the fixed catalog
pub struct AffirmationRotator<R: Rng> {
    rng: R,
    index: usize,
}

impl<R: Rng> AffirmationRotator<R> {
    /// The first affirmation is drawn from `rng`
    pub fn new(mut rng: R) -> Self {
        let index = rng.gen_range(0..AFFIRMATIONS.len());
        Self { rng, index }
    }

    pub fn current(&self) -> &'static str {
        AFFIRMATIONS[self.index]
    }

    /// Move to a different affirmation and return it
    pub fn rotate(&mut self) -> &'static str {
        let offset = self.rng.gen_range(1..AFFIRMATIONS.len());
        self.index = (self.index + offset) % AFFIRMATIONS.len();
        self.current()
    }

    pub fn utterance(&self) -> Utterance {
        Utterance {
            text: self.current().to_string(),
            rate: SPEECH_RATE,
            pitch: SPEECH_PITCH,
        }
    }

    /// Best effort: failures are logged and dropped
    pub fn speak(&self, output: &dyn SpeechOutput) {
        if let Err(e) = output.speak(&self.utterance()) {
            tracing::debug!(error = %e, "Speech output unavailable");
        }
    }
}
