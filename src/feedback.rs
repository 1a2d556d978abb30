//! The Sage: flavor text and narration from hosted models.
//!
//! Turn logic only sees the [`FeedbackCollaborator`] and
//! [`SpeechSynthesizer`] traits. [`SageOracle`] implements both on top of
//! [`LlmClient`] with retries; [`OfflineSage`] never reaches the network.

use std::sync::Arc;

use async_trait::async_trait;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::audio::SoundBoard;
use crate::game::{Direction, direction};
use crate::llm_client::{LlmClient, LlmError, LlmErrorKind, SpeechClip};
use crate::retry::RetryPolicy;

/// Shown when a new game opens and no greeting could be fetched.
pub const FALLBACK_GREETING: &str =
    "Welcome to the mouth of the nebula, seeker. Let the search for the number begin.";

/// Shown when the model answers with nothing usable.
pub const FALLBACK_SILENCE: &str = "The cosmic energies are strangely unsettled...";

/// Persona instructions sent as the system prompt.
pub const SAGE_PERSONA: &str = "You are \"The Nebula Sage\", an ancient oracle adrift among the stars. \
Speak in a formal, archaic and mysterious tone. Answer in at most two sentences. \
Never reveal the secret number outright.";

/// Everything the Sage is told about a turn.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct FeedbackRequest {
    guess: u8,
    target: u8,
    /// 1-based attempt number; 0 asks for a greeting.
    attempt: usize,
    /// Guessed values so far, including this one.
    history: Vec<u8>,
}

impl FeedbackRequest {
    /// Creates a request for a guess.
    pub fn new(guess: u8, target: u8, attempt: usize, history: Vec<u8>) -> Self {
        Self {
            guess,
            target,
            attempt,
            history,
        }
    }

    /// Creates a request for the opening greeting of a game.
    pub fn greeting(target: u8) -> Self {
        Self::new(0, target, 0, Vec::new())
    }

    /// Whether this asks for a greeting rather than a verdict.
    pub fn is_greeting(&self) -> bool {
        self.attempt == 0
    }

    /// Direction of the guess, or `None` for a greeting.
    pub fn direction(&self) -> Option<Direction> {
        (!self.is_greeting()).then(|| direction(self.guess, self.target))
    }

    /// The user prompt for this request.
    pub fn prompt(&self) -> String {
        if self.is_greeting() {
            return "A traveller has just entered your realm to play a number guessing game \
                    (1-100). Greet them mystically."
                .to_string();
        }
        let history = self
            .history
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "The user is playing a number guessing game (1-100). Secret: {}, Guess: {}, \
             Attempt: {}. Guesses so far: [{}]. Provide mystical and brief feedback that \
             hints whether they must rise or descend. Keep it wise and mysterious.",
            self.target, self.guess, self.attempt, history
        )
    }
}

/// Canned line used when the Sage cannot be reached.
pub fn fallback_message(direction: Option<Direction>) -> &'static str {
    match direction {
        None => FALLBACK_GREETING,
        Some(Direction::Correct) => "Victory is yours, seeker.",
        Some(Direction::High) => "Your energy has soared too high.",
        Some(Direction::Low) => "Your gaze falls too low.",
    }
}

/// Source of flavor text for a turn.
#[async_trait]
pub trait FeedbackCollaborator: Send + Sync {
    /// Produces the Sage's words for `request`.
    async fn feedback(&self, request: &FeedbackRequest) -> Result<String, LlmError>;
}

/// Source of synthesized speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Renders `text` as speech.
    async fn synthesize(&self, text: &str) -> Result<SpeechClip, LlmError>;
}

/// The Sage backed by a hosted model.
#[derive(Debug, Clone)]
pub struct SageOracle {
    client: LlmClient,
    retry: RetryPolicy,
}

impl SageOracle {
    /// Creates an oracle over `client` using `retry` for every call.
    #[instrument(skip(client))]
    pub fn new(client: LlmClient, retry: RetryPolicy) -> Self {
        info!("Creating Sage oracle");
        Self { client, retry }
    }
}

#[async_trait]
impl FeedbackCollaborator for SageOracle {
    #[instrument(skip(self, request), fields(attempt = request.attempt, guess = request.guess))]
    async fn feedback(&self, request: &FeedbackRequest) -> Result<String, LlmError> {
        let prompt = request.prompt();
        let text = self
            .retry
            .run(|| self.client.generate(SAGE_PERSONA, &prompt))
            .await?;
        debug!(chars = text.len(), "Sage answered");
        if text.trim().is_empty() {
            Ok(FALLBACK_SILENCE.to_string())
        } else {
            Ok(text)
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for SageOracle {
    #[instrument(skip(self, text))]
    async fn synthesize(&self, text: &str) -> Result<SpeechClip, LlmError> {
        self.retry
            .run(|| self.client.synthesize_speech(text))
            .await
    }
}

/// A Sage that never answers, so every turn uses the fallback lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSage;

#[async_trait]
impl FeedbackCollaborator for OfflineSage {
    async fn feedback(&self, _request: &FeedbackRequest) -> Result<String, LlmError> {
        Err(LlmError::new(
            LlmErrorKind::Unsupported,
            "Sage is offline".to_string(),
        ))
    }
}

#[async_trait]
impl SpeechSynthesizer for OfflineSage {
    async fn synthesize(&self, _text: &str) -> Result<SpeechClip, LlmError> {
        Err(LlmError::new(
            LlmErrorKind::Unsupported,
            "Sage is offline".to_string(),
        ))
    }
}

/// Speaks `text` in the background. Failures are logged and dropped.
///
/// The line's place in order is fixed before synthesis starts, so a slow
/// clip never cuts off a line requested after it.
#[instrument(skip_all, fields(chars = text.len()))]
pub fn narrate(
    voice: Arc<dyn SpeechSynthesizer>,
    sounds: SoundBoard,
    text: String,
) -> tokio::task::JoinHandle<()> {
    let ticket = sounds.speech_ticket();
    tokio::spawn(async move {
        match voice.synthesize(&text).await {
            Ok(clip) if clip.samples().is_empty() => debug!("Speech came back empty"),
            Ok(clip) => {
                debug!(duration_ms = clip.duration().as_millis() as u64, "Playing narration");
                sounds.play_speech(ticket, &clip);
            }
            Err(e) => warn!(error = %e, "Narration failed"),
        }
    })
}
