//! Nebula Sage library - a number guessing game narrated by an oracle
//!
//! The player hunts a secret number between 1 and 100 in a limited number of
//! guesses while a hosted language model plays the Sage.
//!
//! # Architecture
//!
//! - **Game**: pure rules (evaluation, status, invariants)
//! - **Turn**: single-flight controller that drives the rules
//! - **Feedback**: the Sage's words and voice, with fallbacks
//! - **Audio**: procedural cues and ambience
//! - **TUI**: ratatui front end
//!
//! # Example
//!
//! ```no_run
//! use nebula_sage::{OfflineSage, TurnController};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut game = TurnController::new(42, 10);
//! let report = game.play_turn("50", &OfflineSage).await?;
//! println!("{}", report.message());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod audio;
pub mod config;
pub mod feedback;
pub mod game;
pub mod llm_client;
pub mod retry;
pub mod simulate;
pub mod tui;
pub mod turn;

// Crate-level exports - Configuration
pub use config::{ConfigError, DEFAULT_CONFIG_FILE, SageConfig};

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmErrorKind, LlmProvider, SpeechClip};

// Crate-level exports - Retry
pub use retry::{Classify, ErrorClass, RetryPolicy, with_retry};

// Crate-level exports - Sage collaborators
pub use feedback::{
    FeedbackCollaborator, FeedbackRequest, OfflineSage, SageOracle, SpeechSynthesizer,
    fallback_message, narrate,
};

// Crate-level exports - Game rules
pub use game::{
    Direction, GameState, GameStatus, GuessError, GuessRecord, MAX_ATTEMPTS, MAX_GUESS,
    MIN_GUESS, TurnError,
};

// Crate-level exports - Turns and audio
pub use audio::{Cue, SoundBoard, SpeechTicket};
pub use turn::{PendingTurn, ResolvedTurn, TurnController, TurnReport};
