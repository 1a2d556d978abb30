//! Core domain types for the guessing game.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::evaluator::Evaluation;

/// Smallest value the player may guess.
pub const MIN_GUESS: u8 = 1;

/// Largest value the player may guess.
pub const MAX_GUESS: u8 = 100;

/// Number of guesses allowed per game.
pub const MAX_ATTEMPTS: usize = 10;

/// Where a guess landed relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Guess was above the target.
    High,
    /// Guess was below the target.
    Low,
    /// Guess hit the target.
    Correct,
}

/// Lifecycle of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    /// Guesses are still accepted.
    Playing,
    /// The target was found.
    Won,
    /// Attempts ran out.
    Lost,
}

impl GameStatus {
    /// Returns true once the game accepts no more guesses.
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Playing)
    }
}

/// One submitted guess. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GuessRecord {
    value: u8,
    timestamp: DateTime<Utc>,
    distance: u8,
    direction: Direction,
}

impl GuessRecord {
    pub(super) fn new(value: u8, target: u8, direction: Direction) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
            distance: value.abs_diff(target),
            direction,
        }
    }
}

/// Complete state of one game.
///
/// Only [`TurnController`](crate::TurnController) moves a game forward, by
/// handing the state to [`GameState::record`] once per committed guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameState {
    target: u8,
    guesses: Vec<GuessRecord>,
    status: GameStatus,
    max_attempts: usize,
    message: String,
}

impl GameState {
    /// Creates a fresh game around `target`.
    ///
    /// `target` is clamped into the playable range.
    pub fn new(target: u8, max_attempts: usize, message: impl Into<String>) -> Self {
        Self {
            target: target.clamp(MIN_GUESS, MAX_GUESS),
            guesses: Vec::new(),
            status: GameStatus::Playing,
            max_attempts: max_attempts.max(1),
            message: message.into(),
        }
    }

    /// Guesses left before the game is lost.
    pub fn remaining_attempts(&self) -> usize {
        self.max_attempts.saturating_sub(self.guesses.len())
    }

    /// Values guessed so far, oldest first.
    pub fn guess_values(&self) -> Vec<u8> {
        self.guesses.iter().map(|g| g.value).collect()
    }

    /// Consumes the state and returns it with one more evaluated guess.
    pub(crate) fn record(mut self, evaluation: Evaluation, message: String) -> Self {
        let (record, status) = evaluation.into_parts();
        self.guesses.push(record);
        self.status = status;
        self.message = message;
        self
    }

    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}
