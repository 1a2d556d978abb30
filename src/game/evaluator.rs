//! Guess evaluation.
//!
//! Pure functions that classify a guess against the target and decide the
//! status the game moves to. Nothing here touches a [`GameState`]; the turn
//! controller applies the returned [`Evaluation`].
//!
//! [`GameState`]: super::GameState

use std::cmp::Ordering;

use derive_getters::Getters;
use tracing::{debug, instrument};

use super::error::GuessError;
use super::types::{Direction, GameStatus, GuessRecord, MAX_GUESS, MIN_GUESS};

/// Outcome of evaluating one guess against a history.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Evaluation {
    /// Record to append.
    record: GuessRecord,
    /// Status after appending the record.
    status: GameStatus,
    /// 1-based attempt number of this guess.
    attempt: usize,
}

impl Evaluation {
    /// Direction of the evaluated guess.
    pub fn direction(&self) -> Direction {
        *self.record.direction()
    }

    pub(super) fn into_parts(self) -> (GuessRecord, GameStatus) {
        (self.record, self.status)
    }
}

/// Three-way comparison of a guess against the target.
pub fn direction(guess: u8, target: u8) -> Direction {
    match guess.cmp(&target) {
        Ordering::Greater => Direction::High,
        Ordering::Less => Direction::Low,
        Ordering::Equal => Direction::Correct,
    }
}

/// Checks that `value` lies in the playable range.
pub fn validate_guess(value: i64) -> Result<u8, GuessError> {
    if (i64::from(MIN_GUESS)..=i64::from(MAX_GUESS)).contains(&value) {
        // Range check above guarantees the cast fits.
        Ok(value as u8)
    } else {
        Err(GuessError::OutOfRange(value))
    }
}

/// Parses raw player input into a validated guess.
#[instrument]
pub fn parse_guess(input: &str) -> Result<u8, GuessError> {
    let trimmed = input.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| GuessError::NotANumber(trimmed.to_string()))?;
    validate_guess(value)
}

/// Evaluates `guess` against `target` given the guesses already made.
///
/// # Errors
///
/// - [`GuessError::OutOfRange`] if `guess` is outside 1..=100.
/// - [`GuessError::GameOver`] if `history` already holds a correct guess or
///   has used up `max_attempts`.
#[instrument(skip(history), fields(prior = history.len()))]
pub fn evaluate(
    guess: i64,
    target: u8,
    history: &[GuessRecord],
    max_attempts: usize,
) -> Result<Evaluation, GuessError> {
    let value = validate_guess(guess)?;

    let already_won = history
        .iter()
        .any(|r| *r.direction() == Direction::Correct);
    if already_won || history.len() >= max_attempts {
        return Err(GuessError::GameOver);
    }

    let direction = direction(value, target);
    let attempt = history.len() + 1;

    let status = match direction {
        Direction::Correct => GameStatus::Won,
        _ if attempt >= max_attempts => GameStatus::Lost,
        _ => GameStatus::Playing,
    };

    debug!(value, %direction, %status, attempt, "Guess evaluated");

    Ok(Evaluation {
        record: GuessRecord::new(value, target, direction),
        status,
        attempt,
    })
}
