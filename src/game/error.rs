//! Rule errors for guesses and turns.

use derive_more::{Display, Error};

use super::types::{MAX_GUESS, MIN_GUESS};

/// Why a guess was refused by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GuessError {
    /// Input could not be read as an integer.
    #[display("'{}' is not a number", _0)]
    NotANumber(#[error(not(source))] String),

    /// Integer outside the playable range.
    #[display("{} is outside {}..={}", _0, MIN_GUESS, MAX_GUESS)]
    OutOfRange(#[error(not(source))] i64),

    /// History is already terminal.
    #[display("The game is already over")]
    GameOver,
}

/// Why the turn controller refused to start or finish a turn.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum TurnError {
    /// A previous turn has not been committed yet.
    #[display("A turn is already in flight")]
    InFlight,

    /// No more guesses are accepted.
    #[display("The game is over; restart to play again")]
    GameOver,

    /// The submitted input failed validation.
    #[display("Invalid guess: {}", _0)]
    InvalidGuess(GuessError),

    /// The resolved turn belongs to a different game round.
    #[display("Turn for round {} does not match current round {}", got, expected)]
    StaleTurn {
        /// Round the controller is on.
        expected: u64,
        /// Round the turn was started in.
        got: u64,
    },
}

impl From<GuessError> for TurnError {
    fn from(err: GuessError) -> Self {
        Self::InvalidGuess(err)
    }
}
