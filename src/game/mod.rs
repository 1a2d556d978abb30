//! Guessing game rules: types, evaluation and invariants.

mod error;
mod evaluator;
pub mod invariants;
mod types;

pub use error::{GuessError, TurnError};
pub use evaluator::{Evaluation, direction, evaluate, parse_guess, validate_guess};
pub use invariants::{GameInvariants, Invariant, InvariantSet, InvariantViolation};
pub use types::{
    Direction, GameState, GameStatus, GuessRecord, MAX_ATTEMPTS, MAX_GUESS, MIN_GUESS,
};
