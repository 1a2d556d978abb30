//! First-class invariants for the guessing game.
//!
//! Invariants are logical properties that must hold for every [`GameState`]
//! the turn controller produces. They are checked after each commit in debug
//! builds and can be tested independently.

use super::evaluator::direction;
use super::types::{Direction, GameState, GameStatus};

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implemented for tuples of up to four invariants.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! impl_invariant_set {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>,)+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let mut violations = Vec::new();
                $(
                    if !$inv::holds(state) {
                        violations.push(InvariantViolation::new($inv::description()));
                    }
                )+
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

impl_invariant_set!(I1, I2);
impl_invariant_set!(I1, I2, I3);
impl_invariant_set!(I1, I2, I3, I4);

/// Guess count never exceeds the attempt limit.
pub struct BoundedHistoryInvariant;

impl Invariant<GameState> for BoundedHistoryInvariant {
    fn holds(state: &GameState) -> bool {
        state.guesses().len() <= *state.max_attempts()
    }

    fn description() -> &'static str {
        "Guess count never exceeds max attempts"
    }
}

/// Status is `Won` exactly when some record is correct.
pub struct WinIffCorrectInvariant;

impl Invariant<GameState> for WinIffCorrectInvariant {
    fn holds(state: &GameState) -> bool {
        let has_correct = state
            .guesses()
            .iter()
            .any(|g| *g.direction() == Direction::Correct);
        has_correct == (*state.status() == GameStatus::Won)
    }

    fn description() -> &'static str {
        "Status is won iff a correct guess was recorded"
    }
}

/// Status is `Lost` exactly when attempts ran out without a win.
pub struct LossIffExhaustedInvariant;

impl Invariant<GameState> for LossIffExhaustedInvariant {
    fn holds(state: &GameState) -> bool {
        let has_correct = state
            .guesses()
            .iter()
            .any(|g| *g.direction() == Direction::Correct);
        let exhausted = !has_correct && state.guesses().len() == *state.max_attempts();
        exhausted == (*state.status() == GameStatus::Lost)
    }

    fn description() -> &'static str {
        "Status is lost iff attempts are exhausted without a win"
    }
}

/// Every record agrees with the target it was scored against.
pub struct ConsistentRecordsInvariant;

impl Invariant<GameState> for ConsistentRecordsInvariant {
    fn holds(state: &GameState) -> bool {
        let target = *state.target();
        state.guesses().iter().all(|g| {
            *g.distance() == g.value().abs_diff(target) && *g.direction() == direction(*g.value(), target)
        })
    }

    fn description() -> &'static str {
        "Each record's distance and direction match the target"
    }
}

/// All game invariants as a composable set.
pub type GameInvariants = (
    BoundedHistoryInvariant,
    WinIffCorrectInvariant,
    LossIffExhaustedInvariant,
    ConsistentRecordsInvariant,
);
