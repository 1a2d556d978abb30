//! Turn controller: the only code that moves a game forward.
//!
//! A turn runs in three steps so the caller can await the Sage without
//! holding the controller:
//!
//! 1. [`TurnController::submit`] validates input, evaluates the guess and
//!    marks the turn in flight.
//! 2. [`PendingTurn::resolve`] asks the Sage for words, falling back to a
//!    canned line on any failure.
//! 3. [`TurnController::commit`] applies the guess and reports the cues.

use derive_getters::Getters;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::audio::Cue;
use crate::feedback::{FeedbackCollaborator, FeedbackRequest, fallback_message};
use crate::game::{
    Direction, Evaluation, GameInvariants, GameState, GameStatus, GuessRecord, InvariantSet,
    MAX_GUESS, MIN_GUESS, TurnError, evaluate, parse_guess,
};

/// Opening line of a fresh game.
pub const WELCOME_MESSAGE: &str = "Welcome, seeker. The Nebula Sage awaits your guess.";

/// Opening line after a restart.
pub const RESTART_MESSAGE: &str =
    "The cosmic gears have been reset. A new number has taken shape.";

/// A guess that has been evaluated but not yet applied.
#[derive(Debug, Clone, Getters)]
pub struct PendingTurn {
    round: u64,
    evaluation: Evaluation,
    request: FeedbackRequest,
}

impl PendingTurn {
    /// Cue to play as soon as the guess is accepted.
    pub fn cue(&self) -> Cue {
        Cue::Scan
    }

    /// Asks `sage` for the turn's message. Never fails: errors become the
    /// fallback line for the guess's direction.
    #[instrument(skip_all, fields(round = self.round, attempt = self.request.attempt()))]
    pub async fn resolve(self, sage: &dyn FeedbackCollaborator) -> ResolvedTurn {
        let (message, used_fallback) = match sage.feedback(&self.request).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(error = %e, "Sage unavailable, using fallback");
                (fallback_message(self.request.direction()).to_string(), true)
            }
        };
        ResolvedTurn {
            pending: self,
            message,
            used_fallback,
        }
    }
}

/// A pending turn together with the Sage's message.
#[derive(Debug, Clone, Getters)]
pub struct ResolvedTurn {
    pending: PendingTurn,
    message: String,
    used_fallback: bool,
}

/// What a committed turn produced.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct TurnReport {
    record: GuessRecord,
    status: GameStatus,
    message: String,
    cues: Vec<Cue>,
    used_fallback: bool,
    attempts_left: usize,
}

/// Cues played once a turn's outcome is known.
pub fn outcome_cues(status: GameStatus, direction: Direction) -> Vec<Cue> {
    match status {
        GameStatus::Won => vec![Cue::Victory],
        GameStatus::Lost => vec![Cue::GameOver],
        GameStatus::Playing => match direction {
            Direction::High => vec![Cue::SageIntro, Cue::HintHigh],
            Direction::Low | Direction::Correct => vec![Cue::SageIntro, Cue::HintLow],
        },
    }
}

/// Draws a target uniformly from the playable range.
pub fn random_target<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(MIN_GUESS..=MAX_GUESS)
}

/// Owns the game state and the single-flight flag.
#[derive(Debug, Clone)]
pub struct TurnController {
    state: GameState,
    in_flight: bool,
    round: u64,
}

impl TurnController {
    /// Starts a game around `target`.
    #[instrument]
    pub fn new(target: u8, max_attempts: usize) -> Self {
        info!("New game");
        Self {
            state: GameState::new(target, max_attempts, WELCOME_MESSAGE),
            in_flight: false,
            round: 0,
        }
    }

    /// Starts a game with a target drawn from `rng`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, max_attempts: usize) -> Self {
        Self::new(random_target(rng), max_attempts)
    }

    /// Current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Whether a turn is waiting to be committed.
    pub fn is_processing(&self) -> bool {
        self.in_flight
    }

    /// Counter bumped by every restart.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Accepts raw input and begins a turn.
    ///
    /// # Errors
    ///
    /// - [`TurnError::InFlight`] while another turn is pending.
    /// - [`TurnError::GameOver`] once the game is won or lost.
    /// - [`TurnError::InvalidGuess`] for non-numeric or out-of-range input.
    ///
    /// The state is untouched on error.
    #[instrument(skip(self), fields(round = self.round))]
    pub fn submit(&mut self, input: &str) -> Result<PendingTurn, TurnError> {
        if self.in_flight {
            debug!("Rejecting guess: turn in flight");
            return Err(TurnError::InFlight);
        }
        if self.state.status().is_terminal() {
            debug!("Rejecting guess: game over");
            return Err(TurnError::GameOver);
        }

        let value = parse_guess(input)?;
        let evaluation = evaluate(
            i64::from(value),
            *self.state.target(),
            self.state.guesses(),
            *self.state.max_attempts(),
        )?;

        let mut history = self.state.guess_values();
        history.push(value);
        let request = FeedbackRequest::new(
            value,
            *self.state.target(),
            *evaluation.attempt(),
            history,
        );

        self.in_flight = true;
        info!(value, direction = %evaluation.direction(), "Turn started");
        Ok(PendingTurn {
            round: self.round,
            evaluation,
            request,
        })
    }

    /// Applies a resolved turn and clears the in-flight flag.
    ///
    /// # Errors
    ///
    /// [`TurnError::StaleTurn`] if the turn was started before a restart.
    #[instrument(skip_all, fields(round = self.round))]
    pub fn commit(&mut self, resolved: ResolvedTurn) -> Result<TurnReport, TurnError> {
        let ResolvedTurn {
            pending,
            message,
            used_fallback,
        } = resolved;

        if pending.round != self.round {
            warn!(got = pending.round, "Discarding stale turn");
            return Err(TurnError::StaleTurn {
                expected: self.round,
                got: pending.round,
            });
        }

        let record = pending.evaluation.record().clone();
        let status = *pending.evaluation.status();
        let state = std::mem::replace(&mut self.state, GameState::new(0, 1, ""));
        self.state = state.record(pending.evaluation, message.clone());
        self.in_flight = false;

        debug_assert!(
            GameInvariants::check_all(&self.state).is_ok(),
            "game invariants violated: {:?}",
            GameInvariants::check_all(&self.state)
        );

        info!(%status, used_fallback, "Turn committed");
        Ok(TurnReport {
            cues: outcome_cues(status, *record.direction()),
            attempts_left: self.state.remaining_attempts(),
            record,
            status,
            message,
            used_fallback,
        })
    }

    /// Runs submit, resolve and commit in one go.
    pub async fn play_turn(
        &mut self,
        input: &str,
        sage: &dyn FeedbackCollaborator,
    ) -> Result<TurnReport, TurnError> {
        let pending = self.submit(input)?;
        let resolved = pending.resolve(sage).await;
        self.commit(resolved)
    }

    /// Starts over with a new target. Returns the cue to play.
    ///
    /// # Errors
    ///
    /// [`TurnError::InFlight`] while a turn is pending.
    #[instrument(skip(self))]
    pub fn restart(&mut self, target: u8) -> Result<Cue, TurnError> {
        if self.in_flight {
            return Err(TurnError::InFlight);
        }
        self.round += 1;
        self.state = GameState::new(target, *self.state.max_attempts(), RESTART_MESSAGE);
        info!(round = self.round, "Game restarted");
        Ok(Cue::Reset)
    }

    /// Replaces the message of a game that has no guesses yet.
    ///
    /// Used for the opening greeting; ignored once play has started.
    pub fn set_greeting(&mut self, message: impl Into<String>) -> bool {
        if !self.state.guesses().is_empty() {
            return false;
        }
        let state = std::mem::replace(&mut self.state, GameState::new(0, 1, ""));
        self.state = state.with_message(message);
        true
    }
}
