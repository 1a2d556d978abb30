//! Headless games played by a bisection strategy.
//!
//! Drives the real [`TurnController`], so every rule and fallback path is
//! exercised exactly as in interactive play.

use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::feedback::FeedbackCollaborator;
use crate::game::{Direction, GameStatus, MAX_GUESS, MIN_GUESS, TurnError};
use crate::turn::{TurnController, random_target};

/// Outcome of one simulated game.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct GameSummary {
    target: u8,
    guesses: Vec<u8>,
    status: GameStatus,
    fallbacks: usize,
}

/// Aggregate over a batch of simulated games.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct SimulationReport {
    games: Vec<GameSummary>,
    wins: usize,
    losses: usize,
    max_guesses: usize,
    mean_guesses: f64,
}

impl SimulationReport {
    fn from_games(games: Vec<GameSummary>) -> Self {
        let wins = games
            .iter()
            .filter(|g| g.status == GameStatus::Won)
            .count();
        let total: usize = games.iter().map(|g| g.guesses.len()).sum();
        let max_guesses = games.iter().map(|g| g.guesses.len()).max().unwrap_or(0);
        let mean_guesses = if games.is_empty() {
            0.0
        } else {
            total as f64 / games.len() as f64
        };
        Self {
            losses: games.len() - wins,
            wins,
            max_guesses,
            mean_guesses,
            games,
        }
    }
}

/// Narrows `[low, high]` around the target.
#[derive(Debug, Clone, Copy)]
struct Bisector {
    low: u8,
    high: u8,
}

impl Bisector {
    fn new() -> Self {
        Self {
            low: MIN_GUESS,
            high: MAX_GUESS,
        }
    }

    fn next(&self) -> u8 {
        self.low + (self.high - self.low) / 2
    }

    fn narrow(&mut self, guess: u8, direction: Direction) {
        match direction {
            Direction::High => self.high = guess.saturating_sub(1).max(self.low),
            Direction::Low => self.low = guess.saturating_add(1).min(self.high),
            Direction::Correct => {
                self.low = guess;
                self.high = guess;
            }
        }
    }
}

/// Plays one game against `target` to completion.
#[instrument(skip(sage))]
pub async fn play_game(
    target: u8,
    max_attempts: usize,
    sage: &dyn FeedbackCollaborator,
) -> Result<GameSummary, TurnError> {
    let mut controller = TurnController::new(target, max_attempts);
    let mut bisector = Bisector::new();
    let mut fallbacks = 0;

    while !controller.state().status().is_terminal() {
        let guess = bisector.next();
        let report = controller.play_turn(&guess.to_string(), sage).await?;
        if *report.used_fallback() {
            fallbacks += 1;
        }
        debug!(guess, direction = %report.record().direction(), "Simulated turn");
        bisector.narrow(guess, *report.record().direction());
    }

    let state = controller.state();
    Ok(GameSummary {
        target: *state.target(),
        guesses: state.guess_values(),
        status: *state.status(),
        fallbacks,
    })
}

/// Plays `games` games with targets drawn from `rng`.
#[instrument(skip(rng, sage))]
pub async fn run<R: Rng + ?Sized>(
    games: usize,
    max_attempts: usize,
    rng: &mut R,
    sage: &dyn FeedbackCollaborator,
) -> Result<SimulationReport, TurnError> {
    let mut results = Vec::with_capacity(games);
    for _ in 0..games {
        let target = random_target(rng);
        results.push(play_game(target, max_attempts, sage).await?);
    }
    let report = SimulationReport::from_games(results);
    info!(
        wins = report.wins,
        losses = report.losses,
        mean = report.mean_guesses,
        "Simulation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bisector_converges_on_every_target() {
        for target in MIN_GUESS..=MAX_GUESS {
            let mut b = Bisector::new();
            let mut steps = 0;
            loop {
                steps += 1;
                let g = b.next();
                let d = crate::game::direction(g, target);
                if d == Direction::Correct {
                    break;
                }
                b.narrow(g, d);
                assert!(steps < 8, "target {target} took too long");
            }
            assert!(steps <= 7);
        }
    }

    #[test]
    fn report_counts_outcomes() {
        let games = vec![
            GameSummary {
                target: 1,
                guesses: vec![50, 25, 1],
                status: GameStatus::Won,
                fallbacks: 3,
            },
            GameSummary {
                target: 2,
                guesses: vec![9; 5],
                status: GameStatus::Lost,
                fallbacks: 5,
            },
        ];
        let report = SimulationReport::from_games(games);
        assert_eq!(report.wins, 1);
        assert_eq!(report.losses, 1);
        assert_eq!(report.max_guesses, 5);
        assert!((report.mean_guesses - 4.0).abs() < f64::EPSILON);
    }
}
