//! Application state and logic.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::audio::SoundBoard;
use crate::feedback::{
    FeedbackCollaborator, FeedbackRequest, SpeechSynthesizer, fallback_message, narrate,
};
use crate::game::{GuessError, TurnError};
use crate::turn::{ResolvedTurn, TurnController, random_target};

use super::input::{Action, INPUT_LIMIT};

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Splash shown before the first game.
    Title,
    /// The game itself.
    Playing,
}

/// Messages sent from background tasks to the UI.
#[derive(Debug)]
pub enum SageEvent {
    /// The Sage has spoken on a guess.
    Resolved(ResolvedTurn),
    /// The opening greeting arrived.
    Greeting {
        /// Round the greeting was requested for.
        round: u64,
        /// Greeting text.
        text: String,
    },
}

/// Main application state.
pub struct App {
    screen: Screen,
    controller: TurnController,
    input: String,
    notice: Option<String>,
    rng: StdRng,
    seed: Option<u64>,
    sounds: SoundBoard,
    sage: Arc<dyn FeedbackCollaborator>,
    voice: Option<Arc<dyn SpeechSynthesizer>>,
    events_tx: mpsc::UnboundedSender<SageEvent>,
    events_rx: mpsc::UnboundedReceiver<SageEvent>,
    should_quit: bool,
}

impl App {
    /// Creates a new application on the title screen.
    ///
    /// `voice` enables narration; `seed` makes targets and twinkles repeatable.
    pub fn new(
        max_attempts: usize,
        sage: Arc<dyn FeedbackCollaborator>,
        voice: Option<Arc<dyn SpeechSynthesizer>>,
        sounds: SoundBoard,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let controller = TurnController::random(&mut rng, max_attempts);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            screen: Screen::Title,
            controller,
            input: String::new(),
            notice: None,
            rng,
            seed,
            sounds,
            sage,
            voice,
            events_tx,
            events_rx,
            should_quit: false,
        }
    }

    /// Current screen.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// The turn controller.
    pub fn controller(&self) -> &TurnController {
        &self.controller
    }

    /// Text in the guess field.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Corrective message for the last rejected input, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Whether the player asked to leave.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Applies a key action.
    #[instrument(skip(self))]
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => {
                info!("User quit");
                self.sounds.stop_ambience();
                self.should_quit = true;
            }
            Action::Begin => self.begin(),
            Action::Type(c) => {
                if self.input.chars().count() < INPUT_LIMIT {
                    self.input.push(c);
                }
            }
            Action::Erase => {
                self.input.pop();
            }
            Action::Submit => self.submit(),
            Action::Restart => self.restart(),
            Action::Ignore => {}
        }
    }

    /// Leaves the title screen, starts ambience and asks for a greeting.
    fn begin(&mut self) {
        if self.screen != Screen::Title {
            return;
        }
        info!("Entering the nebula");
        self.screen = Screen::Playing;
        self.sounds.start_ambience(self.seed);
        self.request_greeting();
    }

    fn request_greeting(&self) {
        let request = FeedbackRequest::greeting(*self.controller.state().target());
        let round = self.controller.round();
        let sage = Arc::clone(&self.sage);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let text = match sage.feedback(&request).await {
                Ok(text) => text,
                Err(e) => {
                    debug!(error = %e, "Greeting unavailable");
                    fallback_message(None).to_string()
                }
            };
            if tx.send(SageEvent::Greeting { round, text }).is_err() {
                debug!("UI gone before greeting arrived");
            }
        });
    }

    fn submit(&mut self) {
        match self.controller.submit(&self.input) {
            Ok(pending) => {
                self.notice = None;
                self.sounds.play_cue(pending.cue());
                let sage = Arc::clone(&self.sage);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let resolved = pending.resolve(sage.as_ref()).await;
                    if tx.send(SageEvent::Resolved(resolved)).is_err() {
                        debug!("UI gone before turn resolved");
                    }
                });
            }
            Err(TurnError::InFlight) => {
                self.notice = Some("The Sage is still speaking...".to_string());
            }
            Err(TurnError::InvalidGuess(GuessError::NotANumber(_))) => {
                self.notice = Some("Speak a number, seeker.".to_string());
            }
            Err(e) => {
                self.notice = Some(e.to_string());
            }
        }
    }

    fn restart(&mut self) {
        let target = random_target(&mut self.rng);
        match self.controller.restart(target) {
            Ok(cue) => {
                self.input.clear();
                self.notice = None;
                self.sounds.play_cue(cue);
            }
            Err(e) => warn!(error = %e, "Restart refused"),
        }
    }

    /// Handles a message from a background task.
    pub fn handle_event(&mut self, event: SageEvent) {
        match event {
            SageEvent::Resolved(resolved) => match self.controller.commit(resolved) {
                Ok(report) => {
                    self.input.clear();
                    self.sounds.play_cues(report.cues());
                    self.speak(report.message().clone());
                }
                Err(e) => warn!(error = %e, "Dropping turn"),
            },
            SageEvent::Greeting { round, text } => {
                if round == self.controller.round() && self.controller.set_greeting(text.clone()) {
                    self.speak(text);
                }
            }
        }
    }

    fn speak(&self, text: String) {
        if let Some(voice) = &self.voice {
            narrate(Arc::clone(voice), self.sounds.clone(), text);
        }
    }

    /// Handles every message already waiting. Returns how many there were.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next background message and handles it.
    pub async fn settle(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }
}
