//! Terminal UI for the Nebula Sage.

mod app;
mod input;
mod ui;

pub use app::{App, SageEvent, Screen};
pub use input::{Action, INPUT_LIMIT, map_key};
pub use ui::{draw, trajectory};

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info, instrument};

use crate::audio::SoundBoard;
use crate::feedback::{FeedbackCollaborator, SpeechSynthesizer};

/// Log file written while the terminal is in raw mode.
pub const LOG_FILE: &str = "nebula_sage.log";

const TICK: Duration = Duration::from_millis(50);

/// Sends logs to `path` so they never reach the terminal.
pub fn init_file_logging(path: impl AsRef<Path>) -> Result<()> {
    let log_file = std::fs::File::create(path.as_ref())?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,nebula_sage=debug")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init(); // Don't panic if already initialized
    Ok(())
}

/// Runs the interactive game until the player quits.
#[instrument(skip_all, fields(max_attempts = max_attempts, narration = voice.is_some()))]
pub async fn run_tui(
    max_attempts: usize,
    sage: Arc<dyn FeedbackCollaborator>,
    voice: Option<Arc<dyn SpeechSynthesizer>>,
    sounds: SoundBoard,
    seed: Option<u64>,
) -> Result<()> {
    info!("Starting Nebula Sage TUI");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(max_attempts, sage, voice, sounds.clone(), seed);
    let res = run_loop(&mut terminal, &mut app).await;

    sounds.stop_ambience();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "Game loop error");
    }
    res
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        app.pump();
        terminal.draw(|f| draw(f, app))?;

        // Check for keyboard input (non-blocking)
        if event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                let game_over = app.controller().state().status().is_terminal();
                app.handle_action(map_key(app.screen(), game_over, key));
            }
        } else {
            tokio::time::sleep(TICK).await;
        }

        if app.should_quit() {
            info!("Leaving the nebula");
            return Ok(());
        }
    }
}
