//! Key handling for the game screens.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::Screen;

/// Longest input the guess field accepts.
pub const INPUT_LIMIT: usize = 6;

/// What a key press means on the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the application.
    Quit,
    /// Leave the title screen.
    Begin,
    /// Append a character to the guess field.
    Type(char),
    /// Delete the last character of the guess field.
    Erase,
    /// Submit the guess field.
    Submit,
    /// Start a new game.
    Restart,
    /// Nothing to do.
    Ignore,
}

/// Maps a key event to an [`Action`].
///
/// `game_over` switches the playing screen to its end-of-game bindings.
pub fn map_key(screen: Screen, game_over: bool, key: KeyEvent) -> Action {
    if key.kind == KeyEventKind::Release {
        return Action::Ignore;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match screen {
        Screen::Title => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Enter | KeyCode::Char(' ') => Action::Begin,
            _ => Action::Ignore,
        },
        Screen::Playing if game_over => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('r') | KeyCode::Enter => Action::Restart,
            _ => Action::Ignore,
        },
        Screen::Playing => match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Enter => Action::Submit,
            KeyCode::Backspace => Action::Erase,
            KeyCode::Char(c) if !c.is_control() => Action::Type(c),
            _ => Action::Ignore,
        },
    }
}
