//! Stateless UI rendering for the Nebula Sage.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Wrap},
};

use crate::game::{Direction, GameState, GameStatus, MAX_GUESS, MIN_GUESS};

use super::app::{App, Screen};

const TITLE_ART: &str = r"
  _   _      _           _          ____
 | \ | | ___| |__  _   _| | __ _   / ___|  __ _  __ _  ___
 |  \| |/ _ \ '_ \| | | | |/ _` |  \___ \ / _` |/ _` |/ _ \
 | |\  |  __/ |_) | |_| | | (_| |   ___) | (_| | (_| |  __/
 |_| \_|\___|_.__/ \__,_|_|\__,_|  |____/ \__,_|\__, |\___|
                                                 |___/
";

/// Draws the whole frame for the current screen.
pub fn draw(frame: &mut Frame, app: &App) {
    match app.screen() {
        Screen::Title => draw_title(frame),
        Screen::Playing => draw_game(frame, app),
    }
}

fn draw_title(frame: &mut Frame) {
    let area = frame.area();
    let mut lines: Vec<Line> = TITLE_ART
        .lines()
        .map(|l| Line::styled(l, Style::default().fg(Color::Magenta)))
        .collect();
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "An ancient oracle guards a number between 1 and 100.",
        Style::default().fg(Color::Gray),
    ));
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Press Enter to enter the nebula  ·  q to flee",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));

    let height = lines.len() as u16;
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, center_rect(area, area.width, height));
}

fn draw_game(frame: &mut Frame, app: &App) {
    let state = app.controller().state();
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(12),   // Body
            Constraint::Length(3), // History
            Constraint::Length(1), // Help
        ])
        .split(frame.area());

    let title = Paragraph::new("✦ THE NEBULA SAGE ✦")
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    let body = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Min(4),    // Sage
            Constraint::Length(4), // Input
        ])
        .split(body[0]);

    draw_status(frame, left[0], state);
    draw_sage(frame, left[1], state, app.controller().is_processing());
    draw_input(frame, left[2], app);
    draw_trajectory(frame, body[1], state);
    draw_history(frame, chunks[2], state);

    let help = if state.status().is_terminal() {
        "Enter/R: New game | Q: Quit"
    } else {
        "Type a number, Enter: Guess | Esc: Quit"
    };
    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        chunks[3],
    );
}

fn draw_status(frame: &mut Frame, area: Rect, state: &GameState) {
    let (label, color) = match state.status() {
        GameStatus::Playing => ("Seeking", Color::Yellow),
        GameStatus::Won => ("Victorious", Color::Green),
        GameStatus::Lost => ("Defeated", Color::Red),
    };
    let line = Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw("  ·  "),
        Span::raw(format!(
            "Attempts left: {}/{}",
            state.remaining_attempts(),
            state.max_attempts()
        )),
    ]);
    frame.render_widget(
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Status")),
        area,
    );
}

fn draw_sage(frame: &mut Frame, area: Rect, state: &GameState, processing: bool) {
    let text = if processing {
        Line::styled(
            "The Sage consults the stars...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )
    } else {
        Line::styled(
            state.message().as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        )
    };
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("The Sage")),
        area,
    );
}

fn draw_input(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.controller().state();
    let mut lines = Vec::with_capacity(2);

    match state.status() {
        GameStatus::Playing => {
            lines.push(Line::from(vec![
                Span::raw("> "),
                Span::styled(
                    app.input(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled("_", Style::default().fg(Color::DarkGray)),
            ]));
        }
        GameStatus::Won => lines.push(Line::styled(
            format!("The number was {}.", state.target()),
            Style::default().fg(Color::Green),
        )),
        GameStatus::Lost => lines.push(Line::styled(
            format!("The number was {}.", state.target()),
            Style::default().fg(Color::Red),
        )),
    }
    if let Some(notice) = app.notice() {
        lines.push(Line::styled(notice, Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Your guess")),
        area,
    );
}

/// Guess values plotted against attempt number.
pub fn trajectory(state: &GameState) -> Vec<(f64, f64)> {
    state
        .guesses()
        .iter()
        .enumerate()
        .map(|(i, g)| ((i + 1) as f64, f64::from(*g.value())))
        .collect()
}

fn draw_trajectory(frame: &mut Frame, area: Rect, state: &GameState) {
    let points = trajectory(state);
    let max_x = (*state.max_attempts()).max(2) as f64;
    let target_line = [(1.0, f64::from(*state.target())), (max_x, f64::from(*state.target()))];

    let mut datasets = vec![
        Dataset::default()
            .name("guesses")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&points),
    ];
    // The target stays hidden until the game ends.
    if state.status().is_terminal() {
        datasets.push(
            Dataset::default()
                .name("target")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Green))
                .data(&target_line),
        );
    }

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title("Trajectory"))
        .x_axis(
            Axis::default()
                .title("attempt")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([1.0, max_x])
                .labels(["1".to_string(), format!("{}", max_x as usize)]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([f64::from(MIN_GUESS), f64::from(MAX_GUESS)])
                .labels([MIN_GUESS.to_string(), "50".to_string(), MAX_GUESS.to_string()]),
        );
    frame.render_widget(chart, area);
}

fn draw_history(frame: &mut Frame, area: Rect, state: &GameState) {
    let mut spans = Vec::with_capacity(state.guesses().len() * 2);
    for record in state.guesses() {
        let (arrow, color) = match record.direction() {
            Direction::High => ("↓", Color::Red),
            Direction::Low => ("↑", Color::Blue),
            Direction::Correct => ("★", Color::Green),
        };
        spans.push(Span::styled(
            format!("{}{}", record.value(), arrow),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("  "));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("History")),
        area,
    );
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height.min(area.height)),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width.min(area.width)),
            Constraint::Min(0),
        ])
        .split(vert[1])[1]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::audio::SoundBoard;
    use crate::feedback::OfflineSage;
    use crate::tui::input::Action;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn title_screen_invites_the_player() {
        let app = App::new(10, Arc::new(OfflineSage), None, SoundBoard::silent(), Some(1));
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        assert!(screen_text(&terminal).contains("Press Enter"));
    }

    #[tokio::test]
    async fn game_screen_shows_panels() {
        let mut app = App::new(10, Arc::new(OfflineSage), None, SoundBoard::silent(), Some(1));
        app.handle_action(Action::Begin);
        app.settle().await;

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Attempts left: 10/10"));
        assert!(text.contains("Trajectory"));
        assert!(text.contains("History"));
    }
}
