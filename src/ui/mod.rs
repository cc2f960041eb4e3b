//! Terminal user interface.
//!
//! Three stacked panels: a status bar with the capture and playback state,
//! the staff, and the key bindings.

mod help;
mod staff;

use crate::app::App;
use crate::audio::PlaybackState;
use crate::capture::CaptureState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub use help::render_controls;
pub use staff::render_staff;

/// Renders the complete UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Min(8),    // Staff
            Constraint::Length(4), // Keys
        ])
        .split(frame.area());

    render_status(frame, chunks[0], app);

    let title = match app.current_midi() {
        Some(midi) => format!("Staff - {}", midi.name),
        None => "Staff".to_string(),
    };
    render_staff(frame, chunks[1], app.staff(), app.layout(), &title);

    render_controls(frame, chunks[2], &app.controls);
}

/// Renders the capture/playback indicators and the status message.
fn render_status(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default()
        .title(" pentagrama ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(16), // Capture
            Constraint::Length(14), // Playback
            Constraint::Length(12), // Note count
            Constraint::Min(20),    // Status message
        ])
        .split(inner);

    let capture = match app.capture_state() {
        CaptureState::Capturing => Span::styled(
            " [*] LISTENING ",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ),
        CaptureState::Idle => Span::styled(" [ ] IDLE ", Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(Paragraph::new(Line::from(capture)), chunks[0]);

    let playback = match app.playback_state() {
        PlaybackState::Playing => Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Paused => Span::styled(
            " [||] PAUSE ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Stopped => Span::styled(" [.] STOP ", Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(Paragraph::new(Line::from(playback)), chunks[1]);

    let count = Paragraph::new(Line::from(vec![
        Span::styled("Notes: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{}/{}", app.notes().len(), app.notes().capacity()),
            Style::default().fg(Color::White),
        ),
    ]));
    frame.render_widget(count, chunks[2]);

    if let Some((msg, _)) = &app.status_message {
        let status = Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ));
        frame.render_widget(Paragraph::new(status), chunks[3]);
    }
}
