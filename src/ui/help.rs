//! Key bindings bar.
//!
//! Lists every action with its key; actions the app currently does not allow
//! are dimmed.

use crate::app::Controls;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

/// Key binding entry for the controls bar.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
    enabled: fn(&Controls) -> bool,
}

const BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "r",
        description: "Listen",
        enabled: |c| c.start_capture,
    },
    KeyBinding {
        key: "s",
        description: "Stop listening",
        enabled: |c| c.stop_capture,
    },
    KeyBinding {
        key: "o",
        description: "Load MIDI",
        enabled: |c| c.load_midi,
    },
    KeyBinding {
        key: "p",
        description: "Play",
        enabled: |c| c.play,
    },
    KeyBinding {
        key: "Space",
        description: "Pause",
        enabled: |c| c.pause,
    },
    KeyBinding {
        key: "e",
        description: "Export PDF",
        enabled: |c| c.export_pdf,
    },
    KeyBinding {
        key: "i",
        description: "Export PNG",
        enabled: |c| c.export_pdf,
    },
    KeyBinding {
        key: "m",
        description: "Export MIDI",
        enabled: |c| c.export_midi,
    },
    KeyBinding {
        key: "q",
        description: "Quit",
        enabled: |_| true,
    },
];

/// Renders the controls bar.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `controls` - Currently enabled actions
pub fn render_controls(frame: &mut Frame, area: Rect, controls: &Controls) {
    let mut spans: Vec<Span> = Vec::with_capacity(BINDINGS.len() * 3);
    for binding in BINDINGS {
        let (key_style, desc_style) = if (binding.enabled)(controls) {
            (
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
                Style::default().fg(Color::White),
            )
        } else {
            (
                Style::default().fg(Color::DarkGray),
                Style::default().fg(Color::DarkGray),
            )
        };
        spans.push(Span::styled(format!(" {} ", binding.key), key_style));
        spans.push(Span::styled(binding.description, desc_style));
        spans.push(Span::raw("  "));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Keys ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Gray)),
        );
    frame.render_widget(paragraph, area);
}
