//! pentagrama - sing, play or load MIDI and see it on a staff.
//!
//! Listens to the microphone (or a WAV file), shows each detected pitch as a
//! quarter note on a treble staff, imports and plays MIDI files through a
//! SoundFont, and exports the staff to PDF and the notes to MIDI.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --soundfont piano.sf2 --midi song.mid
//! cargo run -- --wav humming.wav
//! ```

use pentagrama::app::App;
use pentagrama::config::{CliOptions, Settings, USAGE};
use pentagrama::ui;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;
    if cli.help {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    // Logs go to stderr and stay silent unless RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_cli(&cli)?;
    tracing::debug!(?settings, "Effective settings");

    let mut app = App::new(settings).context("Failed to initialize application")?;
    if app.settings().midi_file.is_some() {
        app.load_configured_midi();
    }

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    let result = run_app(&mut terminal, &mut app);
    app.shutdown();
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    result
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.tick();

        terminal.draw(|frame| ui::render(frame, app))?;

        // Short timeout so captured notes show up promptly
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Dispatches a key press to the matching action.
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => app.should_quit = true,
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('r') => app.start_capture(),
        KeyCode::Char('s') => app.stop_capture(),
        KeyCode::Char('o') => {
            app.load_configured_midi();
        }
        KeyCode::Char('p') => app.play(),
        KeyCode::Char(' ') => app.pause(),
        KeyCode::Char('e') => {
            app.export_pdf();
        }
        KeyCode::Char('i') => {
            app.export_png();
        }
        KeyCode::Char('m') => {
            app.export_midi();
        }
        _ => {}
    }
}
