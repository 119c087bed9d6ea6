//! Terminal setup for applications that render a [`WidgetHost`](crate::host::WidgetHost)

use std::io::{self, Stdout};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::env::{EnvParser, EnvVars};

pub type UiTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Minimum terminal size the demo accepts
pub const MIN_WIDTH: u16 = 40;
pub const MIN_HEIGHT: u16 = 12;

/// Check if a full-screen UI can run here
pub fn should_enable_terminal_ui() -> bool {
    if EnvParser::is_present(EnvVars::FORCE_TERMINAL_UI) {
        return true;
    }

    // Check if we have a proper terminal
    if !atty::is(atty::Stream::Stdout) {
        return false;
    }

    match crossterm::terminal::size() {
        Ok((width, height)) => width >= MIN_WIDTH && height >= MIN_HEIGHT,
        Err(_) => false,
    }
}

/// Enter raw mode and the alternate screen, optionally capturing the mouse
pub fn init_terminal(mouse: bool) -> io::Result<UiTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if mouse {
        execute!(stdout, EnableMouseCapture)?;
    }

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore terminal to normal mode
pub fn restore_terminal(terminal: &mut UiTerminal) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()
}
