//! Terminal setup and the ANSI output buffer.

mod output;

pub use output::OutputBuffer;

use crate::session::Viewport;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io;

/// Puts the terminal into raw mode for as long as it lives.
///
/// Dropping the guard restores the original mode, shows the cursor and
/// leaves the alternate screen, even when an actor failed.
#[derive(Debug)]
pub struct TerminalGuard {
    alternate_screen: bool,
}

impl TerminalGuard {
    /// Enter raw mode (and optionally the alternate screen).
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal refuses raw mode or the escape
    /// sequences cannot be written. Raw mode is undone before returning.
    pub fn enter(alternate_screen: bool) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = Self { alternate_screen };

        if alternate_screen {
            execute!(io::stdout(), EnterAlternateScreen)?;
        }
        Ok(guard)
    }

    /// Current terminal size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be queried.
    pub fn viewport() -> io::Result<Viewport> {
        let (width, height) = terminal::size()?;
        Ok(Viewport::new(width, height))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        // Undo the scroll region and styling left by the renderer.
        let _ = io::Write::write_all(&mut stdout, b"\x1b[r\x1b[0m");
        let _ = execute!(stdout, cursor::Show);
        if self.alternate_screen {
            let _ = execute!(stdout, LeaveAlternateScreen);
        }
        let _ = terminal::disable_raw_mode();
    }
}
