//! # Terminal Session
//!
//! [`TerminalGuard`] puts the terminal into the state the watch screen needs
//! (raw mode, alternate screen, bracketed paste) and puts it back when dropped,
//! whether the session ends normally, with an error, or by panic.
//!
//! Mouse capture is not enabled: the terminal's own text selection keeps
//! working on the watched output.

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use ratatui::{backend::CrosstermBackend, buffer::Buffer, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::sync::OnceLock;

use crate::ui::app::RenderSink;

/// Owns the terminal for the lifetime of the session.
pub struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        install_panic_hook();

        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste) {
            let _ = disable_raw_mode();
            return Err(err).context("Failed to enter alternate screen");
        }

        let mut terminal =
            Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        Ok(Self {
            terminal,
            restored: false,
        })
    }

    /// Undo everything [`TerminalGuard::enter`] did. Called by `Drop` as well;
    /// the second call is a no-op.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(
            self.terminal.backend_mut(),
            DisableBracketedPaste,
            LeaveAlternateScreen
        )
        .context("Failed to restore terminal")?;
        self.terminal
            .show_cursor()
            .context("Failed to show cursor")?;

        Ok(())
    }
}

impl RenderSink for TerminalGuard {
    fn size(&self) -> Result<(u16, u16)> {
        let size = self
            .terminal
            .size()
            .context("Failed to read terminal size")?;
        Ok((size.width, size.height))
    }

    fn present(&mut self, frame: &Buffer) -> Result<()> {
        self.terminal
            .draw(|f| f.buffer_mut().merge(frame))
            .context("Failed to draw terminal UI")?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::error!(error = %err, "failed to restore terminal");
        }
    }
}

/// Leave the alternate screen before the default panic message is printed.
fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
            original_hook(panic_info);
        }));
    });
}

/// Set the terminal window title.
pub fn set_title(title: &str) -> Result<()> {
    execute!(io::stdout(), SetTitle(title)).context("Failed to set terminal title")
}

/// Join arguments into one shell-style string, quoting where needed.
pub fn shell_join<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| shell_quote(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\"'\"'"))
    }
}
