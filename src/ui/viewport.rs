//! # Viewport
//!
//! Tracks the 2D scroll offset over the output buffer and interprets
//! navigation keys.
//!
//! After every move the offset is clamped:
//!
//! - `offset_x >= 0`
//! - `offset_y <= max(height, total_lines - height / 2)`
//!
//! The vertical bound allows scrolling a little past the last
//! line, so that content stays reachable after the terminal shrinks.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Default horizontal step for Left / Right.
pub const DEFAULT_STEP_X: usize = 4;
/// Default vertical step for Up / Down.
pub const DEFAULT_STEP_Y: usize = 1;
/// Default jump for Tab.
pub const DEFAULT_TAB_STEP: usize = 8;

/// A navigation action understood by [`Viewport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Up,
    Down,
    PageUp,
    PageDown,
    /// Jump back to the left margin.
    Home,
    Left,
    Right,
    /// Jump right by the tab step.
    Tab,
    Top,
    Bottom,
}

impl NavCommand {
    /// Map a key press to a navigation command.
    ///
    /// Keys with Control or Alt held are never navigation.
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return None;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Self::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Self::Down),
            KeyCode::PageUp => Some(Self::PageUp),
            KeyCode::PageDown => Some(Self::PageDown),
            KeyCode::Home => Some(Self::Home),
            KeyCode::Left | KeyCode::Char('h') => Some(Self::Left),
            KeyCode::Right | KeyCode::Char('l') => Some(Self::Right),
            KeyCode::Tab => Some(Self::Tab),
            KeyCode::Char('g') => Some(Self::Top),
            KeyCode::End | KeyCode::Char('G') => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Scroll position plus the step sizes used to move it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    pub offset_x: usize,
    pub offset_y: usize,
    step_x: usize,
    step_y: usize,
    tab_step: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_X, DEFAULT_STEP_Y, DEFAULT_TAB_STEP)
    }
}

impl Viewport {
    pub fn new(step_x: usize, step_y: usize, tab_step: usize) -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            step_x,
            step_y,
            tab_step,
        }
    }

    /// Largest allowed `offset_y` for a viewport of `height` rows over
    /// `total_lines` lines.
    pub fn max_offset_y(height: usize, total_lines: usize) -> usize {
        height.max(total_lines.saturating_sub(height / 2))
    }

    /// Re-apply the clamp invariants, e.g. after a refresh or resize.
    pub fn clamp(&mut self, height: usize, total_lines: usize) {
        self.offset_y = self
            .offset_y
            .min(Self::max_offset_y(height, total_lines));
    }

    /// Apply a navigation command.
    ///
    /// Always returns `true`: the command was consumed as navigation, even if
    /// clamping leaves the offset where it was.
    pub fn move_by(
        &mut self,
        command: NavCommand,
        height: usize,
        header_rows: usize,
        total_lines: usize,
    ) -> bool {
        let page = height.saturating_sub(header_rows).max(1);

        match command {
            NavCommand::Up => self.offset_y = self.offset_y.saturating_sub(self.step_y),
            NavCommand::Down => self.offset_y = self.offset_y.saturating_add(self.step_y),
            NavCommand::PageUp => self.offset_y = self.offset_y.saturating_sub(page),
            NavCommand::PageDown => self.offset_y = self.offset_y.saturating_add(page),
            NavCommand::Home => self.offset_x = 0,
            NavCommand::Left => self.offset_x = self.offset_x.saturating_sub(self.step_x),
            NavCommand::Right => self.offset_x = self.offset_x.saturating_add(self.step_x),
            NavCommand::Tab => self.offset_x = self.offset_x.saturating_add(self.tab_step),
            NavCommand::Top => self.offset_y = 0,
            NavCommand::Bottom => self.offset_y = Self::max_offset_y(height, total_lines),
        }

        self.clamp(height, total_lines);
        true
    }

    /// Interpret a key press. Returns `false` (and leaves the offset alone)
    /// when the key is not a navigation key.
    pub fn move_key(
        &mut self,
        key: &KeyEvent,
        height: usize,
        header_rows: usize,
        total_lines: usize,
    ) -> bool {
        match NavCommand::from_key(key) {
            Some(command) => self.move_by(command, height, header_rows, total_lines),
            None => false,
        }
    }
}
