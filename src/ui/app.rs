//! # Controller
//!
//! [`App`] owns everything a watch session needs: the command and its
//! executor, the latest output, the viewport and the scheduler. [`run_app`]
//! is the main loop that feeds it events and pushes frames to a
//! [`RenderSink`].
//!
//! ## Event Handling
//!
//! Every event goes through [`App::handle_event`], which checks in order:
//!
//! 1. Exit keys (`Esc`, `q`, `Q`, Ctrl-C) and interrupts end the session
//! 2. Navigation keys move the viewport
//! 3. Timer wake-ups and refresh keys (`Enter`, `Space`) re-run the command
//! 4. Anything else only shows up in the diagnostics row
//!
//! Every event except a timer wake-up counts as interaction, then the
//! scheduler decides whether the next refresh is queued or the session goes
//! idle.

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use std::fmt;
use std::time::{Duration, Instant};

use crate::script::{Command, CommandExecutor};
use crate::ui::clock::Clock;
use crate::ui::event::{EventReader, WatchEvent};
use crate::ui::render::compose_frame;
use crate::ui::scheduler::Scheduler;
use crate::ui::styled::StyledLine;
use crate::ui::theme::Theme;
use crate::ui::viewport::Viewport;

/// Rows above the command output.
pub const HEADER_ROWS: usize = 3;

/// Longest the loop waits for input before drawing again.
pub const MAX_WAIT: Duration = Duration::from_secs(1);

/// What an event led to, shown in the diagnostics row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Move,
    /// A batch of keys was applied.
    MultiMove,
    Exec,
    Resize,
    Quit,
    Nothing,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Start => "start",
            Action::Move => "move",
            Action::MultiMove => "multi-move",
            Action::Exec => "exec",
            Action::Resize => "resize",
            Action::Quit => "quit",
            Action::Nothing => "nothing",
        };
        f.write_str(name)
    }
}

pub fn is_exit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

pub fn is_refresh_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') => true,
        // raw-mode Enter on some terminals
        KeyCode::Char('j') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Where finished frames go.
pub trait RenderSink {
    /// Current size as `(width, height)`.
    fn size(&self) -> Result<(u16, u16)>;
    fn present(&mut self, frame: &Buffer) -> Result<()>;
}

/// Host name for the header, `localhost` if it cannot be determined.
pub fn local_hostname() -> String {
    #[cfg(unix)]
    {
        if let Ok(name) = nix::unistd::gethostname() {
            return name.to_string_lossy().into_owned();
        }
    }
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

pub struct App {
    command: Command,
    executor: CommandExecutor,
    pub buffer: Vec<StyledLine>,
    pub viewport: Viewport,
    pub scheduler: Scheduler,
    theme: Theme,
    hostname: String,
    last_exec: Option<DateTime<Local>>,
    last_event: String,
    last_action: Action,
    width: u16,
    height: u16,
    pub should_quit: bool,
}

impl App {
    pub fn new(command: Command, scheduler: Scheduler, viewport: Viewport, theme: Theme) -> Self {
        Self {
            command,
            executor: CommandExecutor::default(),
            buffer: Vec::new(),
            viewport,
            scheduler,
            theme,
            hostname: local_hostname(),
            last_exec: None,
            last_event: String::new(),
            last_action: Action::Start,
            width: 0,
            height: 0,
            should_quit: false,
        }
    }

    pub fn with_executor(mut self, executor: CommandExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn last_action(&self) -> Action {
        self.last_action
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// First refresh, then the first timer one interval out.
    pub fn startup(&mut self, now: Instant) {
        tracing::info!(command = %self.command, interval = ?self.scheduler.interval(), "starting watch");
        self.refresh();
        self.scheduler.schedule_next(now + self.scheduler.interval());
        self.last_action = Action::Start;
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.viewport
            .clamp(usize::from(height), self.buffer.len());
    }

    /// Run the command and replace the buffer with its output.
    pub fn refresh(&mut self) {
        let output = self.executor.execute(&self.command);
        self.buffer = output
            .lines
            .iter()
            .map(|line| StyledLine::parse_ansi(line))
            .collect();
        self.last_exec = Some(output.timestamp);
        self.scheduler.mark_refreshed();
        self.viewport
            .clamp(usize::from(self.height), self.buffer.len());
        tracing::debug!(lines = self.buffer.len(), "refreshed");
    }

    fn move_key(&mut self, key: &KeyEvent) -> bool {
        self.viewport.move_key(
            key,
            usize::from(self.height),
            HEADER_ROWS,
            self.buffer.len(),
        )
    }

    pub fn handle_event(&mut self, event: WatchEvent, now: Instant) -> Action {
        let action = match &event {
            WatchEvent::Interrupt => Action::Quit,
            WatchEvent::Key(key) if is_exit_key(key) => Action::Quit,
            WatchEvent::Key(key) => {
                if self.move_key(key) {
                    Action::Move
                } else if is_refresh_key(key) {
                    self.refresh();
                    Action::Exec
                } else {
                    tracing::trace!(key = ?key, "unhandled key");
                    Action::Nothing
                }
            }
            WatchEvent::Paste(keys) => {
                for key in keys {
                    self.move_key(key);
                }
                Action::MultiMove
            }
            WatchEvent::TimerFired => {
                self.refresh();
                Action::Exec
            }
            WatchEvent::Resize { width, height } => {
                self.set_size(*width, *height);
                Action::Resize
            }
        };

        self.last_event = event.describe();
        self.last_action = action;

        if action == Action::Quit {
            tracing::info!(event = %self.last_event, "quitting");
            self.should_quit = true;
            return action;
        }

        if event != WatchEvent::TimerFired {
            self.scheduler.record_interaction(now);
        }
        self.scheduler.settle(now);
        action
    }

    /// The three header rows for the current width.
    pub fn header_lines(&self) -> Vec<StyledLine> {
        let width = usize::from(self.width);

        let pre = format!(
            "Every {}s: {}",
            self.scheduler.interval().as_secs(),
            self.command
        );
        let stamp = self
            .last_exec
            .map_or_else(|| "-".to_string(), |t| t.format("%c").to_string());
        let post = format!(" {}: {}", self.hostname, stamp);

        let pre_len = pre.chars().count();
        let post_len = post.chars().count();
        let mut title = StyledLine::default();
        if pre_len + post_len <= width {
            title
                .push(&pre, self.theme.title_style())
                .push(&" ".repeat(width - pre_len - post_len), Default::default());
        } else {
            let keep: String = pre.chars().take(width.saturating_sub(post_len)).collect();
            title.push(&keep, self.theme.title_style());
        }
        title.push(&post, self.theme.dim_style());

        let mut status = StyledLine::styled(
            &format!(
                "x,y={},{}; {}; {}",
                self.viewport.offset_x, self.viewport.offset_y, self.last_event, self.last_action
            ),
            self.theme.dim_style(),
        );
        if self.scheduler.is_idle() {
            status
                .push(", ", self.theme.dim_style())
                .push("idle: Press ENTER", self.theme.idle_style());
        }

        vec![title, status, StyledLine::default()]
    }

    /// The full frame at the current size.
    pub fn frame(&self) -> Buffer {
        compose_frame(
            &self.header_lines(),
            &self.buffer,
            self.viewport.offset_x,
            self.viewport.offset_y,
            self.width,
            self.height,
        )
    }
}

/// Drive `app` until it quits.
pub fn run_app(
    app: &mut App,
    events: &mut dyn EventReader,
    sink: &mut dyn RenderSink,
    clock: &dyn Clock,
) -> Result<()> {
    let (width, height) = sink.size()?;
    app.set_size(width, height);
    app.startup(clock.now());

    loop {
        let (width, height) = sink.size()?;
        if (width, height) != app.size() {
            app.set_size(width, height);
        }
        sink.present(&app.frame())?;

        let now = clock.now();
        let event = if app.scheduler.take_due(now) {
            Some(WatchEvent::TimerFired)
        } else {
            let wait = app
                .scheduler
                .time_until_due(now)
                .map_or(MAX_WAIT, |due| due.min(MAX_WAIT));
            events.read_event(wait)?
        };

        let Some(event) = event else {
            continue;
        };
        app.handle_event(event, clock.now());
        if app.should_quit {
            break;
        }
    }

    Ok(())
}
