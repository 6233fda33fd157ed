//! # Events
//!
//! Everything the controller reacts to is a [`WatchEvent`]. Terminal input is
//! read through the [`EventReader`] trait so the main loop can be driven by a
//! scripted reader in tests.
//!
//! ## Batching
//!
//! Navigation keys that are already queued when a key arrives (a held arrow
//! key, a fast typist) are read together and delivered as one
//! [`WatchEvent::Paste`] batch, so the viewport applies all of them before the
//! next frame is drawn. Bracketed paste text is delivered the same way.
//!
//! ## Signals
//!
//! Raw mode keeps the terminal from turning Ctrl-C into `SIGINT`, but the
//! process can still be signalled from outside. `SIGINT`, `SIGTERM` and
//! `SIGHUP` are caught while a [`CrosstermEventReader`] exists and come out
//! as [`WatchEvent::Interrupt`], so the session shuts down through the normal
//! path and the terminal is restored.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ui::viewport::NavCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Key(KeyEvent),
    /// Several keys delivered at once.
    Paste(Vec<KeyEvent>),
    /// The scheduler's pending wake-up is due.
    TimerFired,
    Resize { width: u16, height: u16 },
    /// Ctrl-C, or a termination signal.
    Interrupt,
}

impl WatchEvent {
    /// Short human-readable form, shown in the diagnostics header.
    pub fn describe(&self) -> String {
        match self {
            WatchEvent::Key(key) => key_name(key),
            WatchEvent::Paste(keys) => {
                let names: Vec<String> = keys.iter().map(key_name).collect();
                format!("Paste[{}]", names.join(" "))
            }
            WatchEvent::TimerFired => "Timer".to_string(),
            WatchEvent::Resize { width, height } => format!("Resize({width}x{height})"),
            WatchEvent::Interrupt => "<SigInt>".to_string(),
        }
    }
}

/// Name of a key in the `<NAME>` notation used by the header.
pub fn key_name(key: &KeyEvent) -> String {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char(' ') => "<SPACE>".to_string(),
        KeyCode::Char(c) if ctrl => format!("<Ctrl-{c}>"),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "<ENTER>".to_string(),
        KeyCode::Esc => "<ESC>".to_string(),
        KeyCode::Tab => "<TAB>".to_string(),
        KeyCode::Backspace => "<BACKSPACE>".to_string(),
        KeyCode::Up => "<UP>".to_string(),
        KeyCode::Down => "<DOWN>".to_string(),
        KeyCode::Left => "<LEFT>".to_string(),
        KeyCode::Right => "<RIGHT>".to_string(),
        KeyCode::PageUp => "<PAGEUP>".to_string(),
        KeyCode::PageDown => "<PAGEDOWN>".to_string(),
        KeyCode::Home => "<HOME>".to_string(),
        KeyCode::End => "<END>".to_string(),
        KeyCode::F(n) => format!("<F{n}>"),
        other => format!("<{other:?}>"),
    }
}

/// Trait for reading terminal events (allows dependency injection for testing)
pub trait EventReader {
    /// Wait up to `timeout` for the next event. `Ok(None)` means nothing
    /// relevant arrived.
    fn read_event(&mut self, timeout: Duration) -> Result<Option<WatchEvent>>;
}

/// Termination signals caught while the reader is alive.
#[cfg(unix)]
const TERMINATION_SIGNALS: [i32; 3] = [
    signal_hook::consts::signal::SIGINT,
    signal_hook::consts::signal::SIGTERM,
    signal_hook::consts::signal::SIGHUP,
];

/// Flag raised by the signal handlers, unregistered on drop.
#[derive(Debug)]
struct SignalFlag {
    raised: Arc<AtomicBool>,
    #[cfg(unix)]
    ids: Vec<signal_hook::SigId>,
}

impl SignalFlag {
    fn register() -> Result<Self> {
        let raised = Arc::new(AtomicBool::new(false));
        #[cfg(unix)]
        {
            let mut ids = Vec::with_capacity(TERMINATION_SIGNALS.len());
            for signal in TERMINATION_SIGNALS {
                let id = signal_hook::flag::register(signal, Arc::clone(&raised))
                    .with_context(|| format!("Failed to register handler for signal {signal}"))?;
                ids.push(id);
            }
            Ok(Self { raised, ids })
        }
        #[cfg(not(unix))]
        Ok(Self { raised })
    }

    /// True once per received signal burst.
    fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }
}

#[cfg(unix)]
impl Drop for SignalFlag {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// Production event reader that uses crossterm's event polling + read
#[derive(Debug)]
pub struct CrosstermEventReader {
    /// Events read while draining a key burst, not yet handed out.
    pending: VecDeque<WatchEvent>,
    signals: SignalFlag,
}

impl CrosstermEventReader {
    /// Create a reader and start catching termination signals.
    pub fn new() -> Result<Self> {
        Ok(Self {
            pending: VecDeque::new(),
            signals: SignalFlag::register()?,
        })
    }

    /// Collect navigation keys that are already queued behind `first`.
    fn drain_burst(&mut self, first: KeyEvent) -> Result<WatchEvent> {
        if NavCommand::from_key(&first).is_none() {
            return Ok(WatchEvent::Key(first));
        }

        let mut keys = vec![first];
        while event::poll(Duration::ZERO).context("Failed to poll for events")? {
            let next = event::read().context("Failed to read terminal event")?;
            match map_event(next) {
                Some(WatchEvent::Key(key)) if NavCommand::from_key(&key).is_some() => {
                    keys.push(key);
                }
                Some(other) => {
                    self.pending.push_back(other);
                    break;
                }
                None => {}
            }
        }

        Ok(if keys.len() == 1 {
            WatchEvent::Key(first)
        } else {
            WatchEvent::Paste(keys)
        })
    }
}

impl EventReader for CrosstermEventReader {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<WatchEvent>> {
        if self.signals.take() {
            tracing::info!("termination signal received");
            return Ok(Some(WatchEvent::Interrupt));
        }
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        if !event::poll(timeout).context("Failed to poll for events")? {
            if self.signals.take() {
                tracing::info!("termination signal received");
                return Ok(Some(WatchEvent::Interrupt));
            }
            return Ok(None);
        }

        let raw = event::read().context("Failed to read terminal event")?;
        match map_event(raw) {
            Some(WatchEvent::Key(key)) => self.drain_burst(key).map(Some),
            other => Ok(other),
        }
    }
}

/// Convert a crossterm event. Key releases, mouse and focus events are dropped.
pub fn map_event(event: Event) -> Option<WatchEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Release => None,
        Event::Key(key)
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(WatchEvent::Interrupt)
        }
        Event::Key(key) => Some(WatchEvent::Key(key)),
        Event::Paste(text) => Some(WatchEvent::Paste(paste_keys(&text))),
        Event::Resize(width, height) => Some(WatchEvent::Resize { width, height }),
        Event::FocusGained | Event::FocusLost | Event::Mouse(_) => None,
    }
}

/// Decode pasted text into the key presses that would have typed it.
pub fn paste_keys(text: &str) -> Vec<KeyEvent> {
    text.chars()
        .filter_map(|c| {
            let code = match c {
                '\n' | '\r' => KeyCode::Enter,
                '\t' => KeyCode::Tab,
                c if c.is_control() => return None,
                c => KeyCode::Char(c),
            };
            Some(KeyEvent::new(code, KeyModifiers::empty()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(&key(KeyCode::Down)), "<DOWN>");
        assert_eq!(key_name(&key(KeyCode::Char('q'))), "q");
        assert_eq!(key_name(&key(KeyCode::Char(' '))), "<SPACE>");
        assert_eq!(
            key_name(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            "<Ctrl-x>"
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(WatchEvent::TimerFired.describe(), "Timer");
        assert_eq!(
            WatchEvent::Paste(vec![key(KeyCode::Down), key(KeyCode::Down)]).describe(),
            "Paste[<DOWN> <DOWN>]"
        );
        assert_eq!(
            WatchEvent::Resize {
                width: 80,
                height: 24
            }
            .describe(),
            "Resize(80x24)"
        );
    }

    #[test]
    fn test_map_ctrl_c_is_interrupt() {
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(map_event(ctrl_c), Some(WatchEvent::Interrupt));
    }

    #[test]
    fn test_map_release_is_dropped() {
        let mut release = key(KeyCode::Down);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_event(Event::Key(release)), None);
    }

    #[test]
    fn test_map_resize() {
        assert_eq!(
            map_event(Event::Resize(100, 40)),
            Some(WatchEvent::Resize {
                width: 100,
                height: 40
            })
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_sigint_becomes_interrupt() {
        let mut reader = CrosstermEventReader::new().expect("register signals");
        signal_hook::low_level::raise(signal_hook::consts::signal::SIGINT).expect("raise");

        let event = reader.read_event(Duration::ZERO).expect("read");
        assert_eq!(event, Some(WatchEvent::Interrupt));
        // consumed: the flag does not fire twice
        assert!(!reader.signals.take());
    }

    #[test]
    fn test_paste_decodes_keys() {
        let keys = paste_keys("jj\tk\n\x07");
        let codes: Vec<KeyCode> = keys.iter().map(|k| k.code).collect();
        assert_eq!(
            codes,
            vec![
                KeyCode::Char('j'),
                KeyCode::Char('j'),
                KeyCode::Tab,
                KeyCode::Char('k'),
                KeyCode::Enter,
            ]
        );
    }
}
