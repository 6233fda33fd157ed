//! # Output Capture
//!
//! In-process scripts write to the executor's [`ScriptIo`]: two output streams
//! and an argument vector, the equivalent of a process's stdout, stderr and
//! argv. Outside of a script run these point at the real process streams.
//!
//! [`Redirect`] swaps them for capturing replacements for the duration of one
//! invocation. The originals come back when the guard is released or dropped,
//! so they are restored even if the script panics.
//!
//! [`catch_panic`] runs a closure and turns a panic into a [`PanicTrace`]
//! instead of unwinding further. While it runs, the default panic message is
//! suppressed so it cannot scribble over the TUI.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

/// Where a script's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
    Captured(Vec<u8>),
}

impl Stream {
    fn into_text(self) -> String {
        match self {
            Stream::Captured(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Stream::Stdout | Stream::Stderr => String::new(),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Stdout => io::stdout().write(buf),
            Stream::Stderr => io::stderr().write(buf),
            Stream::Captured(bytes) => {
                bytes.extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Stdout => io::stdout().flush(),
            Stream::Stderr => io::stderr().flush(),
            Stream::Captured(_) => Ok(()),
        }
    }
}

/// The streams and arguments a script sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptIo {
    pub stdout: Stream,
    pub stderr: Stream,
    /// `argv[0]` is the script name, as for a process.
    pub argv: Vec<String>,
}

impl ScriptIo {
    /// The real process streams and arguments.
    pub fn process() -> Self {
        Self {
            stdout: Stream::Stdout,
            stderr: Stream::Stderr,
            argv: std::env::args().collect(),
        }
    }

    fn capturing(argv: Vec<String>) -> Self {
        Self {
            stdout: Stream::Captured(Vec::new()),
            stderr: Stream::Captured(Vec::new()),
            argv,
        }
    }

    /// Arguments after the script name.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

/// Text captured during one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Scoped replacement of a [`ScriptIo`] with capturing streams.
pub struct Redirect<'a> {
    io: &'a mut ScriptIo,
    saved: Option<ScriptIo>,
}

impl<'a> Redirect<'a> {
    pub fn acquire(io: &'a mut ScriptIo, argv: Vec<String>) -> Self {
        let saved = std::mem::replace(io, ScriptIo::capturing(argv));
        Self {
            io,
            saved: Some(saved),
        }
    }

    /// The capturing streams scripts should write to.
    pub fn io(&mut self) -> &mut ScriptIo {
        self.io
    }

    /// Restore the originals and hand back what was captured.
    pub fn release(mut self) -> Captured {
        let Some(original) = self.saved.take() else {
            return Captured::default();
        };
        let captured = std::mem::replace(self.io, original);
        Captured {
            stdout: captured.stdout.into_text(),
            stderr: captured.stderr.into_text(),
        }
    }
}

impl Drop for Redirect<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.saved.take() {
            *self.io = original;
        }
    }
}

/// What is known about a caught panic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanicTrace {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: Vec<String>,
}

impl PanicTrace {
    /// Trace lines for display, location first.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.backtrace.len() + 1);
        if let Some(location) = &self.location {
            lines.push(format!("  at {location}"));
        }
        lines.extend(self.backtrace.iter().map(|l| format!("  {l}")));
        lines
    }
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<PanicTrace>> = const { RefCell::new(None) };
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CAPTURING.get() {
                previous(info);
                return;
            }
            let backtrace = Backtrace::capture();
            let backtrace = if backtrace.status() == BacktraceStatus::Captured {
                backtrace.to_string().lines().map(str::to_owned).collect()
            } else {
                Vec::new()
            };
            let trace = PanicTrace {
                message: String::new(),
                location: info.location().map(ToString::to_string),
                backtrace,
            };
            LAST_PANIC.set(Some(trace));
        }));
    });
}

/// Run `f`, converting a panic into a [`PanicTrace`].
pub fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, PanicTrace> {
    install_panic_hook();

    let was_capturing = CAPTURING.replace(true);
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.set(was_capturing);

    result.map_err(|payload| {
        let mut trace = LAST_PANIC.take().unwrap_or_default();
        trace.message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        trace
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ambient() -> ScriptIo {
        ScriptIo {
            stdout: Stream::Stdout,
            stderr: Stream::Stderr,
            argv: vec!["vatch".to_string(), "--flag".to_string()],
        }
    }

    #[test]
    fn test_redirect_captures_and_restores() {
        let mut io = ambient();
        let mut redirect = Redirect::acquire(&mut io, vec!["echo".into(), "hi".into()]);

        assert_eq!(redirect.io().args(), &["hi".to_string()]);
        write!(redirect.io().stdout, "out").expect("write stdout");
        write!(redirect.io().stderr, "err").expect("write stderr");

        let captured = redirect.release();
        assert_eq!(captured.stdout, "out");
        assert_eq!(captured.stderr, "err");
        assert_eq!(io, ambient());
    }

    #[test]
    fn test_redirect_restores_on_drop() {
        let mut io = ambient();
        {
            let mut redirect = Redirect::acquire(&mut io, vec!["x".into()]);
            write!(redirect.io().stdout, "discarded").expect("write");
        }
        assert_eq!(io, ambient());
    }

    #[test]
    fn test_redirect_restores_after_panic() {
        let mut io = ambient();
        let result = catch_panic(|| {
            let mut redirect = Redirect::acquire(&mut io, vec!["boom".into()]);
            write!(redirect.io().stdout, "partial").expect("write");
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(io, ambient());
    }

    #[test]
    fn test_catch_panic_message_and_location() {
        let trace = catch_panic(|| panic!("exploded {}", 42)).expect_err("should panic");
        assert_eq!(trace.message, "exploded 42");
        let location = trace.location.as_ref().expect("location recorded");
        assert!(location.contains("capture.rs"));
        assert!(trace.lines()[0].starts_with("  at "));
    }

    #[test]
    fn test_catch_panic_passes_through_values() {
        assert_eq!(catch_panic(|| 7), Ok(7));
    }

    #[test]
    fn test_args_without_script_name() {
        let io = ScriptIo {
            stdout: Stream::Stdout,
            stderr: Stream::Stderr,
            argv: Vec::new(),
        };
        assert!(io.args().is_empty());
    }
}
