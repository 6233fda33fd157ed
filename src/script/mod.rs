//! # Script Module
//!
//! Runs the watched command and turns whatever it produces into output lines.
//!
//! - [`executor`] - the [`CommandExecutor`] and the [`Command`] it runs
//! - [`builtin`] - scripts available in in-process mode
//! - [`capture`] - scoped stream/argument redirection and panic capture

pub mod builtin;
pub mod capture;
pub mod executor;

pub use builtin::ScriptRegistry;
pub use capture::{Redirect, ScriptIo, Stream};
pub use executor::{
    error_line, Command, CommandExecutor, CommandOutput, ExecutionMode, Invocation, ERROR_MARKER,
};
