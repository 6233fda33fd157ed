//! vatch - `watch`, but scrollable and pausable
//!
//! Runs a command periodically and shows its colored output full-screen. The
//! output can be scrolled in both directions, refreshed on demand, and
//! refreshing pauses by itself when nobody is looking.

pub mod logging;
pub mod script;
pub mod ui;
