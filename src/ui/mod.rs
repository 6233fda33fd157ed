//! # UI Module
//!
//! The watch screen and the loop behind it.
//!
//! ## Components
//!
//! - [`App`] - the controller: owns the output buffer, viewport and scheduler
//! - [`mod@render`] - composes header and output into a frame
//! - [`styled`] - text lines with style runs, parsed from ANSI output
//! - [`viewport`] - scroll offsets and their clamping rules
//! - [`scheduler`] - refresh timing and idle detection
//! - [`event`] - terminal input as [`event::WatchEvent`]s
//! - [`terminal`] - raw mode / alternate screen guard
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Every 60s: df -h                 host: <time>   │
//! │ x,y=0,0; <DOWN>; move                           │
//! │                                                 │
//! │ command output, scrolled by x,y                 │
//! │ ...                                             │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod clock;
pub mod config;
pub mod event;
pub mod render;
pub mod scheduler;
pub mod styled;
pub mod terminal;
pub mod theme;
pub mod viewport;

pub use app::{run_app, App};
pub use render::{compose_frame, FrameView};
