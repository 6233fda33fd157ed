//! # Configuration
//!
//! User settings stored in `~/.config/vatch/config.json`.
//!
//! ## Overview
//!
//! Every field has a default, so the file only needs the keys that differ:
//!
//! ```json
//! {
//!   "theme": "Nord",
//!   "idle_threshold_secs": 600,
//!   "privileged_uids": [0, 1000]
//! }
//! ```
//!
//! A missing file means defaults. A file that exists but cannot be read or
//! parsed is an error: vatch refuses to start rather than silently ignore it.
//! Command-line flags take precedence over the file.
//!
//! The `directories` crate is used to resolve the platform-appropriate config
//! directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ui::scheduler::{DEFAULT_IDLE_THRESHOLD, DEFAULT_MIN_INTERVAL, MAX_INTERVAL};
use crate::ui::theme::Theme;
use crate::ui::viewport::{DEFAULT_STEP_X, DEFAULT_STEP_Y, DEFAULT_TAB_STEP};

/// User configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The name of the header theme (must match a built-in theme name).
    #[serde(default = "default_theme_name")]
    pub theme: String,

    /// Seconds without input after which refreshing pauses.
    #[serde(default = "default_idle_threshold_secs")]
    pub idle_threshold_secs: u64,

    /// Shortest interval allowed for unprivileged users.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// User ids exempt from the minimum interval.
    #[serde(default = "default_privileged_uids")]
    pub privileged_uids: Vec<u32>,

    #[serde(default = "default_step_x")]
    pub step_x: usize,

    #[serde(default = "default_step_y")]
    pub step_y: usize,

    #[serde(default = "default_tab_step")]
    pub tab_step: usize,
}

fn default_theme_name() -> String {
    Theme::default_theme().name.to_string()
}

fn default_idle_threshold_secs() -> u64 {
    DEFAULT_IDLE_THRESHOLD.as_secs()
}

fn default_min_interval_secs() -> u64 {
    DEFAULT_MIN_INTERVAL.as_secs()
}

fn default_privileged_uids() -> Vec<u32> {
    vec![0]
}

fn default_step_x() -> usize {
    DEFAULT_STEP_X
}

fn default_step_y() -> usize {
    DEFAULT_STEP_Y
}

fn default_tab_step() -> usize {
    DEFAULT_TAB_STEP
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme_name(),
            idle_threshold_secs: default_idle_threshold_secs(),
            min_interval_secs: default_min_interval_secs(),
            privileged_uids: default_privileged_uids(),
            step_x: default_step_x(),
            step_y: default_step_y(),
            tab_step: default_tab_step(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path. Returns `Config::default()` if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if Theme::by_name(&self.theme).is_none() {
            let known: Vec<&str> = Theme::all().iter().map(|t| t.name).collect();
            anyhow::bail!(
                "Unknown theme '{}' (available: {})",
                self.theme,
                known.join(", ")
            );
        }
        if self.step_x == 0 || self.step_y == 0 || self.tab_step == 0 {
            anyhow::bail!("step_x, step_y and tab_step must be at least 1");
        }
        if self.min_interval_secs > MAX_INTERVAL.as_secs() {
            anyhow::bail!(
                "min_interval_secs must be at most {}",
                MAX_INTERVAL.as_secs()
            );
        }
        Ok(())
    }

    /// The configured theme, falling back to the default one.
    pub fn theme(&self) -> Theme {
        Theme::by_name(&self.theme)
            .unwrap_or_else(Theme::default_theme)
            .clone()
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    /// Return the path to the config file.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "vatch")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.json"))
    }
}
