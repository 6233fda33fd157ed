//! # vatch CLI Entry Point
//!
//! Like `watch`, but the output can be scrolled and refreshing pauses when
//! nobody is looking.
//!
//! ## Usage
//!
//! ```bash
//! # Refresh every 60 seconds (the default)
//! vatch df -h
//!
//! # Refresh every 5 seconds (root, or a uid listed in privileged_uids)
//! vatch -n 5 'ps aux --sort=-%cpu'
//!
//! # Run built-in scripts inside the process
//! vatch -m in-process 'date %H:%M:%S; ls /tmp'
//! ```
//!
//! ## Key Bindings
//!
//! - `Up` / `k`, `Down` / `j` - scroll one line
//! - `PageUp` / `PageDown` - scroll one screen
//! - `Left` / `h`, `Right` / `l` - scroll 4 columns
//! - `Tab` - scroll 8 columns right
//! - `Home` - back to column 0
//! - `g` / `G`, `End` - first line / last line
//! - `Enter` / `Space` - refresh now
//! - `Esc` / `q` / `Ctrl+c` - quit
//!
//! ## Architecture
//!
//! 1. **Configuration**: `config.json` plus command-line overrides
//! 2. **Scheduling**: the interval (with a floor for unprivileged users) and
//!    the idle threshold
//! 3. **UI**: the controller loop drawing into the alternate screen

use vatch::logging;
use vatch::script::{Command, ExecutionMode};
use vatch::ui::clock::{Clock, SystemClock};
use vatch::ui::config::Config;
use vatch::ui::event::CrosstermEventReader;
use vatch::ui::scheduler::{effective_interval, Scheduler, UidAllowList, MAX_INTERVAL};
use vatch::ui::terminal::{self, TerminalGuard};
use vatch::ui::viewport::Viewport;
use vatch::ui::{run_app, App};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// vatch - like watch, but scrollable
#[derive(Parser, Debug)]
#[command(name = "vatch")]
#[command(author = "Luckystrike561")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a command periodically and scroll through its output", long_about = None)]
struct Args {
    /// Command to watch (joined with spaces, run through the shell)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,

    /// Seconds between refreshes
    #[arg(short = 'n', long, value_name = "SECS", default_value = "60", value_parser = parse_interval)]
    interval: u64,

    /// Interpret ANSI color sequences (always on, accepted for compatibility)
    #[arg(short, long)]
    color: bool,

    /// How the command is run
    #[arg(short, long, value_enum, default_value_t = ExecutionMode::External)]
    mode: ExecutionMode,

    /// Seconds without input after which refreshing pauses
    #[arg(long, value_name = "SECS")]
    idle: Option<u64>,

    /// Path to the configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the log file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn parse_interval(value: &str) -> Result<u64> {
    let secs = value
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid interval '{value}': expected whole seconds"))?;
    if secs > MAX_INTERVAL.as_secs() {
        anyhow::bail!(
            "invalid interval '{value}': at most {} seconds",
            MAX_INTERVAL.as_secs()
        );
    }
    Ok(secs)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    run_application(args).await
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

async fn run_application(args: Args) -> Result<()> {
    let config = load_config(&args).context("Failed to load configuration")?;

    let log_path = args.log_file.clone().or_else(logging::default_log_path);
    if let Some(path) = &log_path {
        if let Err(e) = logging::init(path) {
            eprintln!("Warning: Logging disabled: {e:#}");
        }
    }

    let requested = Duration::from_secs(args.interval);
    let policy = UidAllowList::for_current_user(config.privileged_uids.clone());
    let interval = effective_interval(requested, config.min_interval(), &policy);
    if interval != requested {
        tracing::info!(?requested, ?interval, "interval raised to the minimum");
    }
    let idle_threshold = args
        .idle
        .map_or_else(|| config.idle_threshold(), Duration::from_secs);
    tracing::debug!(color = args.color, mode = ?args.mode, ?idle_threshold, "settings");

    let command = Command::new(&args.command.join(" "), args.mode);
    let clock = SystemClock;
    let scheduler = Scheduler::new(interval, idle_threshold, clock.now());
    let viewport = Viewport::new(config.step_x, config.step_y, config.tab_step);
    let mut app = App::new(command, scheduler, viewport, config.theme());

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let title = format!("{}: vatch {}", app.hostname(), terminal::shell_join(&argv));
    if let Err(e) = terminal::set_title(&title) {
        tracing::warn!(error = %e, "could not set terminal title");
    }

    let mut event_reader = CrosstermEventReader::new()?;
    let mut guard = TerminalGuard::enter()?;
    let run_result = run_app(&mut app, &mut event_reader, &mut guard, &clock);

    // Restore terminal (always runs, even if run_app failed)
    let cleanup_result = guard.restore();

    run_result?;
    cleanup_result?;

    Ok(())
}
