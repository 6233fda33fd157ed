//! # Command Executor
//!
//! Runs the watched command once and returns its output as lines.
//!
//! ## Execution Modes
//!
//! | Mode | Command | Output |
//! |------|---------|--------|
//! | External | `sh -c <command>` | stdout lines, then stderr lines |
//! | In-process | `name args; name args; ...` | per invocation: stdout, stderr, errors |
//!
//! ## Key Design Decisions
//!
//! ### Never Fails
//!
//! [`CommandExecutor::execute`] has no error path. A command that cannot be
//! spawned, a script that returns an error, or a script that panics is turned
//! into an error-marked line in the output, so a broken command never ends the
//! session.
//!
//! ### Exit Status Is Ignored
//!
//! Like `watch`, a non-zero exit status does not change what is shown. The
//! status is only logged.
//!
//! ### Captured Streams
//!
//! External commands get a closed stdin and piped stdout/stderr; they never see
//! the terminal the TUI is drawing on. In-process scripts get their streams
//! swapped through [`Redirect`].

use crate::script::builtin::ScriptRegistry;
use crate::script::capture::{self, Redirect, ScriptIo};
use chrono::{DateTime, Local};
use std::fmt;
use std::process::{Command as Process, Stdio};

/// Marker word that starts every diagnostic line.
pub const ERROR_MARKER: &str = "ERROR";

/// How the watched command is run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutionMode {
    /// Spawn the command through the system shell.
    #[default]
    External,
    /// Run built-in scripts inside the vatch process.
    InProcess,
}

/// One call of a built-in script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

/// The watched command, fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Shell(String),
    InProcess(Vec<Invocation>),
}

impl Command {
    pub fn new(source: &str, mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::External => Command::Shell(source.to_string()),
            ExecutionMode::InProcess => Self::in_process(source),
        }
    }

    /// Parse `name args; name args; ...` into invocations.
    ///
    /// Empty segments are skipped; arguments are split on whitespace.
    pub fn in_process(source: &str) -> Self {
        let invocations = source
            .split(';')
            .filter_map(|segment| {
                let mut words = segment.split_whitespace().map(str::to_owned);
                let name = words.next()?;
                Some(Invocation {
                    name,
                    args: words.collect(),
                })
            })
            .collect();
        Command::InProcess(invocations)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Shell(cmd) => f.write_str(cmd),
            Command::InProcess(invocations) => {
                for (i, invocation) in invocations.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    f.write_str(&invocation.name)?;
                    for arg in &invocation.args {
                        write!(f, " {arg}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// The result of one refresh.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub lines: Vec<String>,
    pub timestamp: DateTime<Local>,
}

/// A red, error-marked diagnostic line.
pub fn error_line(message: &str) -> String {
    format!("\x1b[31m{ERROR_MARKER} {message}\x1b[0m")
}

#[derive(Debug)]
pub struct CommandExecutor {
    registry: ScriptRegistry,
    io: ScriptIo,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(ScriptRegistry::with_builtins())
    }
}

impl CommandExecutor {
    pub fn new(registry: ScriptRegistry) -> Self {
        Self::with_io(registry, ScriptIo::process())
    }

    /// Use `io` as the ambient streams scripts are redirected from.
    pub fn with_io(registry: ScriptRegistry, io: ScriptIo) -> Self {
        Self { registry, io }
    }

    pub fn registry_mut(&mut self) -> &mut ScriptRegistry {
        &mut self.registry
    }

    /// The ambient streams, as they are between runs.
    pub fn io(&self) -> &ScriptIo {
        &self.io
    }

    /// Run the command once. Never fails: problems become output lines.
    pub fn execute(&mut self, command: &Command) -> CommandOutput {
        let lines = match command {
            Command::Shell(cmd) => run_shell(cmd),
            Command::InProcess(invocations) => {
                let mut lines = Vec::new();
                for invocation in invocations {
                    self.run_invocation(invocation, &mut lines);
                }
                lines
            }
        };

        CommandOutput {
            lines,
            timestamp: Local::now(),
        }
    }

    fn run_invocation(&mut self, invocation: &Invocation, lines: &mut Vec<String>) {
        let name = &invocation.name;
        let Some(script) = self.registry.get(name) else {
            let known: Vec<&str> = self.registry.names().collect();
            lines.push(error_line(&format!(
                "{name}: unknown script (known: {})",
                known.join(", ")
            )));
            return;
        };

        let mut argv = Vec::with_capacity(invocation.args.len() + 1);
        argv.push(name.clone());
        argv.extend(invocation.args.iter().cloned());

        let mut redirect = Redirect::acquire(&mut self.io, argv);
        let outcome = capture::catch_panic(|| script(redirect.io()));
        let captured = redirect.release();

        lines.extend(captured.stdout.lines().map(str::to_owned));
        lines.extend(captured.stderr.lines().map(str::to_owned));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::debug!(script = %name, error = %err, "script failed");
                lines.push(error_line(&format!("{name}: {err}")));
                lines.extend(err.chain().skip(1).map(|cause| format!("  caused by: {cause}")));
            }
            Err(trace) => {
                tracing::warn!(script = %name, message = %trace.message, "script panicked");
                lines.push(error_line(&format!("{name}: panicked: {}", trace.message)));
                lines.extend(trace.lines());
            }
        }
    }
}

#[cfg(unix)]
fn shell_process(cmd: &str) -> Process {
    let mut process = Process::new("sh");
    process.arg("-c").arg(cmd);
    process
}

#[cfg(not(unix))]
fn shell_process(cmd: &str) -> Process {
    let mut process = Process::new("cmd");
    process.arg("/C").arg(cmd);
    process
}

/// Run through the shell, stdout lines first, then stderr lines.
fn run_shell(cmd: &str) -> Vec<String> {
    let output = shell_process(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(output) => {
            tracing::debug!(command = %cmd, status = ?output.status, "command finished");
            let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_owned)
                .collect();
            lines.extend(
                String::from_utf8_lossy(&output.stderr)
                    .lines()
                    .map(str::to_owned),
            );
            lines
        }
        Err(err) => {
            tracing::warn!(command = %cmd, error = %err, "failed to spawn command");
            vec![error_line(&format!("Failed to run `{cmd}`: {err}"))]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::capture::Stream;

    fn ambient() -> ScriptIo {
        ScriptIo {
            stdout: Stream::Stdout,
            stderr: Stream::Stderr,
            argv: vec!["vatch".to_string()],
        }
    }

    #[test]
    fn test_in_process_parsing() {
        let command = Command::in_process("echo a b;  ; date %Y ");
        assert_eq!(
            command,
            Command::InProcess(vec![
                Invocation {
                    name: "echo".to_string(),
                    args: vec!["a".to_string(), "b".to_string()],
                },
                Invocation {
                    name: "date".to_string(),
                    args: vec!["%Y".to_string()],
                },
            ])
        );
        assert_eq!(command.to_string(), "echo a b; date %Y");
    }

    #[test]
    fn test_command_new_by_mode() {
        assert_eq!(
            Command::new("ls -l", ExecutionMode::External),
            Command::Shell("ls -l".to_string())
        );
        assert!(matches!(
            Command::new("ls", ExecutionMode::InProcess),
            Command::InProcess(_)
        ));
    }

    #[test]
    fn test_error_line_is_marked() {
        let line = error_line("oops");
        assert!(line.contains("ERROR oops"));
        assert!(line.starts_with("\x1b[31m"));
        assert!(line.ends_with("\x1b[0m"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_stdout_before_stderr() {
        let lines = run_shell("echo B >&2; echo A");
        assert_eq!(lines, vec!["A", "B"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_exit_status_ignored() {
        let lines = run_shell("echo A; echo B >&2; exit 1");
        assert_eq!(lines, vec!["A", "B"]);
    }

    #[test]
    fn test_unknown_script() {
        let mut executor = CommandExecutor::with_io(ScriptRegistry::with_builtins(), ambient());
        let output = executor.execute(&Command::in_process("nope"));
        assert_eq!(output.lines.len(), 1);
        assert!(output.lines[0].contains("nope: unknown script"));
        assert!(output.lines[0].contains("echo"));
    }

    #[test]
    fn test_error_result_reports_cause_chain() {
        let mut registry = ScriptRegistry::empty();
        registry.register("fails", |_| {
            Err(anyhow::anyhow!("root cause")).map_err(|e| e.context("outer"))
        });
        let mut executor = CommandExecutor::with_io(registry, ambient());

        let output = executor.execute(&Command::in_process("fails"));
        assert!(output.lines[0].contains("ERROR fails: outer"));
        assert_eq!(output.lines[1], "  caused by: root cause");
        assert_eq!(executor.io(), &ambient());
    }
}
