//! External command execution and output classification.
//!
//! The engine never interprets the version-control system's behavior beyond
//! three signals: the exit status, whether stderr is empty, and whether
//! stderr matches a known benign pattern. Each call site supplies the benign
//! patterns that apply to its action; everything else non-empty on stderr,
//! or a non-zero exit, is fatal for that stage.
//!
//! The benign-pattern table itself lives in [`patterns`] so that new message
//! variants (the most common source of false failures) are added in one
//! place.

pub mod patterns;

use std::io::{self, Write};
use std::process::{Command, Stdio};

use regex::Regex;
use thiserror::Error;

/// Errors from launching an external command.
///
/// A command that launched but misbehaved is not an error at this layer;
/// that is a classification concern (see [`classify`]).
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be spawned or its output could not be read.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Writing to the child's stdin failed.
    #[error("failed to write stdin for `{command}`: {source}")]
    Stdin {
        command: String,
        source: std::io::Error,
    },
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;

/// Captured output of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// The rendered command line, for error reporting.
    pub command: String,

    /// Exit code; -1 when the process was killed by a signal.
    pub exit_code: i32,

    /// Captured standard output, lossily decoded.
    pub stdout: String,

    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl ExecOutput {
    /// Returns true if the command exited zero with empty stderr.
    pub fn is_clean(&self) -> bool {
        self.exit_code == 0 && self.stderr.trim().is_empty()
    }

    /// Human-readable dump of the command and both streams, used verbatim
    /// in fatal error reports so the operator sees exactly what the server
    /// said.
    pub fn render(&self) -> String {
        let mut out = format!("command: {}\nexit: {}", self.command, self.exit_code);
        if !self.stdout.trim().is_empty() {
            out.push_str("\nstdout:\n");
            out.push_str(self.stdout.trim_end());
        }
        if !self.stderr.trim().is_empty() {
            out.push_str("\nstderr:\n");
            out.push_str(self.stderr.trim_end());
        }
        out
    }
}

/// Classification of one command's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Clean run: zero exit, nothing unexpected on stderr.
    Success(ExecOutput),

    /// The command reported a known nothing-to-do condition. Treated as
    /// success by callers, but kept distinct so stages can branch on it.
    BenignNoop(ExecOutput),

    /// Anything else: non-zero exit or unrecognized stderr text.
    Fatal(ExecOutput),
}

impl CommandOutcome {
    /// Returns true unless the outcome is fatal.
    pub fn is_ok(&self) -> bool {
        !matches!(self, CommandOutcome::Fatal(_))
    }

    /// The captured output, whatever the classification.
    pub fn output(&self) -> &ExecOutput {
        match self {
            CommandOutcome::Success(out)
            | CommandOutcome::BenignNoop(out)
            | CommandOutcome::Fatal(out) => out,
        }
    }
}

/// Runs a command, capturing exit status and both output streams.
pub fn run(bin: &str, args: &[&str]) -> ExecResult<ExecOutput> {
    run_with_stdin(bin, args, None)
}

/// Runs a command, optionally feeding `stdin` to the child.
///
/// Used for form-style actions where the external tool reads a document
/// from standard input (client-spec and change-spec updates).
pub fn run_with_stdin(bin: &str, args: &[&str], stdin: Option<&str>) -> ExecResult<ExecOutput> {
    let command = render_command(bin, args);
    tracing::debug!(command = %command, "running external command");

    let mut cmd = Command::new(bin);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: command.clone(),
        source,
    })?;

    // The write happens on its own thread while this one drains stdout and
    // stderr; writing inline deadlocks once the child fills a pipe buffer
    // before it starts reading its stdin.
    let writer = if let Some(input) = stdin
        && let Some(mut pipe) = child.stdin.take()
    {
        let bytes = input.as_bytes().to_vec();
        // Dropping the pipe at the end closes it so the child sees EOF.
        Some(std::thread::spawn(move || pipe.write_all(&bytes)))
    } else {
        None
    };

    let output = child
        .wait_with_output()
        .map_err(|source| ExecError::Spawn {
            command: command.clone(),
            source,
        })?;

    if let Some(handle) = writer {
        match handle.join() {
            // A child that exits without consuming its stdin breaks the
            // pipe; its exit status and output already tell the story.
            Ok(Ok(())) => {}
            Ok(Err(source)) if source.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(source)) => {
                return Err(ExecError::Stdin {
                    command,
                    source,
                });
            }
            Err(_) => {
                return Err(ExecError::Stdin {
                    command,
                    source: io::Error::other("stdin writer thread panicked"),
                });
            }
        }
    }

    let result = ExecOutput {
        command,
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    tracing::debug!(
        exit = result.exit_code,
        stderr_len = result.stderr.len(),
        "command finished"
    );
    Ok(result)
}

/// Classifies captured output against the benign patterns for this action.
///
/// An output is benign when every non-empty stderr line matches at least
/// one of the supplied patterns; a single unrecognized line makes the whole
/// output fatal, because partial failures must not be mistaken for no-ops.
pub fn classify(output: ExecOutput, benign: &[&Regex]) -> CommandOutcome {
    let stderr = output.stderr.trim();

    if stderr.is_empty() {
        return if output.exit_code == 0 {
            CommandOutcome::Success(output)
        } else {
            CommandOutcome::Fatal(output)
        };
    }

    let all_benign = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .all(|line| benign.iter().any(|re| re.is_match(line)));

    if all_benign {
        CommandOutcome::BenignNoop(output)
    } else {
        CommandOutcome::Fatal(output)
    }
}

fn render_command(bin: &str, args: &[&str]) -> String {
    let mut parts = vec![bin.to_string()];
    parts.extend(args.iter().map(|a| a.to_string()));
    parts.join(" ")
}
