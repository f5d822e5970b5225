//! Host command execution.
//!
//! Every external program the provisioning workflow touches goes through a
//! [`CommandRunner`]. Commands are structured argument lists ([`HostCommand`]),
//! never shell strings, so each step can be replayed against a scripted
//! runner in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use setup_docker::process::{CommandRunner, HostCommand, SystemRunner};
//!
//! let codename = SystemRunner
//!     .run(&HostCommand::new("lsb_release").arg("-cs").capture())
//!     .unwrap();
//! println!("release codename: {codename}");
//! ```

#[cfg(test)]
pub(crate) mod scripted;

use std::fmt;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use thiserror::Error;

/// How a command's output streams are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// stdout/stderr go straight to the CI log; only the exit status counts.
    #[default]
    Stream,
    /// stdout is captured and returned; any stderr output is a failure.
    Capture,
}

/// A program invocation: argv plus optional stdin text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub output: OutputMode,
}

impl HostCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            output: OutputMode::Stream,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `text` to the command's stdin.
    pub fn stdin(mut self, text: impl Into<String>) -> Self {
        self.stdin = Some(text.into());
        self
    }

    /// Capture stdout instead of streaming it.
    pub fn capture(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    /// Full argv, program first.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .argv()
            .into_iter()
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&rendered)
    }
}

/// Quote an argument for display only; nothing is ever passed to a shell.
fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%~".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Failure of a single host command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{command}` wrote to stderr: {stderr}")]
    Stderr { command: String, stderr: String },
}

impl CommandError {
    /// Rendered command line of the failing invocation.
    pub fn command(&self) -> &str {
        match self {
            CommandError::Spawn { command, .. }
            | CommandError::Failed { command, .. }
            | CommandError::Stderr { command, .. } => command,
        }
    }

    /// Captured stderr, empty for streamed commands.
    pub fn stderr(&self) -> &str {
        match self {
            CommandError::Spawn { .. } => "",
            CommandError::Failed { stderr, .. } | CommandError::Stderr { stderr, .. } => stderr,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Executes host commands.
///
/// Returns trimmed stdout for captured commands and an empty string for
/// streamed ones.
pub trait CommandRunner {
    fn run(&self, command: &HostCommand) -> Result<String, CommandError>;
}

/// Runs commands on the real host with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &HostCommand) -> Result<String, CommandError> {
        let rendered = command.to_string();
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);

        match command.output {
            OutputMode::Stream => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }
        cmd.stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        tracing::debug!(command = %rendered, "spawning host command");
        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        // Feed stdin from its own thread so a child echoing its input cannot
        // fill the stdout pipe while we are still writing.
        let writer = match (&command.stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.clone();
                Some(thread::spawn(move || pipe.write_all(input.as_bytes())))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|source| CommandError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if let Some(writer) = writer {
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            match written {
                Ok(()) => {}
                // The child may exit without reading all of its input.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(source) => {
                    return Err(CommandError::Spawn {
                        command: rendered,
                        source,
                    })
                }
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: rendered,
                status: output.status,
                stderr,
            });
        }

        if command.output == OutputMode::Capture && !stderr.is_empty() {
            return Err(CommandError::Stderr {
                command: rendered,
                stderr,
            });
        }

        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_only_when_needed() {
        let cmd = HostCommand::new("dpkg-query")
            .args(["-W", "--showformat=${Status}", "docker-ce"]);
        assert_eq!(
            cmd.to_string(),
            "dpkg-query -W '--showformat=${Status}' docker-ce"
        );
    }

    #[test]
    fn test_capture_returns_trimmed_stdout() {
        let out = SystemRunner
            .run(&HostCommand::new("echo").arg("  hello  ").capture())
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_stdin_is_forwarded() {
        let out = SystemRunner
            .run(&HostCommand::new("cat").stdin("{\"debug\":true}\n").capture())
            .unwrap();
        assert_eq!(out, "{\"debug\":true}");
    }

    #[test]
    fn test_large_stdin_echoed_back_does_not_block() {
        let input = "x".repeat(1 << 20);
        let out = SystemRunner
            .run(&HostCommand::new("cat").stdin(input.clone()).capture())
            .unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn test_non_zero_exit_is_failure() {
        let err = SystemRunner
            .run(&HostCommand::new("sh").args(["-c", "echo boom >&2; exit 3"]).capture())
            .unwrap_err();
        assert!(matches!(err, CommandError::Failed { .. }));
        assert_eq!(err.stderr(), "boom");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_captured_stderr_is_failure() {
        let err = SystemRunner
            .run(&HostCommand::new("sh").args(["-c", "echo warn >&2"]).capture())
            .unwrap_err();
        assert!(matches!(err, CommandError::Stderr { .. }));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = SystemRunner
            .run(&HostCommand::new("definitely_not_a_real_command_12345"))
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert_eq!(err.command(), "definitely_not_a_real_command_12345");
    }
}
