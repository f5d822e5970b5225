//! Step executor - interprets [`Op`] lists and applies failure policies.
//!
//! This is the only place that decides what a failed command means:
//! fatal steps abort with the step description as context, advisory steps
//! are logged and skipped. Every executed command lands in the journal.
//!
//! # Usage
//!
//! ```rust,ignore
//! use setup_docker::annotations::ActionsReporter;
//! use setup_docker::component::fatal;
//! use setup_docker::executor::Executor;
//! use setup_docker::process::{HostCommand, SystemRunner};
//!
//! let reporter = ActionsReporter::from_env();
//! let mut exec = Executor::new(&SystemRunner, &reporter);
//! exec.execute(&fatal("docker info", HostCommand::new("docker").arg("info")))?;
//! ```

pub mod journal;

use anyhow::{Context, Result};

use crate::annotations::Reporter;
use crate::component::{FailurePolicy, Op, Step};
use crate::process::{CommandError, CommandRunner, HostCommand};

pub use journal::{StepRecord, StepStatus};

/// Result of an operation that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Ran successfully; carries captured stdout (empty when streamed).
    Succeeded(String),
    /// Advisory failure, swallowed.
    Skipped,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, StepOutcome::Succeeded(_))
    }

    /// Captured stdout, or an empty string for skipped steps.
    pub fn into_output(self) -> String {
        match self {
            StepOutcome::Succeeded(out) => out,
            StepOutcome::Skipped => String::new(),
        }
    }
}

/// Runs operations sequentially against a runner and a reporter.
pub struct Executor<'a> {
    runner: &'a dyn CommandRunner,
    reporter: &'a dyn Reporter,
    journal: Vec<StepRecord>,
}

impl<'a> Executor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, reporter: &'a dyn Reporter) -> Self {
        Self {
            runner,
            reporter,
            journal: Vec::new(),
        }
    }

    pub fn reporter(&self) -> &'a dyn Reporter {
        self.reporter
    }

    /// Steps executed so far.
    pub fn journal(&self) -> &[StepRecord] {
        &self.journal
    }

    pub fn into_journal(self) -> Vec<StepRecord> {
        self.journal
    }

    /// Execute every operation in order, stopping at the first fatal failure.
    pub fn execute_all(&mut self, ops: &[Op]) -> Result<()> {
        for op in ops {
            self.execute(op)?;
        }
        Ok(())
    }

    /// Execute one operation.
    ///
    /// Groups report the outcome of their last operation.
    pub fn execute(&mut self, op: &Op) -> Result<StepOutcome> {
        match op {
            Op::Run(step) => self.run_step(step),
            Op::Fallback {
                description,
                primary,
                fallback,
            } => self.run_fallback(description, primary, fallback),
            Op::Export { name, value } => {
                self.reporter.debug(&format!("export {name}={value}"));
                self.reporter
                    .export_variable(name, value)
                    .with_context(|| format!("exporting {name}"))?;
                Ok(StepOutcome::Succeeded(String::new()))
            }
            Op::Group(name, ops) => {
                self.reporter.start_group(name);
                let mut last = Ok(StepOutcome::Succeeded(String::new()));
                for op in ops {
                    last = self.execute(op);
                    if last.is_err() {
                        break;
                    }
                }
                self.reporter.end_group();
                last
            }
        }
    }

    fn run_step(&mut self, step: &Step) -> Result<StepOutcome> {
        self.reporter.debug(&step.description);
        match self.invoke(&step.command) {
            Ok(output) => {
                self.record(&step.description, &step.command, step.policy, None);
                Ok(StepOutcome::Succeeded(output))
            }
            Err(err) => match step.policy {
                FailurePolicy::Fatal => {
                    self.record(
                        &step.description,
                        &step.command,
                        step.policy,
                        Some((StepStatus::Failed, &err)),
                    );
                    Err(err).context(step.description.clone())
                }
                FailurePolicy::Advisory => {
                    tracing::warn!(step = %step.description, error = %err, "advisory step failed");
                    self.reporter
                        .debug(&format!("{} skipped: {}", step.description, err));
                    self.record(
                        &step.description,
                        &step.command,
                        step.policy,
                        Some((StepStatus::Skipped, &err)),
                    );
                    Ok(StepOutcome::Skipped)
                }
            },
        }
    }

    fn run_fallback(
        &mut self,
        description: &str,
        primary: &HostCommand,
        fallback: &HostCommand,
    ) -> Result<StepOutcome> {
        match self.invoke(primary) {
            Ok(output) => {
                self.record(description, primary, FailurePolicy::Fatal, None);
                return Ok(StepOutcome::Succeeded(output));
            }
            Err(err) => {
                tracing::warn!(step = %description, error = %err, "primary command failed; trying fallback");
                self.reporter.info(&format!(
                    "{description}: `{}` failed, retrying with `{}`",
                    primary.program, fallback.program
                ));
                self.record(
                    description,
                    primary,
                    FailurePolicy::Advisory,
                    Some((StepStatus::Skipped, &err)),
                );
            }
        }

        match self.invoke(fallback) {
            Ok(output) => {
                self.record(description, fallback, FailurePolicy::Fatal, None);
                Ok(StepOutcome::Succeeded(output))
            }
            Err(err) => {
                self.record(
                    description,
                    fallback,
                    FailurePolicy::Fatal,
                    Some((StepStatus::Failed, &err)),
                );
                Err(err).with_context(|| format!("{description} (fallback)"))
            }
        }
    }

    fn invoke(&self, command: &HostCommand) -> Result<String, CommandError> {
        self.reporter.command(&command.to_string());
        self.runner.run(command)
    }

    fn record(
        &mut self,
        description: &str,
        command: &HostCommand,
        policy: FailurePolicy,
        failure: Option<(StepStatus, &CommandError)>,
    ) {
        let (status, error) = match failure {
            None => (StepStatus::Succeeded, None),
            Some((status, err)) => (status, Some(err.to_string())),
        };
        self.journal.push(StepRecord {
            description: description.to_string(),
            command: command.to_string(),
            policy,
            status,
            error,
        });
    }
}
