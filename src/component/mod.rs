//! Declarative provisioning steps.
//!
//! Installer variants describe WHAT needs to happen as a list of [`Op`]s;
//! the [`executor`](crate::executor) decides HOW, applying each step's
//! [`FailurePolicy`] uniformly.
//!
//! # Example
//!
//! ```rust
//! use setup_docker::component::{advisory, fatal, group, Op};
//! use setup_docker::process::HostCommand;
//!
//! let ops: Vec<Op> = vec![group(
//!     "install docker",
//!     vec![
//!         advisory("refresh apt index", HostCommand::new("apt-get").arg("update")),
//!         fatal("install engine", HostCommand::new("apt-get").args(["-y", "install", "docker-ce"])),
//!     ],
//! )];
//! assert_eq!(ops.len(), 1);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::process::HostCommand;

/// What a failed step does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the whole run; the step's error becomes the failure reason.
    Fatal,
    /// Log and continue; the failure is an expected condition on some hosts.
    Advisory,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Fatal => write!(f, "fatal"),
            FailurePolicy::Advisory => write!(f, "advisory"),
        }
    }
}

/// One command with a description and a failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub description: String,
    pub command: HostCommand,
    pub policy: FailurePolicy,
}

/// Provisioning operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Run a single command.
    Run(Step),

    /// Run `primary`; if it fails, run `fallback` exactly once.
    /// The step fails only when both do.
    Fallback {
        description: String,
        primary: HostCommand,
        fallback: HostCommand,
    },

    /// Export an environment variable to this process and later job steps.
    Export { name: String, value: String },

    /// Run nested operations inside a collapsible log group.
    Group(String, Vec<Op>),
}

impl Op {
    /// Commands this operation may run, in order, including fallbacks.
    pub fn commands(&self) -> Vec<&HostCommand> {
        match self {
            Op::Run(step) => vec![&step.command],
            Op::Fallback {
                primary, fallback, ..
            } => vec![primary, fallback],
            Op::Export { .. } => Vec::new(),
            Op::Group(_, ops) => ops.iter().flat_map(Op::commands).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper functions for readable step lists
// ─────────────────────────────────────────────────────────────────────────────

/// A step whose failure aborts the run.
pub fn fatal(description: impl Into<String>, command: HostCommand) -> Op {
    Op::Run(Step {
        description: description.into(),
        command,
        policy: FailurePolicy::Fatal,
    })
}

/// A step whose failure is logged and skipped.
pub fn advisory(description: impl Into<String>, command: HostCommand) -> Op {
    Op::Run(Step {
        description: description.into(),
        command,
        policy: FailurePolicy::Advisory,
    })
}

/// Install-then-fallback pair.
pub fn fallback(description: impl Into<String>, primary: HostCommand, fallback: HostCommand) -> Op {
    Op::Fallback {
        description: description.into(),
        primary,
        fallback,
    }
}

/// Export an environment variable.
pub fn export(name: impl Into<String>, value: impl Into<String>) -> Op {
    Op::Export {
        name: name.into(),
        value: value.into(),
    }
}

/// Wrap operations in a log group.
pub fn group(name: impl Into<String>, ops: Vec<Op>) -> Op {
    Op::Group(name.into(), ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_helpers() {
        let cmd = HostCommand::new("docker").arg("version");
        assert_eq!(
            advisory("check docker version", cmd.clone()),
            Op::Run(Step {
                description: "check docker version".into(),
                command: cmd.clone(),
                policy: FailurePolicy::Advisory,
            })
        );
        assert_eq!(
            export("DOCKER_CONFIG", "/root/.docker"),
            Op::Export {
                name: "DOCKER_CONFIG".into(),
                value: "/root/.docker".into()
            }
        );
    }

    #[test]
    fn test_commands_flattens_groups_and_fallbacks() {
        let op = group(
            "install docker",
            vec![
                export("A", "b"),
                fatal("first", HostCommand::new("one")),
                fallback("second", HostCommand::new("two"), HostCommand::new("three")),
            ],
        );
        let programs: Vec<&str> = op.commands().iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_policy_display_and_serde() {
        assert_eq!(FailurePolicy::Fatal.to_string(), "fatal");
        assert_eq!(
            serde_json::to_string(&FailurePolicy::Advisory).unwrap(),
            "\"advisory\""
        );
    }
}
