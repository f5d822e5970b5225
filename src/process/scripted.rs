//! Scripted command runner for tests.
//!
//! Records every command and answers from a rule list. A rule matches when
//! its pattern appears as a contiguous run inside the command's argv, so
//! `["apt-get", "install"]` also matches `sudo apt-get install ...`.
//! Unmatched commands succeed with empty output.

use std::cell::RefCell;

use super::{CommandError, CommandRunner, HostCommand};

enum Reply {
    Output(String),
    Fail(String),
}

struct Rule {
    pattern: Vec<String>,
    reply: Reply,
}

#[derive(Default)]
pub(crate) struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<HostCommand>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, pattern: &[&str], stdout: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            reply: Reply::Output(stdout.to_string()),
        });
        self
    }

    pub(crate) fn fail(mut self, pattern: &[&str], stderr: &str) -> Self {
        self.rules.push(Rule {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            reply: Reply::Fail(stderr.to_string()),
        });
        self
    }

    pub(crate) fn calls(&self) -> Vec<HostCommand> {
        self.calls.borrow().clone()
    }

    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }

    /// Number of recorded commands whose argv contains `pattern`.
    pub(crate) fn count(&self, pattern: &[&str]) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches(&c.argv(), pattern))
            .count()
    }

    /// Index of the first recorded command containing `pattern`.
    pub(crate) fn position(&self, pattern: &[&str]) -> Option<usize> {
        self.calls
            .borrow()
            .iter()
            .position(|c| matches(&c.argv(), pattern))
    }
}

fn matches(argv: &[&str], pattern: &[impl AsRef<str>]) -> bool {
    if pattern.is_empty() {
        return true;
    }
    argv.windows(pattern.len())
        .any(|window| window.iter().zip(pattern).all(|(a, p)| *a == p.as_ref()))
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &HostCommand) -> Result<String, CommandError> {
        self.calls.borrow_mut().push(command.clone());
        let argv = command.argv();
        let Some(rule) = self.rules.iter().find(|r| matches(&argv, &r.pattern)) else {
            return Ok(String::new());
        };
        match &rule.reply {
            Reply::Output(stdout) => Ok(stdout.trim().to_string()),
            Reply::Fail(stderr) => Err(CommandError::Stderr {
                command: command.to_string(),
                stderr: stderr.clone(),
            }),
        }
    }
}
