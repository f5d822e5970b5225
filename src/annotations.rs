//! CI log annotations.
//!
//! Emits GitHub Actions workflow commands (`::group::`, `::warning::`, ...)
//! and exports environment variables for later job steps through the file
//! named by `GITHUB_ENV`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Sink for the user-facing side of a provisioning run.
pub trait Reporter {
    fn start_group(&self, name: &str);
    fn end_group(&self);
    /// Echo a command line before it runs.
    fn command(&self, line: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    /// Make `name=value` visible to this process and to later job steps.
    fn export_variable(&self, name: &str, value: &str) -> Result<()>;
}

/// Writes workflow commands to stdout.
#[derive(Debug, Clone, Default)]
pub struct ActionsReporter {
    env_file: Option<PathBuf>,
}

impl ActionsReporter {
    pub fn new(env_file: Option<PathBuf>) -> Self {
        Self { env_file }
    }

    /// Pick up `GITHUB_ENV` from the environment, if the runner set it.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_ENV")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }
}

impl Reporter for ActionsReporter {
    fn start_group(&self, name: &str) {
        println!("::group::{}", escape_data(name));
    }

    fn end_group(&self) {
        println!("::endgroup::");
    }

    fn command(&self, line: &str) {
        println!("[command]{line}");
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }

    fn debug(&self, message: &str) {
        println!("::debug::{}", escape_data(message));
    }

    fn warning(&self, message: &str) {
        println!("::warning::{}", escape_data(message));
    }

    fn error(&self, message: &str) {
        println!("::error::{}", escape_data(message));
    }

    fn export_variable(&self, name: &str, value: &str) -> Result<()> {
        std::env::set_var(name, value);
        let Some(path) = &self.env_file else {
            tracing::debug!(name, "GITHUB_ENV not set; exported to current process only");
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening GITHUB_ENV file '{}'", path.display()))?;
        file.write_all(env_file_entry(name, value).as_bytes())
            .with_context(|| format!("exporting {name} to '{}'", path.display()))?;
        Ok(())
    }
}

/// Escape message text for a workflow command.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Render one `GITHUB_ENV` entry; multi-line values use the heredoc form.
pub fn env_file_entry(name: &str, value: &str) -> String {
    if value.contains('\n') {
        let delimiter = format!("ghadelimiter_{}", std::process::id());
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}
