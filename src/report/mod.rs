//! JSON run reports.
//!
//! A report captures the step journal of one provisioning run so a later
//! job step (or a human) can see which advisory steps were skipped.

mod run_id;

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::executor::StepRecord;

pub use run_id::run_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Skipped,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub variant: Option<String>,
    pub created_at_utc: String,
    pub finished_at_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    /// Start a report for a run beginning now.
    pub fn begin() -> Result<Self> {
        let started = OffsetDateTime::now_utc();
        Ok(Self {
            run_id: run_id(started),
            status: RunStatus::Failed,
            variant: None,
            created_at_utc: format_utc(started)?,
            finished_at_utc: None,
            error: None,
            steps: Vec::new(),
        })
    }

    pub fn finish(&mut self, status: RunStatus, steps: Vec<StepRecord>) -> Result<()> {
        self.status = status;
        self.steps = steps;
        self.finished_at_utc = Some(now_utc()?);
        Ok(())
    }
}

pub fn now_utc() -> Result<String> {
    format_utc(OffsetDateTime::now_utc())
}

fn format_utc(at: OffsetDateTime) -> Result<String> {
    at.format(&Rfc3339).context("formatting UTC timestamp")
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    write_json_atomic(path, report)
        .with_context(|| format!("writing run report '{}'", path.display()))
}

pub fn load_report(path: &Path) -> Result<RunReport> {
    let bytes =
        fs::read(path).with_context(|| format!("reading run report '{}'", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing run report '{}'", path.display()))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("path without parent '{}'", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory '{}'", parent.display()))?;
    }
    let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
    let payload = serde_json::to_vec_pretty(value).with_context(|| "serializing run report")?;
    fs::write(&tmp, payload).with_context(|| format!("writing temp file '{}'", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        format!(
            "renaming temp file '{}' to '{}'",
            tmp.display(),
            path.display()
        )
    })?;
    Ok(())
}
