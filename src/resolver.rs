//! Docker version resolution against the apt index.
//!
//! First match wins: lines are taken in index order and the first one
//! containing the requested fragment provides the version. There is no
//! semantic-version comparison.

use anyhow::Result;

use crate::component::{advisory, fatal};
use crate::executor::Executor;
use crate::process::HostCommand;

pub const ENGINE_PACKAGE: &str = "docker-ce";
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Package version to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedVersion {
    Pinned(String),
    /// Nothing matched; install whatever the repository considers current.
    Latest,
}

impl ResolvedVersion {
    /// apt package reference, `name=version` when pinned.
    pub fn package(&self, name: &str) -> String {
        match self {
            ResolvedVersion::Pinned(version) => format!("{name}={version}"),
            ResolvedVersion::Latest => name.to_string(),
        }
    }
}

/// Pick the version token of the first index line containing `fragment`.
///
/// Understands `apt-cache madison` rows (`pkg | version | source`) and bare
/// version lines.
pub fn select_version(index: &str, fragment: &str) -> Option<String> {
    index
        .lines()
        .filter(|line| !line.trim().is_empty())
        .find(|line| line.contains(fragment))
        .and_then(version_token)
}

fn version_token(line: &str) -> Option<String> {
    let token = if line.contains('|') {
        line.split('|').nth(1)?
    } else {
        line.split_whitespace().next()?
    };
    let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    (!token.is_empty()).then_some(token)
}

/// `VERSION_ID` from os-release content, unquoted.
pub fn parse_version_id(os_release: &str) -> Option<String> {
    os_release.lines().find_map(|line| {
        let value = line.trim().strip_prefix("VERSION_ID=")?;
        Some(value.trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}

/// Query the index and resolve `fragment`, warning when it falls back to latest.
pub fn resolve(exec: &mut Executor<'_>, fragment: &str) -> Result<ResolvedVersion> {
    let index = exec
        .execute(&fatal(
            "show available docker version",
            HostCommand::new("apt-cache")
                .args(["madison", ENGINE_PACKAGE])
                .capture(),
        ))?
        .into_output();

    if let Some(version) = select_version(&index, fragment) {
        tracing::info!(fragment, %version, "resolved docker version");
        return Ok(ResolvedVersion::Pinned(version));
    }

    let os_release = exec
        .execute(&advisory(
            "read os release",
            HostCommand::new("cat").arg(OS_RELEASE_PATH).capture(),
        ))?
        .into_output();
    let os = parse_version_id(&os_release).unwrap_or_else(|| "unknown".to_string());
    exec.reporter().warning(&format!(
        "Docker {fragment} not available on ubuntu {os}, will install latest docker version"
    ));
    Ok(ResolvedVersion::Latest)
}
