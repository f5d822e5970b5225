//! Daemon configuration.
//!
//! Overwrites `daemon.json` with the literal document from the inputs,
//! printing the file before and after. On Linux the daemon is restarted,
//! must come back active and must then answer `docker info`, which fails
//! when the daemon rejected the new configuration.

use std::path::Path;

use anyhow::Result;

use crate::component::{advisory, fatal, group, Op};
use crate::executor::Executor;
use crate::platform::{path_arg, PlatformProfile};
use crate::process::HostCommand;

pub const DOCKER_SERVICE: &str = "docker";

/// Whether to bounce the daemon after writing the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restart {
    /// systemd-managed daemon (Linux).
    Systemd,
    /// Nothing to restart yet (macOS writes before the VM starts).
    Skip,
}

/// Steps that write `json` to `path`.
pub fn daemon_config_ops(
    profile: &PlatformProfile,
    path: &Path,
    json: &str,
    restart: Restart,
) -> Vec<Op> {
    let target = path_arg(path);
    let mut ops = vec![
        // The file does not exist on a fresh host.
        group(
            "show default daemon json content",
            vec![advisory(
                "read existing daemon.json",
                profile.elevated("cat").arg(&target),
            )],
        ),
        fatal(
            format!("write {target}"),
            profile.elevated("tee").arg(&target).stdin(json),
        ),
        group(
            "show daemon json content",
            vec![fatal(
                "read written daemon.json",
                profile.elevated("cat").arg(&target),
            )],
        ),
    ];

    if restart == Restart::Systemd {
        ops.push(fatal(
            "restart docker",
            profile
                .elevated("systemctl")
                .args(["restart", DOCKER_SERVICE]),
        ));
        ops.push(fatal(
            "wait for docker to become active",
            profile
                .elevated("systemctl")
                .args(["is-active", DOCKER_SERVICE]),
        ));
        ops.push(fatal(
            "check docker serves the new configuration",
            HostCommand::new("docker").arg("info"),
        ));
    }

    ops
}

/// Apply `json` as the daemon configuration.
pub fn apply(
    exec: &mut Executor<'_>,
    profile: &PlatformProfile,
    path: &Path,
    json: &str,
    restart: Restart,
) -> Result<()> {
    tracing::debug!(path = %path.display(), "writing daemon configuration");
    exec.execute_all(&daemon_config_ops(profile, path, json, restart))
}
