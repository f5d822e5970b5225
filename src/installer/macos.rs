//! macOS: Homebrew docker CLI with the daemon hosted in a colima VM.
//!
//! macOS has no native container host, so after colima starts the
//! canonical socket path is relinked to the VM's socket.

use anyhow::Result;

use crate::component::{advisory, fatal, group, Op};
use crate::context::ProvisioningContext;
use crate::daemon::{self, Restart};
use crate::executor::Executor;
use crate::platform::{path_arg, PlatformProfile, DOCKER_SOCKET};
use crate::process::HostCommand;

/// Probe whatever docker the image already ships.
pub fn probe_ops() -> Vec<Op> {
    vec![
        advisory(
            "check docker version",
            HostCommand::new("docker").arg("--version"),
        ),
        advisory(
            "check docker-compose version",
            HostCommand::new("docker-compose").arg("--version"),
        ),
    ]
}

pub fn brew_ops(profile: &PlatformProfile) -> Vec<Op> {
    vec![
        group(
            "install docker",
            vec![
                fatal(
                    "reinstall docker",
                    HostCommand::new("brew").args(["reinstall", "docker"]),
                ),
                fatal(
                    "link docker",
                    HostCommand::new("brew").args(["link", "--overwrite", "docker"]),
                ),
            ],
        ),
        fatal(
            "create docker config directory",
            HostCommand::new("mkdir")
                .arg("-p")
                .arg(path_arg(&profile.docker_config_dir())),
        ),
    ]
}

/// Start colima and point the canonical socket at it.
pub fn vm_ops(profile: &PlatformProfile) -> Vec<Op> {
    vec![group(
        "wait docker running",
        vec![
            // Already present on most runner images.
            advisory(
                "install colima",
                HostCommand::new("brew").args(["install", "colima"]),
            ),
            fatal("start colima", HostCommand::new("colima").arg("start")),
            fatal(
                "remove stale docker socket",
                profile.elevated("rm").args(["-f", DOCKER_SOCKET]),
            ),
            advisory("list /var/run", HostCommand::new("ls").arg("/var/run/")),
            fatal(
                "link colima docker socket",
                profile
                    .elevated("ln")
                    .arg("-sf")
                    .arg(path_arg(&profile.colima_socket()))
                    .arg(DOCKER_SOCKET),
            ),
        ],
    )]
}

pub fn install(
    ctx: &ProvisioningContext,
    profile: &PlatformProfile,
    exec: &mut Executor<'_>,
) -> Result<()> {
    exec.execute_all(&probe_ops())?;
    exec.execute_all(&brew_ops(profile))?;
    daemon::apply(
        exec,
        profile,
        &profile.daemon_config_path(),
        &ctx.daemon_json,
        Restart::Skip,
    )?;
    exec.execute_all(&vm_ops(profile))
}
