//! Provisioning orchestration.
//!
//! Selects the workflow variant once, runs its installer, configures the
//! daemon, bootstraps buildx and verifies the engine with `docker info`.
//! The first fatal step aborts the run; nothing already applied is undone.

use anyhow::Result;

use crate::buildx;
use crate::component::{advisory, export, fatal, group, Op};
use crate::context::ProvisioningContext;
use crate::daemon::{self, Restart, DOCKER_SERVICE};
use crate::executor::Executor;
use crate::installer;
use crate::platform::{path_arg, select, PlatformProfile, Selection, Variant};
use crate::preflight;
use crate::process::HostCommand;

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Provisioned(Variant),
    /// Architecture not supported for this path; nothing was done.
    Skipped { warning: String },
    /// Not Linux or macOS; nothing was done.
    Unsupported { os: String },
}

pub struct Provisioner<'a> {
    ctx: &'a ProvisioningContext,
    profile: &'a PlatformProfile,
    preflight: bool,
}

impl<'a> Provisioner<'a> {
    pub fn new(ctx: &'a ProvisioningContext, profile: &'a PlatformProfile) -> Self {
        Self {
            ctx,
            profile,
            preflight: false,
        }
    }

    /// Check required host tools before installing.
    pub fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    pub fn run(&self, exec: &mut Executor<'_>) -> Result<Outcome> {
        match select(self.profile, self.ctx) {
            Selection::Unsupported { os } => {
                exec.reporter().error(&format!(
                    "Only Support Linux and macOS platform, this platform is {os}"
                ));
                Ok(Outcome::Unsupported { os })
            }
            Selection::Skip { warning } => {
                exec.reporter().warning(&warning);
                Ok(Outcome::Skipped { warning })
            }
            Selection::Run(variant) => {
                tracing::info!(%variant, os = %self.profile.os, arch = %self.profile.arch, "selected workflow");
                if self.preflight {
                    preflight::check_variant_tools(variant, self.profile)?;
                }
                match variant {
                    Variant::MacOs => self.run_macos(exec)?,
                    Variant::LinuxNightly | Variant::LinuxStandard => {
                        self.run_linux(variant, exec)?
                    }
                }
                Ok(Outcome::Provisioned(variant))
            }
        }
    }

    fn run_macos(&self, exec: &mut Executor<'_>) -> Result<()> {
        exec.execute(&self.export_docker_config())?;
        installer::install(Variant::MacOs, self.ctx, self.profile, exec)?;
        self.finish(exec)
    }

    fn run_linux(&self, variant: Variant, exec: &mut Executor<'_>) -> Result<()> {
        exec.execute_all(&linux_probe_ops(self.profile))?;
        exec.execute(&self.export_docker_config())?;
        installer::install(variant, self.ctx, self.profile, exec)?;
        exec.execute_all(&linux_verify_ops(self.profile))?;
        daemon::apply(
            exec,
            self.profile,
            &self.profile.daemon_config_path(),
            &self.ctx.daemon_json,
            Restart::Systemd,
        )?;
        self.finish(exec)
    }

    fn export_docker_config(&self) -> Op {
        export("DOCKER_CONFIG", path_arg(&self.profile.docker_config_dir()))
    }

    /// buildx, then the final `docker info`.
    fn finish(&self, exec: &mut Executor<'_>) -> Result<()> {
        let buildx = buildx::bootstrap(self.ctx, exec)?;
        tracing::debug!(?buildx, "buildx stage finished");

        exec.execute(&group(
            "docker info",
            vec![fatal("docker info", HostCommand::new("docker").arg("info"))],
        ))?;
        Ok(())
    }
}

/// State of any preinstalled engine; failures are expected on clean hosts.
pub fn linux_probe_ops(profile: &PlatformProfile) -> Vec<Op> {
    vec![
        group(
            "check docker systemd status",
            vec![advisory(
                "check docker systemd status",
                profile
                    .elevated("systemctl")
                    .args(["status", DOCKER_SERVICE]),
            )],
        ),
        group(
            "check docker version",
            vec![advisory(
                "check docker version",
                HostCommand::new("docker").arg("version"),
            )],
        ),
    ]
}

/// The freshly installed engine must answer and its unit must be up.
pub fn linux_verify_ops(profile: &PlatformProfile) -> Vec<Op> {
    vec![
        group(
            "check docker version",
            vec![fatal(
                "check docker version",
                HostCommand::new("docker").arg("version"),
            )],
        ),
        group(
            "check docker systemd status",
            vec![fatal(
                "check docker systemd status",
                profile
                    .elevated("systemctl")
                    .args(["status", DOCKER_SERVICE]),
            )],
        ),
    ]
}
