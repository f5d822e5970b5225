//! Package installation, one module per workflow variant.
//!
//! - [`standard`] - apt repository from download.docker.com
//! - [`nightly`] - moby-snapshot deb archive
//! - [`macos`] - Homebrew docker CLI plus a colima VM

pub mod macos;
pub mod nightly;
pub mod standard;

use anyhow::Result;

use crate::component::{advisory, group, Op};
use crate::context::ProvisioningContext;
use crate::executor::Executor;
use crate::platform::{PlatformProfile, Variant};

/// Packages shipped by the runner image that conflict with docker-ce.
pub const MOBY_PACKAGES: &[&str] = &[
    "moby-buildx",
    "moby-cli",
    "moby-compose",
    "moby-containerd",
    "moby-engine",
    "moby-runc",
];

/// Remove preinstalled moby packages; absent packages are fine.
pub fn remove_moby_op(profile: &PlatformProfile) -> Op {
    group(
        "remove default moby",
        vec![advisory(
            "remove moby packages",
            profile
                .elevated("apt-get")
                .args(["remove", "-y"])
                .args(MOBY_PACKAGES.iter().copied()),
        )],
    )
}

/// Refresh the apt index; a stale mirror should not stop the run.
pub fn apt_update_op(profile: &PlatformProfile) -> Op {
    group(
        "update apt cache",
        vec![advisory(
            "update apt cache",
            profile.elevated("apt-get").arg("update"),
        )],
    )
}

/// Run the installer for `variant`.
pub fn install(
    variant: Variant,
    ctx: &ProvisioningContext,
    profile: &PlatformProfile,
    exec: &mut Executor<'_>,
) -> Result<()> {
    tracing::info!(%variant, channel = %ctx.channel, "installing docker");
    match variant {
        Variant::LinuxStandard => standard::install(ctx, profile, exec),
        Variant::LinuxNightly => nightly::install(ctx, profile, exec),
        Variant::MacOs => macos::install(ctx, profile, exec),
    }
}
