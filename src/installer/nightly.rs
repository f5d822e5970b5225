//! Nightly engine builds from moby-snapshot release archives.
//!
//! Packages are installed all-or-nothing: the whole deb set goes through
//! `apt-get install`, then `dpkg -i` as the single fallback, and every
//! package from the archive must afterwards be reported installed.

use anyhow::{bail, Result};

use crate::component::{advisory, fallback, fatal, group, Op};
use crate::context::ProvisioningContext;
use crate::executor::Executor;
use crate::platform::PlatformProfile;
use crate::process::HostCommand;

use super::{apt_update_op, remove_moby_op};

pub const RELEASE_HOST: &str = "https://github.com/AkihiroSuda/moby-snapshot/releases/download";
pub const ARCHIVE_NAME: &str = "moby-snapshot-ubuntu-focal-x86_64-deb.tbz";
pub const ARCHIVE_PATH: &str = "/tmp/moby-snapshot-ubuntu-focal-x86_64-deb.tbz";
pub const UNPACK_DIR: &str = "/tmp/moby-snapshot";

const INSTALLED_STATUS: &str = "install ok installed";

pub fn archive_url(tag: &str) -> String {
    format!("{RELEASE_HOST}/{tag}/{ARCHIVE_NAME}")
}

/// Download, clean and unpack the snapshot archive.
pub fn fetch_ops(profile: &PlatformProfile, tag: &str) -> Vec<Op> {
    vec![
        group(
            "download deb",
            vec![fatal(
                format!("download moby snapshot {tag}"),
                HostCommand::new("curl").args(["-fsSL", "-o", ARCHIVE_PATH, &archive_url(tag)]),
            )],
        ),
        advisory(
            "remove stale deb packages",
            profile.elevated("rm").args(["-rf", UNPACK_DIR]),
        ),
        fatal(
            "create unpack directory",
            HostCommand::new("mkdir").args(["-p", UNPACK_DIR]),
        ),
        group(
            "unpack tbz file",
            vec![fatal(
                "unpack moby snapshot",
                HostCommand::new("tar").args(["xjvf", ARCHIVE_PATH, "-C", UNPACK_DIR]),
            )],
        ),
    ]
}

/// Sorted `.deb` paths from `find` output.
pub fn parse_deb_list(output: &str) -> Vec<String> {
    let mut debs: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with(".deb"))
        .map(str::to_string)
        .collect();
    debs.sort();
    debs
}

/// apt-get first, dpkg once if apt-get refuses.
pub fn install_op(profile: &PlatformProfile, debs: &[String]) -> Op {
    group(
        "install docker",
        vec![fallback(
            "install docker",
            profile
                .elevated("apt-get")
                .args(["install", "-y"])
                .args(debs.iter().cloned()),
            profile.elevated("dpkg").arg("-i").args(debs.iter().cloned()),
        )],
    )
}

pub fn install(
    ctx: &ProvisioningContext,
    profile: &PlatformProfile,
    exec: &mut Executor<'_>,
) -> Result<()> {
    exec.execute_all(&fetch_ops(profile, &ctx.nightly_tag))?;

    let listing = exec
        .execute(&fatal(
            "list unpacked packages",
            HostCommand::new("find")
                .args([UNPACK_DIR, "-type", "f", "-name", "*.deb"])
                .capture(),
        ))?
        .into_output();
    let debs = parse_deb_list(&listing);
    if debs.is_empty() {
        bail!(
            "no .deb packages found in {} after unpacking {}",
            UNPACK_DIR,
            archive_url(&ctx.nightly_tag)
        );
    }

    let mut packages = Vec::with_capacity(debs.len());
    for deb in &debs {
        let name = exec
            .execute(&fatal(
                format!("read package name of {deb}"),
                HostCommand::new("dpkg-deb")
                    .args(["--field", deb.as_str(), "Package"])
                    .capture(),
            ))?
            .into_output();
        packages.push(name);
    }

    exec.execute(&remove_moby_op(profile))?;
    exec.execute(&apt_update_op(profile))?;
    exec.execute(&install_op(profile, &debs))?;

    verify_installed(exec, &packages)
}

/// Every package from the archive must be installed, or the run fails.
fn verify_installed(exec: &mut Executor<'_>, packages: &[String]) -> Result<()> {
    let mut missing = Vec::new();
    for package in packages {
        let status = exec
            .execute(&advisory(
                format!("check {package} is installed"),
                HostCommand::new("dpkg-query")
                    .args(["-W", "--showformat=${Status}", package.as_str()])
                    .capture(),
            ))?
            .into_output();
        if status.trim() != INSTALLED_STATUS {
            missing.push(package.as_str());
        }
    }

    if !missing.is_empty() {
        bail!(
            "nightly packages not installed after install attempt: {}",
            missing.join(", ")
        );
    }
    tracing::info!(count = packages.len(), "nightly packages installed");
    Ok(())
}
