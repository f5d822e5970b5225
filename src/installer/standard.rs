//! docker-ce from the upstream apt repository.

use anyhow::{bail, Result};

use crate::component::{advisory, fatal, group, Op};
use crate::context::ProvisioningContext;
use crate::executor::Executor;
use crate::platform::PlatformProfile;
use crate::process::HostCommand;
use crate::resolver::{self, ResolvedVersion, ENGINE_PACKAGE};

use super::{apt_update_op, remove_moby_op};

pub const KEY_URL: &str = "https://download.docker.com/linux/ubuntu/gpg";
pub const KEY_DOWNLOAD_PATH: &str = "/tmp/docker-archive-keyring.asc";
pub const KEYRING_PATH: &str = "/usr/share/keyrings/docker-archive-keyring.gpg";
pub const REPOSITORY_URL: &str = "https://download.docker.com/linux/ubuntu";
pub const SOURCE_LIST_PATH: &str = "/etc/apt/sources.list.d/docker.list";
pub const CLI_PACKAGE: &str = "docker-ce-cli";
pub const COMPOSE_PLUGIN_PACKAGE: &str = "docker-compose-plugin";

/// Download the repository signing key and dearmor it into the keyring.
pub fn signing_key_ops(profile: &PlatformProfile) -> Vec<Op> {
    vec![group(
        "add apt-key",
        vec![
            fatal(
                "download docker signing key",
                HostCommand::new("curl").args(["-fsSL", "-o", KEY_DOWNLOAD_PATH, KEY_URL]),
            ),
            fatal(
                "install docker signing key",
                profile.elevated("gpg").args([
                    "--batch",
                    "--yes",
                    "--dearmor",
                    "-o",
                    KEYRING_PATH,
                    KEY_DOWNLOAD_PATH,
                ]),
            ),
        ],
    )]
}

/// apt source line for `codename` and `channel`.
pub fn source_list_line(codename: &str, channel: &str) -> String {
    format!("deb [arch=amd64,arm64 signed-by={KEYRING_PATH}] {REPOSITORY_URL} {codename} {channel}\n")
}

pub fn source_list_ops(profile: &PlatformProfile, codename: &str, channel: &str) -> Vec<Op> {
    vec![group(
        "add apt source",
        vec![fatal(
            "write docker apt source",
            profile
                .elevated("tee")
                .arg(SOURCE_LIST_PATH)
                .stdin(source_list_line(codename, channel))
                .capture(),
        )],
    )]
}

/// Conflict removal and package installation for a resolved version.
pub fn install_ops(profile: &PlatformProfile, version: &ResolvedVersion) -> Vec<Op> {
    vec![
        remove_moby_op(profile),
        group(
            "install docker",
            vec![
                fatal(
                    "install docker engine",
                    profile.elevated("apt-get").args([
                        "-y".to_string(),
                        "install".to_string(),
                        version.package(ENGINE_PACKAGE),
                        version.package(CLI_PACKAGE),
                    ]),
                ),
                advisory(
                    "install docker compose plugin",
                    profile
                        .elevated("apt-get")
                        .args(["-y", "install", COMPOSE_PLUGIN_PACKAGE]),
                ),
            ],
        ),
    ]
}

pub fn install(
    ctx: &ProvisioningContext,
    profile: &PlatformProfile,
    exec: &mut Executor<'_>,
) -> Result<()> {
    exec.execute_all(&signing_key_ops(profile))?;

    let codename = exec
        .execute(&fatal(
            "read release codename",
            HostCommand::new("lsb_release").arg("-cs").capture(),
        ))?
        .into_output();
    if codename.is_empty() {
        bail!("lsb_release returned an empty release codename");
    }

    exec.execute_all(&source_list_ops(profile, &codename, &ctx.channel))?;
    exec.execute(&apt_update_op(profile))?;

    let version = resolver::resolve(exec, &ctx.version)?;
    exec.execute_all(&install_ops(profile, &version))
}
