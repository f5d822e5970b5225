//! Host detection and workflow selection.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::context::ProvisioningContext;
use crate::process::HostCommand;

pub const LINUX_DAEMON_CONFIG: &str = "/etc/docker/daemon.json";
pub const DOCKER_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatingSystem {
    Linux,
    MacOs,
    Other(String),
}

impl OperatingSystem {
    /// Map a `std::env::consts::OS` value.
    pub fn from_consts(os: &str) -> Self {
        match os {
            "linux" => OperatingSystem::Linux,
            "macos" => OperatingSystem::MacOs,
            other => OperatingSystem::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingSystem::Linux => write!(f, "linux"),
            OperatingSystem::MacOs => write!(f, "macos"),
            OperatingSystem::Other(os) => write!(f, "{os}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
    Other(String),
}

impl Architecture {
    /// Map a `std::env::consts::ARCH` value.
    pub fn from_consts(arch: &str) -> Self {
        match arch {
            "x86_64" => Architecture::X86_64,
            other => Architecture::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Other(arch) => write!(f, "{arch}"),
        }
    }
}

/// The host as far as provisioning is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub os: OperatingSystem,
    pub arch: Architecture,
    pub home: PathBuf,
    /// Running as root; privileged commands skip `sudo`.
    pub privileged: bool,
}

impl PlatformProfile {
    pub fn detect() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(Self {
            os: OperatingSystem::from_consts(std::env::consts::OS),
            arch: Architecture::from_consts(std::env::consts::ARCH),
            home,
            privileged: running_as_root(),
        })
    }

    /// Value exported as `DOCKER_CONFIG`.
    pub fn docker_config_dir(&self) -> PathBuf {
        self.home.join(".docker")
    }

    pub fn daemon_config_path(&self) -> PathBuf {
        match self.os {
            OperatingSystem::MacOs => self.docker_config_dir().join("daemon.json"),
            _ => PathBuf::from(LINUX_DAEMON_CONFIG),
        }
    }

    /// Docker socket exposed by the colima VM.
    pub fn colima_socket(&self) -> PathBuf {
        self.home.join(".colima/default/docker.sock")
    }

    /// A command that needs root, prefixed with `sudo` unless already root.
    pub fn elevated(&self, program: &str) -> HostCommand {
        if self.privileged {
            HostCommand::new(program)
        } else {
            HostCommand::new("sudo").arg(program)
        }
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Workflow variants that install something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    MacOs,
    LinuxNightly,
    LinuxStandard,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::MacOs => write!(f, "macos"),
            Variant::LinuxNightly => write!(f, "linux-nightly"),
            Variant::LinuxStandard => write!(f, "linux-standard"),
        }
    }
}

/// Decision taken once at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Neither Linux nor macOS.
    Unsupported { os: String },
    /// Supported OS, unsupported architecture for the chosen path.
    Skip { warning: String },
    Run(Variant),
}

pub fn select(profile: &PlatformProfile, ctx: &ProvisioningContext) -> Selection {
    match &profile.os {
        OperatingSystem::Other(os) => Selection::Unsupported { os: os.clone() },
        OperatingSystem::MacOs => {
            if profile.arch != Architecture::X86_64 {
                return Selection::Skip {
                    warning: format!("only support macOS x86_64, os arch is {}", profile.arch),
                };
            }
            Selection::Run(Variant::MacOs)
        }
        OperatingSystem::Linux if ctx.is_nightly() => {
            if profile.arch != Architecture::X86_64 {
                return Selection::Skip {
                    warning: format!(
                        "nightly version only support x86_64, os arch is {}",
                        profile.arch
                    ),
                };
            }
            Selection::Run(Variant::LinuxNightly)
        }
        OperatingSystem::Linux => Selection::Run(Variant::LinuxStandard),
    }
}

/// Render a path argument for a host command.
pub(crate) fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
pub(crate) fn test_profile(os: OperatingSystem, arch: Architecture) -> PlatformProfile {
    PlatformProfile {
        os,
        arch,
        home: PathBuf::from("/home/runner"),
        privileged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Inputs;

    fn ctx(channel: &str) -> ProvisioningContext {
        ProvisioningContext::from_inputs(&Inputs {
            channel: channel.into(),
            ..Inputs::default()
        })
        .unwrap()
    }

    #[test]
    fn test_select_unsupported_os() {
        let profile = test_profile(OperatingSystem::from_consts("windows"), Architecture::X86_64);
        assert_eq!(
            select(&profile, &ctx("stable")),
            Selection::Unsupported {
                os: "windows".into()
            }
        );
    }

    #[test]
    fn test_select_macos_requires_x86_64() {
        let profile = test_profile(OperatingSystem::MacOs, Architecture::X86_64);
        assert_eq!(select(&profile, &ctx("stable")), Selection::Run(Variant::MacOs));

        let profile = test_profile(OperatingSystem::MacOs, Architecture::from_consts("aarch64"));
        match select(&profile, &ctx("stable")) {
            Selection::Skip { warning } => assert!(warning.contains("aarch64")),
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn test_select_linux_by_channel() {
        let profile = test_profile(OperatingSystem::Linux, Architecture::X86_64);
        assert_eq!(
            select(&profile, &ctx("stable")),
            Selection::Run(Variant::LinuxStandard)
        );
        assert_eq!(
            select(&profile, &ctx("test")),
            Selection::Run(Variant::LinuxStandard)
        );
        assert_eq!(
            select(&profile, &ctx("nightly")),
            Selection::Run(Variant::LinuxNightly)
        );
    }

    #[test]
    fn test_select_nightly_requires_x86_64_but_standard_does_not() {
        let profile = test_profile(OperatingSystem::Linux, Architecture::from_consts("aarch64"));
        assert!(matches!(
            select(&profile, &ctx("nightly")),
            Selection::Skip { .. }
        ));
        assert_eq!(
            select(&profile, &ctx("stable")),
            Selection::Run(Variant::LinuxStandard)
        );
    }

    #[test]
    fn test_paths_per_os() {
        let linux = test_profile(OperatingSystem::Linux, Architecture::X86_64);
        assert_eq!(linux.daemon_config_path(), PathBuf::from("/etc/docker/daemon.json"));
        assert_eq!(linux.docker_config_dir(), PathBuf::from("/home/runner/.docker"));

        let mac = PlatformProfile {
            home: PathBuf::from("/Users/runner"),
            ..test_profile(OperatingSystem::MacOs, Architecture::X86_64)
        };
        assert_eq!(
            mac.daemon_config_path(),
            PathBuf::from("/Users/runner/.docker/daemon.json")
        );
        assert_eq!(
            mac.colima_socket(),
            PathBuf::from("/Users/runner/.colima/default/docker.sock")
        );
    }

    #[test]
    fn test_elevated_skips_sudo_for_root() {
        let mut profile = test_profile(OperatingSystem::Linux, Architecture::X86_64);
        assert_eq!(profile.elevated("tee").argv(), vec!["sudo", "tee"]);
        profile.privileged = true;
        assert_eq!(profile.elevated("tee").argv(), vec!["tee"]);
    }
}
