//! Preflight checks for provisioning.
//!
//! Validates that the host has the tools a workflow variant shells out to
//! before any package state is touched, so a missing tool fails the run
//! up front instead of half way through.
//!
//! # Example
//!
//! ```rust
//! use setup_docker::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("apt-get") {
//!     println!("not a Debian-family host");
//! }
//!
//! let tools = &[("curl", "curl"), ("gpg", "gnupg")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

use crate::platform::{PlatformProfile, Variant};

/// Check if a command exists on the host system.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Tools for the apt repository install.
///
/// Each tuple is (command_name, package_name).
pub const STANDARD_TOOLS: &[(&str, &str)] = &[
    ("curl", "curl"),
    ("gpg", "gnupg"),
    ("lsb_release", "lsb-release"),
    ("apt-get", "apt"),
    ("apt-cache", "apt"),
    ("tee", "coreutils"),
    ("systemctl", "systemd"),
];

/// Tools for the moby-snapshot install.
pub const NIGHTLY_TOOLS: &[(&str, &str)] = &[
    ("curl", "curl"),
    ("tar", "tar"),
    ("bzip2", "bzip2"),
    ("find", "findutils"),
    ("apt-get", "apt"),
    ("dpkg", "dpkg"),
    ("dpkg-deb", "dpkg"),
    ("dpkg-query", "dpkg"),
    ("systemctl", "systemd"),
];

pub const MACOS_TOOLS: &[(&str, &str)] = &[("brew", "homebrew")];

const SUDO: (&str, &str) = ("sudo", "sudo");

/// Check that specific tools are available.
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let mut missing = Vec::new();

    for (tool, package) in tools {
        if !command_exists(tool) {
            missing.push((*tool, *package));
        }
    }

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Tools `variant` needs on this host, `sudo` included when not root.
pub fn required_tools(variant: Variant, profile: &PlatformProfile) -> Vec<(&'static str, &'static str)> {
    let base = match variant {
        Variant::LinuxStandard => STANDARD_TOOLS,
        Variant::LinuxNightly => NIGHTLY_TOOLS,
        Variant::MacOs => MACOS_TOOLS,
    };
    let mut tools = base.to_vec();
    if !profile.privileged {
        tools.push(SUDO);
    }
    tools
}

/// Check the tools for `variant`.
pub fn check_variant_tools(variant: Variant, profile: &PlatformProfile) -> Result<()> {
    check_required_tools(&required_tools(variant, profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{test_profile, Architecture, OperatingSystem};

    #[test]
    fn test_command_exists() {
        // 'ls' should exist on any Unix system
        assert!(command_exists("ls"));
        // Random garbage should not exist
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("ls", "coreutils"), ("cat", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_failure() {
        let tools = &[("nonexistent_command_xyz", "fake-package")];
        let err = check_required_tools(tools).unwrap_err();
        assert!(err.to_string().contains("fake-package"));
    }

    #[test]
    fn test_sudo_required_only_without_root() {
        let mut profile = test_profile(OperatingSystem::Linux, Architecture::X86_64);
        assert!(required_tools(Variant::LinuxStandard, &profile).contains(&SUDO));

        profile.privileged = true;
        assert!(!required_tools(Variant::LinuxStandard, &profile).contains(&SUDO));
        assert_eq!(required_tools(Variant::MacOs, &profile), MACOS_TOOLS.to_vec());
    }
}
