//! Action inputs.
//!
//! Every input can be given as a flag or through the variable the Actions
//! runner sets for `with:` entries (`INPUT_<NAME>`).

use clap::Args;

pub const DEFAULT_VERSION: &str = "20.10";
pub const DEFAULT_CHANNEL: &str = "stable";
pub const DEFAULT_CLI_EXPERIMENTAL: &str = "enabled";
pub const DEFAULT_DAEMON_JSON: &str = "{}";
pub const DEFAULT_BUILDX: &str = "true";
pub const DEFAULT_NIGHTLY_VERSION: &str = "snapshot-20210202";

/// Raw input strings, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct Inputs {
    /// Version fragment to pin, matched against `apt-cache madison` lines.
    #[arg(long = "docker-version", env = "INPUT_DOCKER_VERSION", default_value = DEFAULT_VERSION)]
    pub version: String,

    /// Release channel: `stable`, `test` or `nightly`.
    #[arg(long = "docker-channel", env = "INPUT_DOCKER_CHANNEL", default_value = DEFAULT_CHANNEL)]
    pub channel: String,

    /// `enabled` exports DOCKER_CLI_EXPERIMENTAL=enabled.
    #[arg(
        long = "docker-cli-experimental",
        env = "INPUT_DOCKER_CLI_EXPERIMENTAL",
        default_value = DEFAULT_CLI_EXPERIMENTAL
    )]
    pub cli_experimental: String,

    /// Literal daemon.json content.
    #[arg(
        long = "docker-daemon-json",
        env = "INPUT_DOCKER_DAEMON_JSON",
        default_value = DEFAULT_DAEMON_JSON
    )]
    pub daemon_json: String,

    /// `true` sets up buildx with a `mybuilder` instance.
    #[arg(long = "docker-buildx", env = "INPUT_DOCKER_BUILDX", default_value = DEFAULT_BUILDX)]
    pub buildx: String,

    /// moby-snapshot release tag used by the nightly channel.
    #[arg(
        long = "docker-nightly-version",
        env = "INPUT_DOCKER_NIGHTLY_VERSION",
        default_value = DEFAULT_NIGHTLY_VERSION
    )]
    pub nightly_version: String,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            cli_experimental: DEFAULT_CLI_EXPERIMENTAL.to_string(),
            daemon_json: DEFAULT_DAEMON_JSON.to_string(),
            buildx: DEFAULT_BUILDX.to_string(),
            nightly_version: DEFAULT_NIGHTLY_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        inputs: Inputs,
    }

    #[test]
    fn test_flag_defaults_match_default_impl() {
        let cli = TestCli::parse_from(["setup-docker"]);
        // INPUT_* variables are not set by the test harness.
        if std::env::var_os("INPUT_DOCKER_CHANNEL").is_none() {
            assert_eq!(cli.inputs, Inputs::default());
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = TestCli::parse_from([
            "setup-docker",
            "--docker-channel",
            "nightly",
            "--docker-nightly-version",
            "snapshot-20221008",
            "--docker-daemon-json",
            r#"{"debug":true}"#,
        ]);
        assert_eq!(cli.inputs.channel, "nightly");
        assert_eq!(cli.inputs.nightly_version, "snapshot-20221008");
        assert_eq!(cli.inputs.daemon_json, r#"{"debug":true}"#);
    }
}
