//! Validated provisioning inputs.

use anyhow::{bail, Context, Result};

use crate::config::Inputs;

pub const NIGHTLY_CHANNEL: &str = "nightly";

/// Everything the workflow needs to know about what to install.
///
/// Built once from [`Inputs`] and passed by reference to every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningContext {
    /// Release channel (`stable`, `test`, `nightly`).
    pub channel: String,
    /// Version fragment to match in the package index.
    pub version: String,
    /// Literal daemon.json text, known to be a JSON object.
    pub daemon_json: String,
    pub buildx: bool,
    pub cli_experimental: bool,
    /// moby-snapshot release tag.
    pub nightly_tag: String,
}

impl ProvisioningContext {
    pub fn from_inputs(inputs: &Inputs) -> Result<Self> {
        let channel = inputs.channel.trim();
        if channel.is_empty() || channel.contains(char::is_whitespace) {
            bail!("invalid docker_channel '{}'", inputs.channel);
        }

        let nightly_tag = inputs.nightly_version.trim();
        if channel == NIGHTLY_CHANNEL && nightly_tag.is_empty() {
            bail!("docker_nightly_version is required for the nightly channel");
        }

        let parsed: serde_json::Value = serde_json::from_str(&inputs.daemon_json)
            .context("docker_daemon_json is not valid JSON")?;
        if !parsed.is_object() {
            bail!("docker_daemon_json must be a JSON object");
        }

        Ok(Self {
            channel: channel.to_string(),
            version: inputs.version.trim().to_string(),
            daemon_json: inputs.daemon_json.clone(),
            buildx: inputs.buildx.trim() == "true",
            cli_experimental: inputs.cli_experimental.trim() == "enabled",
            nightly_tag: nightly_tag.to_string(),
        })
    }

    pub fn is_nightly(&self) -> bool {
        self.channel == NIGHTLY_CHANNEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let ctx = ProvisioningContext::from_inputs(&Inputs::default()).unwrap();
        assert_eq!(ctx.channel, "stable");
        assert_eq!(ctx.version, "20.10");
        assert!(ctx.buildx);
        assert!(ctx.cli_experimental);
        assert!(!ctx.is_nightly());
    }

    #[test]
    fn test_toggles_use_exact_strings() {
        let inputs = Inputs {
            buildx: "false".into(),
            cli_experimental: "disabled".into(),
            ..Inputs::default()
        };
        let ctx = ProvisioningContext::from_inputs(&inputs).unwrap();
        assert!(!ctx.buildx);
        assert!(!ctx.cli_experimental);
    }

    #[test]
    fn test_daemon_json_is_kept_verbatim() {
        let json = "{\n  \"registry-mirrors\": [\"https://mirror.example\"]\n}";
        let inputs = Inputs {
            daemon_json: json.into(),
            ..Inputs::default()
        };
        let ctx = ProvisioningContext::from_inputs(&inputs).unwrap();
        assert_eq!(ctx.daemon_json, json);
    }

    #[test]
    fn test_rejects_invalid_daemon_json() {
        let inputs = Inputs {
            daemon_json: "{not json".into(),
            ..Inputs::default()
        };
        let err = ProvisioningContext::from_inputs(&inputs).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));

        let inputs = Inputs {
            daemon_json: "[1, 2]".into(),
            ..Inputs::default()
        };
        assert!(ProvisioningContext::from_inputs(&inputs).is_err());
    }

    #[test]
    fn test_nightly_requires_tag() {
        let inputs = Inputs {
            channel: "nightly".into(),
            nightly_version: " ".into(),
            ..Inputs::default()
        };
        assert!(ProvisioningContext::from_inputs(&inputs).is_err());
    }

    #[test]
    fn test_rejects_channel_with_whitespace() {
        let inputs = Inputs {
            channel: "stable test".into(),
            ..Inputs::default()
        };
        assert!(ProvisioningContext::from_inputs(&inputs).is_err());
    }
}
