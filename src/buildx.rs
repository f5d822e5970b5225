//! buildx bootstrap: binfmt emulation plus a `docker-container` builder.

use anyhow::Result;

use crate::component::{advisory, export, fatal, group, Op};
use crate::context::ProvisioningContext;
use crate::executor::Executor;
use crate::process::HostCommand;

pub const BUILDER_NAME: &str = "mybuilder";
pub const BUILDER_DRIVER: &str = "docker-container";
pub const BUILDKIT_IMAGE: &str = "ghcr.io/dpsigs/moby-buildkit:master";
pub const BINFMT_IMAGE: &str = "ghcr.io/dpsigs/tonistiigi-binfmt:latest";
pub const BINFMT_MISC_DIR: &str = "/proc/sys/fs/binfmt_misc";
pub const EXPERIMENTAL_ENV: &str = "DOCKER_CLI_EXPERIMENTAL";
pub const UNSUPPORTED_MESSAGE: &str = "this docker version does not support buildx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildxOutcome {
    Disabled,
    /// The installed docker has no buildx subcommand.
    Unsupported,
    Bootstrapped,
}

/// Steps run once `docker buildx version` succeeded.
pub fn bootstrap_ops() -> Vec<Op> {
    vec![
        group(
            "setup qemu",
            vec![fatal(
                "install binfmt emulators",
                HostCommand::new("docker").args([
                    "run",
                    "--rm",
                    "--privileged",
                    BINFMT_IMAGE,
                    "--install",
                    "all",
                ]),
            )],
        ),
        group(
            format!("list {BINFMT_MISC_DIR}"),
            vec![advisory(
                "list binfmt handlers",
                HostCommand::new("ls").args(["-la", BINFMT_MISC_DIR]),
            )],
        ),
        group(
            "create buildx instance",
            vec![fatal(
                format!("create builder {BUILDER_NAME}"),
                HostCommand::new("docker").args([
                    "buildx",
                    "create",
                    "--use",
                    "--name",
                    BUILDER_NAME,
                    "--driver",
                    BUILDER_DRIVER,
                    "--driver-opt",
                    &format!("image={BUILDKIT_IMAGE}"),
                ]),
            )],
        ),
        group(
            "inspect buildx instance",
            vec![fatal(
                format!("bootstrap builder {BUILDER_NAME}"),
                HostCommand::new("docker").args(["buildx", "inspect", "--bootstrap"]),
            )],
        ),
    ]
}

/// Set up buildx according to the context's toggles.
pub fn bootstrap(ctx: &ProvisioningContext, exec: &mut Executor<'_>) -> Result<BuildxOutcome> {
    if ctx.cli_experimental {
        exec.execute(&export(EXPERIMENTAL_ENV, "enabled"))?;
    }

    if !ctx.buildx {
        exec.reporter().info("buildx disabled");
        return Ok(BuildxOutcome::Disabled);
    }

    // buildx lives behind the experimental CLI on older engines.
    if !ctx.cli_experimental {
        exec.execute(&export(EXPERIMENTAL_ENV, "enabled"))?;
    }

    let probe = exec.execute(&advisory(
        "check buildx support",
        HostCommand::new("docker").args(["buildx", "version"]),
    ))?;
    if !probe.succeeded() {
        exec.reporter().info(UNSUPPORTED_MESSAGE);
        return Ok(BuildxOutcome::Unsupported);
    }

    exec.execute_all(&bootstrap_ops())?;
    tracing::info!(builder = BUILDER_NAME, "buildx builder bootstrapped");
    Ok(BuildxOutcome::Bootstrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::recording::{Event, RecordingReporter};
    use crate::config::Inputs;
    use crate::process::scripted::ScriptedRunner;

    fn ctx(buildx: &str, experimental: &str) -> ProvisioningContext {
        ProvisioningContext::from_inputs(&Inputs {
            buildx: buildx.into(),
            cli_experimental: experimental.into(),
            ..Inputs::default()
        })
        .unwrap()
    }

    #[test]
    fn test_disabled_only_exports_experimental_flag() {
        let runner = ScriptedRunner::new();
        let reporter = RecordingReporter::default();
        let mut exec = Executor::new(&runner, &reporter);

        let outcome = bootstrap(&ctx("false", "enabled"), &mut exec).unwrap();

        assert_eq!(outcome, BuildxOutcome::Disabled);
        assert!(runner.calls().is_empty());
        assert_eq!(
            reporter.exports(),
            vec![(EXPERIMENTAL_ENV.to_string(), "enabled".to_string())]
        );
    }

    #[test]
    fn test_disabled_without_experimental_exports_nothing() {
        let runner = ScriptedRunner::new();
        let reporter = RecordingReporter::default();
        let mut exec = Executor::new(&runner, &reporter);

        bootstrap(&ctx("false", "disabled"), &mut exec).unwrap();
        assert!(reporter.exports().is_empty());
    }

    #[test]
    fn test_unsupported_docker_is_not_an_error() {
        let runner = ScriptedRunner::new().fail(&["buildx", "version"], "unknown command");
        let reporter = RecordingReporter::default();
        let mut exec = Executor::new(&runner, &reporter);

        let outcome = bootstrap(&ctx("true", "disabled"), &mut exec).unwrap();

        assert_eq!(outcome, BuildxOutcome::Unsupported);
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(reporter.exports().len(), 1);
        assert!(reporter
            .events()
            .contains(&Event::Info(UNSUPPORTED_MESSAGE.to_string())));
    }

    #[test]
    fn test_bootstrap_creates_named_builder() {
        let runner = ScriptedRunner::new();
        let reporter = RecordingReporter::default();
        let mut exec = Executor::new(&runner, &reporter);

        let outcome = bootstrap(&ctx("true", "enabled"), &mut exec).unwrap();

        assert_eq!(outcome, BuildxOutcome::Bootstrapped);
        let lines = runner.command_lines();
        assert_eq!(
            lines,
            vec![
                "docker buildx version".to_string(),
                format!("docker run --rm --privileged {BINFMT_IMAGE} --install all"),
                format!("ls -la {BINFMT_MISC_DIR}"),
                format!(
                    "docker buildx create --use --name mybuilder --driver docker-container --driver-opt image={BUILDKIT_IMAGE}"
                ),
                "docker buildx inspect --bootstrap".to_string(),
            ]
        );
    }

    #[test]
    fn test_binfmt_listing_is_advisory_but_create_is_fatal() {
        let runner = ScriptedRunner::new().fail(&["ls"], "permission denied");
        let reporter = RecordingReporter::default();
        let mut exec = Executor::new(&runner, &reporter);
        assert_eq!(
            bootstrap(&ctx("true", "enabled"), &mut exec).unwrap(),
            BuildxOutcome::Bootstrapped
        );

        let runner = ScriptedRunner::new().fail(&["buildx", "create"], "driver error");
        let reporter = RecordingReporter::default();
        let mut exec = Executor::new(&runner, &reporter);
        assert!(bootstrap(&ctx("true", "enabled"), &mut exec).is_err());
        assert_eq!(runner.count(&["buildx", "inspect"]), 0);
    }
}
