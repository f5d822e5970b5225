use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use setup_docker::report::{write_report, RunReport, RunStatus};
use setup_docker::{
    ActionsReporter, Executor, Inputs, Outcome, PlatformProfile, Provisioner, ProvisioningContext,
    Reporter, StepRecord, SystemRunner,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "setup_docker=info";

/// Install docker and buildx on a CI runner.
#[derive(Debug, Parser)]
#[command(name = "setup-docker", version)]
struct Cli {
    #[command(flatten)]
    inputs: Inputs,

    /// Write a JSON run report to this path.
    #[arg(long, env = "SETUP_DOCKER_REPORT")]
    report: Option<PathBuf>,

    /// Do not check for required host tools first.
    #[arg(long)]
    skip_preflight: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let reporter = ActionsReporter::from_env();
    let mut report = match RunReport::begin() {
        Ok(report) => report,
        Err(err) => {
            reporter.error(&format!("{err:#}"));
            return ExitCode::FAILURE;
        }
    };

    let mut steps = Vec::new();
    let result = provision(&cli, &reporter, &mut report, &mut steps);
    let status = match &result {
        Ok(Outcome::Provisioned(_)) => RunStatus::Success,
        Ok(Outcome::Skipped { .. }) => RunStatus::Skipped,
        Ok(Outcome::Unsupported { .. }) => RunStatus::Unsupported,
        Err(err) => {
            report.error = Some(format!("{err:#}"));
            RunStatus::Failed
        }
    };

    if let Some(path) = &cli.report {
        if let Err(err) = finish_report(path, &mut report, status, steps) {
            reporter.warning(&format!("{err:#}"));
        }
    }

    match result {
        Ok(Outcome::Unsupported { .. }) => ExitCode::FAILURE,
        Ok(_) => {
            reporter.info("Run success");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "provisioning failed");
            reporter.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // stdout carries workflow commands.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn provision(
    cli: &Cli,
    reporter: &ActionsReporter,
    report: &mut RunReport,
    journal: &mut Vec<StepRecord>,
) -> Result<Outcome> {
    let ctx = ProvisioningContext::from_inputs(&cli.inputs)?;
    let profile = PlatformProfile::detect()?;
    tracing::info!(
        channel = %ctx.channel,
        version = %ctx.version,
        buildx = ctx.buildx,
        os = %profile.os,
        arch = %profile.arch,
        "starting provisioning"
    );

    let runner = SystemRunner;
    let mut exec = Executor::new(&runner, reporter);
    let result = Provisioner::new(&ctx, &profile)
        .with_preflight(!cli.skip_preflight)
        .run(&mut exec);
    if let Ok(Outcome::Provisioned(variant)) = &result {
        report.variant = Some(variant.to_string());
    }
    *journal = exec.into_journal();
    result
}

fn finish_report(
    path: &Path,
    report: &mut RunReport,
    status: RunStatus,
    steps: Vec<StepRecord>,
) -> Result<()> {
    report.finish(status, steps)?;
    write_report(path, report)?;
    tracing::info!(path = %path.display(), "run report written");
    Ok(())
}
