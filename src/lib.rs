//! Provision a Docker engine and buildx on a CI runner.
//!
//! The crate detects the host once, picks one of three workflows and drives
//! the host's own tools (apt, dpkg, brew, systemctl, docker) to reach a
//! working engine with a bootstrapped buildx builder:
//!
//! - **macOS** - Homebrew docker CLI, daemon in a colima VM
//! - **Linux nightly** - moby-snapshot `.deb` archive
//! - **Linux standard** - Docker's apt repository, version pinned from the index
//!
//! # Architecture
//!
//! ```text
//! setup-docker (bin)
//!     │
//!     ├── config: inputs (flags / INPUT_* env)
//!     ├── context: validated, immutable ProvisioningContext
//!     ├── platform: PlatformProfile + variant selection
//!     │
//!     └── orchestrator ──┬── installer::{macos, nightly, standard}
//!                        ├── daemon (daemon.json + restart)
//!                        └── buildx (binfmt + builder)
//!                              │
//!                              ▼
//!                  component::Op ──► executor ──► process::CommandRunner
//!                                       │
//!                                       └──► annotations::Reporter
//! ```
//!
//! Every host mutation is an [`Op`] carrying a [`FailurePolicy`]. Fatal
//! steps abort the run; advisory steps are logged and skipped.
//!
//! # Example
//!
//! ```rust,ignore
//! use setup_docker::{
//!     ActionsReporter, Executor, Inputs, PlatformProfile, Provisioner,
//!     ProvisioningContext, SystemRunner,
//! };
//!
//! let ctx = ProvisioningContext::from_inputs(&Inputs::default())?;
//! let profile = PlatformProfile::detect()?;
//! let runner = SystemRunner;
//! let reporter = ActionsReporter::from_env();
//! let mut exec = Executor::new(&runner, &reporter);
//! Provisioner::new(&ctx, &profile).run(&mut exec)?;
//! ```

pub mod annotations;
pub mod buildx;
pub mod component;
pub mod config;
pub mod context;
pub mod daemon;
pub mod executor;
pub mod installer;
pub mod orchestrator;
pub mod platform;
pub mod preflight;
pub mod process;
pub mod report;
pub mod resolver;

pub use annotations::{ActionsReporter, Reporter};
pub use component::{FailurePolicy, Op};
pub use config::Inputs;
pub use context::ProvisioningContext;
pub use executor::{Executor, StepRecord, StepStatus};
pub use orchestrator::{Outcome, Provisioner};
pub use platform::{PlatformProfile, Variant};
pub use process::{CommandError, CommandRunner, HostCommand, SystemRunner};
pub use report::{RunReport, RunStatus};
