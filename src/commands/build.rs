//! Build and push commands - run the module pipeline.

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::output::Output;
use crate::pipeline::{Mode, ModuleStatus, Pipeline, PipelineSettings, RunReport};
use crate::registry::{DockerCli, RegistryClient};

/// Build target for the build command.
pub enum BuildTarget {
    /// Build images only (`edgebuild build`)
    Images,
    /// Build and push (`edgebuild push`)
    Push,
    /// Push images from an earlier build (`edgebuild push --no-build`)
    PushOnly,
}

impl BuildTarget {
    fn mode(&self) -> Mode {
        match self {
            Self::Images => Mode::Build,
            Self::Push => Mode::BuildAndPush,
            Self::PushOnly => Mode::PushOnly,
        }
    }
}

/// Execute the build or push command against the docker CLI.
pub async fn cmd_build(
    target: BuildTarget,
    config: &Config,
    out: &dyn Output,
    cancel: CancellationToken,
) -> Result<()> {
    let registry = DockerCli::new();
    run_with(target, config, &registry, out, cancel).await
}

/// Execute the build or push command against any registry client.
pub async fn run_with(
    target: BuildTarget,
    config: &Config,
    registry: &dyn RegistryClient,
    out: &dyn Output,
    cancel: CancellationToken,
) -> Result<()> {
    let pipeline = Pipeline::new(PipelineSettings::from_config(config), registry, out)
        .with_cancellation(cancel);
    let report = pipeline.run(target.mode()).await;
    report.print_summary(out);
    check_exit(&report)
}

/// Descriptor failures fail the command. Everything else is a warning.
fn check_exit(report: &RunReport) -> Result<()> {
    if report.has_descriptor_failures() {
        let names: Vec<&str> = report
            .modules
            .iter()
            .filter(|m| {
                matches!(
                    m.status,
                    ModuleStatus::Failed {
                        descriptor_error: true,
                        ..
                    }
                )
            })
            .map(|m| m.name.as_str())
            .collect();
        bail!(
            "{} module(s) have a missing or malformed module.json: {}",
            names.len(),
            names.join(", ")
        );
    }
    Ok(())
}
