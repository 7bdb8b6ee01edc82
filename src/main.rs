//! Edgebuild - builds and pushes edge module images.
//!
//! Each module directory holds a `module.json` naming its language, version
//! and one Dockerfile per target architecture. Edgebuild builds every
//! selected module for every selected architecture and pushes the images to
//! the configured registry.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use edgebuild::commands;
use edgebuild::config::Config;
use edgebuild::output::ConsoleOutput;

#[derive(Parser)]
#[command(name = "edgebuild")]
#[command(about = "Multi-architecture image builder for edge modules")]
#[command(
    after_help = "QUICK START:\n  edgebuild preflight    Check tools and module descriptors\n  edgebuild build        Build images for all active modules\n  edgebuild push         Build and push images\n  edgebuild show tags    List the image tags a build would produce"
)]
struct Cli {
    /// Project directory holding .env and the modules directory
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build module images (no push)
    Build,

    /// Build module images and push them to the registry
    Push {
        /// Skip building; push images from an earlier `edgebuild build`
        #[arg(long)]
        no_build: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Run preflight checks (verify tools and modules before build)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Show the image tags the active modules would produce
    Tags,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.base_dir);
    let out = ConsoleOutput;

    match cli.command {
        Commands::Build => {
            let cancel = cancel_on_ctrl_c();
            commands::cmd_build(commands::build::BuildTarget::Images, &config, &out, cancel).await?;
        }

        Commands::Push { no_build } => {
            let target = if no_build {
                commands::build::BuildTarget::PushOnly
            } else {
                commands::build::BuildTarget::Push
            };
            let cancel = cancel_on_ctrl_c();
            commands::cmd_build(target, &config, &out, cancel).await?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Tags => commands::show::ShowTarget::Tags,
            };
            commands::cmd_show(show_target, &config, &out)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&config, strict, &out)?;
        }
    }

    Ok(())
}

/// Token cancelled on the first Ctrl-C. The pipeline stops at the next
/// architecture boundary.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n[WARN] Interrupted, stopping after the current step...");
            child.cancel();
        }
    });
    token
}
