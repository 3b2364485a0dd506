//! Command-line interface.
//!
//! Argument definitions and command dispatch. The `run` command drives
//! the coordinator against the in-memory device session; the concrete
//! network transports plug in behind the same traits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;

use crate::config::{self, Settings};
use crate::coordinator::Coordinator;
use crate::device::SimSession;
use crate::error::{PulselinkError, Result};
use crate::logging::LogFormat;
use crate::osc::LogPublisher;

// ============================================================================
// Root CLI
// ============================================================================

/// Session coordinator for two-channel e-stim devices.
#[derive(Parser, Debug)]
#[command(name = "pulselink", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "PULSELINK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the coordinator with a simulated device session.
    Run(RunArgs),

    /// Validate a configuration file without starting anything.
    Check(CheckArgs),

    /// Display version information.
    Version,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the YAML configuration file; defaults apply without one.
    #[arg(short, long, env = "PULSELINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Strength limit the simulated device reports for channel A.
    #[arg(long, default_value_t = 100)]
    pub limit_a: u32,

    /// Strength limit the simulated device reports for channel B.
    #[arg(long, default_value_t = 100)]
    pub limit_b: u32,
}

/// Arguments for `check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the YAML configuration file.
    pub config: PathBuf,
}

// ============================================================================
// Dispatch
// ============================================================================

/// Dispatches a parsed CLI invocation to its command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command fails.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run(&args).await,
        Commands::Check(args) => check(&args),
        Commands::Version => {
            version();
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    path.map_or_else(
        || Ok(Settings::default()),
        |p| config::load(p).map_err(PulselinkError::from),
    )
}

async fn run(args: &RunArgs) -> Result<()> {
    let settings = load_settings(args.config.as_deref())?;

    let (session, events) = SimSession::new(args.limit_a, args.limit_b);
    let session = Arc::new(session);
    let coordinator = Coordinator::new(
        &settings,
        Arc::clone(&session) as _,
        Arc::new(LogPublisher),
    )?;

    session.announce().await.map_err(PulselinkError::from)?;
    info!(
        limit_a = args.limit_a,
        limit_b = args.limit_b,
        "simulated device announced"
    );

    coordinator.run(events, None).await
}

fn check(args: &CheckArgs) -> Result<()> {
    let settings = config::load(&args.config)?;
    println!(
        "{}: ok ({} custom mappings, damage bridge {})",
        args.config.display(),
        settings.mappings.len(),
        if settings.damage.enabled { "on" } else { "off" },
    );
    Ok(())
}

fn version() {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    println!("{name} {version}");
}
