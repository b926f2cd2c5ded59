//! phaseshiftd: the phaseshift daemon.
//!
//! Hosts the planner, admission gate and executor. Without a live platform
//! client it works against TOML group fixtures through the in-memory
//! platform:
//! - `init` writes a starter configuration
//! - `check` validates a configuration
//! - `plan` prints the plan for a phase change without executing it
//! - `simulate` runs a phase change end to end and reports the outcome
//!
//! # Usage
//!
//! ```text
//! phaseshiftd simulate --config phaseshift.toml --fixture town.toml --phase night --requester st-main
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use phaseshift_core::Phase;

mod commands;

#[derive(Parser)]
#[command(
    name = "phaseshiftd",
    about = "phaseshift daemon: day/night room relocation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter configuration file.
    Init {
        /// Where to write the configuration.
        #[arg(long, default_value = "phaseshift.toml")]
        path: PathBuf,

        /// Platform credentials, one per session.
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Load and validate a configuration file.
    Check {
        #[arg(long, default_value = "phaseshift.toml")]
        config: PathBuf,
    },

    /// Print the relocation plan for a phase change (dry run).
    Plan {
        #[arg(long, default_value = "phaseshift.toml")]
        config: PathBuf,

        /// Group fixture (rooms, roles, members, occupancy).
        #[arg(long)]
        fixture: PathBuf,

        /// Target phase: day or night.
        #[arg(long)]
        phase: Phase,

        /// Participant requesting the change. Required for night.
        #[arg(long)]
        requester: Option<String>,

        /// Output format: text or json.
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Run a phase change against the in-memory platform.
    Simulate {
        #[arg(long, default_value = "phaseshift.toml")]
        config: PathBuf,

        /// Group fixture (rooms, roles, members, occupancy).
        #[arg(long)]
        fixture: PathBuf,

        /// Target phase: day or night.
        #[arg(long)]
        phase: Phase,

        /// Participant requesting the change. Required for night.
        #[arg(long)]
        requester: Option<String>,

        /// Fail this many move attempts up front.
        #[arg(long, default_value = "0")]
        fail_first: usize,

        /// Simulated latency of each move call, in milliseconds.
        #[arg(long, default_value = "0")]
        move_latency_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Command::Init {
            path,
            tokens,
            force,
        } => commands::check::init(&path, &tokens, force),
        Command::Check { config } => commands::check::check(&config),
        Command::Plan {
            config,
            fixture,
            phase,
            requester,
            format,
        } => commands::plan::plan(&config, &fixture, phase, requester.as_deref(), &format).await,
        Command::Simulate {
            config,
            fixture,
            phase,
            requester,
            fail_first,
            move_latency_ms,
        } => {
            let options = commands::simulate::SimulateOptions {
                phase,
                requester,
                fail_first,
                move_latency: std::time::Duration::from_millis(move_latency_ms),
            };
            commands::simulate::run(&config, &fixture, options).await
        }
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,phaseshift=debug"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}
