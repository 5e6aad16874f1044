//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Manifest Fleet - Resolve, discover and reconcile a fleet of repositories
#[derive(Parser, Debug)]
#[command(name = "manifest-fleet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    #[command(flatten)]
    fleet: commands::FleetArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the resolved fleet and its services
    Status(commands::status::StatusArgs),

    /// Find repositories on disk and compare them with the fleet document
    Discover(commands::discover::DiscoverArgs),

    /// Create a new fleet document
    Init(commands::init::InitArgs),

    /// Check the fleet document against the workspace
    Validate(commands::validate::ValidateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let ctx = commands::Context::new(&self.color, self.fleet);

        match self.command {
            Commands::Status(args) => commands::status::execute(args, &ctx),
            Commands::Discover(args) => commands::discover::execute(args, &ctx),
            Commands::Init(args) => commands::init::execute(args, &ctx),
            Commands::Validate(args) => commands::validate::execute(args, &ctx),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Log to stderr at `level` unless `RUST_LOG` says otherwise.
fn init_logging(level: &str) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp(None);
    builder.target(env_logger::Target::Stderr);
    // a second initialization (e.g. in tests) keeps the first logger
    let _ = builder.try_init();
}
