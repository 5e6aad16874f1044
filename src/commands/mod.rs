//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `manifest-fleet` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`Context`] and performs the command's logic.
//!
//! Flags shared by several commands live here: [`FleetArgs`] (global fleet
//! selection) and [`ScanArgs`] (discovery tuning).

pub mod completions;
pub mod discover;
pub mod init;
pub mod status;
pub mod validate;

use std::env;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;

use manifest_fleet::defaults;
use manifest_fleet::document::ParserPreference;
use manifest_fleet::fleet::{resolve_workspace, FleetMode, ResolveOptions, Workspace};
use manifest_fleet::git::{GitCliInspector, GitDirInspector, RepoInspector};
use manifest_fleet::output::OutputConfig;
use manifest_fleet::settings::SettingsOverrides;
use manifest_fleet::suggestions;

/// Global flags selecting the fleet and how its document is read.
#[derive(Args, Debug, Clone, Default)]
pub struct FleetArgs {
    /// Fleet root directory, used verbatim instead of searching upward
    #[arg(long, global = true, value_name = "DIR", env = "MANIFEST_FLEET_ROOT")]
    pub fleet_root: Option<PathBuf>,

    /// Whether a fleet document is required (true), optional (auto) or ignored (false)
    #[arg(long, global = true, value_name = "MODE", default_value = "auto")]
    pub fleet_mode: FleetMode,

    /// File name of the fleet document
    #[arg(long, global = true, value_name = "FILE")]
    pub document: Option<String>,

    /// Document parser: auto, yq, embedded or line
    #[arg(long, global = true, value_name = "PARSER", env = "MANIFEST_FLEET_PARSER")]
    pub parser: Option<ParserPreference>,
}

/// Discovery tuning flags.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Maximum directory depth below the workspace root
    #[arg(long, value_name = "N")]
    pub depth: Option<usize>,

    /// Number of subtrees walked in parallel
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Leave git submodules out of the results
    #[arg(long)]
    pub no_submodules: bool,

    /// Do not look for repositories nested inside other repositories
    #[arg(long)]
    pub no_nested: bool,

    /// Read repository metadata by running git instead of reading .git directly
    #[arg(long)]
    pub git_cli: bool,
}

impl ScanArgs {
    /// The metadata backend these flags select.
    pub fn inspector(&self) -> Box<dyn RepoInspector> {
        if self.git_cli {
            Box::new(GitCliInspector)
        } else {
            Box::new(GitDirInspector)
        }
    }
}

/// State shared by every command invocation.
pub struct Context {
    pub out: OutputConfig,
    pub fleet: FleetArgs,
}

impl Context {
    pub fn new(color_flag: &str, fleet: FleetArgs) -> Self {
        Self {
            out: OutputConfig::from_env_and_flag(color_flag),
            fleet,
        }
    }

    /// Settings overrides from the global and per-command flags.
    pub fn overrides(&self, scan: Option<&ScanArgs>) -> SettingsOverrides {
        let mut overrides = SettingsOverrides {
            parser: self.fleet.parser,
            document_filename: self.fleet.document.clone(),
            ..Default::default()
        };
        if let Some(scan) = scan {
            overrides.search_depth = scan.depth;
            overrides.parallelism = scan.parallel;
            if scan.no_submodules {
                overrides.include_submodules = Some(false);
            }
            if scan.no_nested {
                overrides.nested = Some(false);
            }
        }
        overrides
    }

    /// Resolve the workspace, optionally forcing a fleet mode.
    pub fn resolve(
        &self,
        scan: Option<&ScanArgs>,
        mode: Option<FleetMode>,
    ) -> Result<Workspace> {
        let start_dir = env::current_dir().context("Failed to read the current directory")?;
        self.resolve_from(start_dir, scan, mode)
    }

    /// Resolve the workspace with the upward search starting at `start_dir`.
    pub fn resolve_from(
        &self,
        start_dir: PathBuf,
        scan: Option<&ScanArgs>,
        mode: Option<FleetMode>,
    ) -> Result<Workspace> {
        let overrides = self.overrides(scan);
        let options = ResolveOptions {
            start_dir,
            fleet_root: self.fleet.fleet_root.clone(),
            mode: mode.unwrap_or(self.fleet.fleet_mode),
            user_config: defaults::default_user_config_path(),
            overrides,
        };
        resolve_workspace(&options).map_err(suggestions::from_library)
    }
}
