//! # Init Command Implementation
//!
//! This module implements the `init` subcommand, which writes a new fleet
//! document into the fleet root (`--fleet-root`) or the current directory.
//!
//! ## Functionality
//!
//! - **Fleet section**: name, description, versioning mode and default branch
//! - **Seeded services** (`--discover`): every repository found below the
//!   target directory, in the same form `discover --fragment` prints
//! - **Interactive** (`--interactive`): prompts for anything not given as a flag
//! - **Force** (`--force`): overwrite an existing document
//!
//! `init` is the only command that writes the fleet document.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use serde::Serialize;

use manifest_fleet::defaults::{DEFAULT_FLEET_NAME, DEFAULT_VERSION_FILENAME};
use manifest_fleet::discovery::naming::clean_name;
use manifest_fleet::discovery::{discover, DiscoveryOptions};
use manifest_fleet::fleet::FleetMode;
use manifest_fleet::model::{FleetDescriptor, VersioningMode};
use manifest_fleet::output::{emoji, spinner};
use manifest_fleet::reconcile::{reconcile, render_fragments};
use manifest_fleet::settings::Settings;
use manifest_fleet::suggestions;

use super::{Context, ScanArgs};

/// Create a new fleet document
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Fleet name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// One-line fleet description
    #[arg(long)]
    pub description: Option<String>,

    /// Versioning mode: none, date, semver or increment
    #[arg(long, value_name = "MODE")]
    pub versioning: Option<VersioningMode>,

    /// Seed the services section with discovered repositories
    #[arg(long)]
    pub discover: bool,

    #[command(flatten)]
    pub scan: ScanArgs,

    /// Prompt for values not given as flags
    #[arg(short, long)]
    pub interactive: bool,

    /// Overwrite an existing fleet document
    #[arg(short, long)]
    pub force: bool,
}

/// The `fleet:` section of a new document.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct FleetSection {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    versioning: VersioningMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_file: Option<String>,
    default_branch: String,
}

#[derive(Serialize)]
struct DocumentSeed<'a> {
    fleet: &'a FleetSection,
}

/// Execute the `init` command.
pub fn execute(args: InitArgs, ctx: &Context) -> Result<()> {
    let target = target_dir(ctx)?;
    let workspace = ctx.resolve_from(target.clone(), Some(&args.scan), Some(FleetMode::Disabled))?;
    let settings = workspace.settings;
    let document = target.join(&settings.document_filename);

    if document.exists() && !args.force {
        return Err(suggestions::document_exists(&document));
    }

    let out = &ctx.out;
    println!(
        "{} Initializing fleet in {}",
        emoji(out, "🎯", "[INIT]"),
        target.display()
    );

    let mut section = FleetSection {
        name: args.name.clone().unwrap_or_else(|| default_fleet_name(&target)),
        description: args.description.clone(),
        versioning: args.versioning.unwrap_or_default(),
        version_file: None,
        default_branch: settings.default_branch.clone(),
    };
    let mut seed = args.discover;
    if args.interactive {
        seed = prompt(&mut section, &args, seed)?;
    }
    if section.versioning != VersioningMode::None {
        section.version_file = Some(DEFAULT_VERSION_FILENAME.to_string());
    }

    let services = if seed {
        seed_services(&target, &section.name, &settings, &args.scan, ctx)?
    } else {
        String::new()
    };

    let content = build_document(&section, &services)?;
    fs::write(&document, content)
        .with_context(|| format!("Failed to write {}", document.display()))?;

    println!(
        "{} Created {}",
        emoji(out, "✅", "[OK]"),
        settings.document_filename
    );
    if let Some(version_file) = &section.version_file {
        if !target.join(version_file).exists() {
            println!(
                "{} Create {} to track the fleet version",
                emoji(out, "💡", "[TIP]"),
                version_file
            );
        }
    }
    println!(
        "{} Run 'manifest-fleet status' to inspect the fleet",
        emoji(out, "💡", "[TIP]")
    );
    Ok(())
}

/// `--fleet-root` when given, otherwise the current directory.
fn target_dir(ctx: &Context) -> Result<PathBuf> {
    match &ctx.fleet.fleet_root {
        Some(root) if root.is_dir() => Ok(root.clone()),
        Some(root) => Err(suggestions::fleet_root_not_found(root)),
        None => env::current_dir().context("Failed to read the current directory"),
    }
}

fn default_fleet_name(target: &Path) -> String {
    target
        .file_name()
        .map(|n| clean_name(&n.to_string_lossy()))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_FLEET_NAME.to_string())
}

/// Fill `section` from prompts; returns whether to seed services.
fn prompt(section: &mut FleetSection, args: &InitArgs, seed: bool) -> Result<bool> {
    let theme = ColorfulTheme::default();

    if args.name.is_none() {
        section.name = Input::with_theme(&theme)
            .with_prompt("Fleet name")
            .default(section.name.clone())
            .interact_text()?;
    }
    if args.description.is_none() {
        let description: String = Input::with_theme(&theme)
            .with_prompt("Description (optional)")
            .allow_empty(true)
            .interact_text()?;
        let description = description.trim();
        section.description = (!description.is_empty()).then(|| description.to_string());
    }
    if args.versioning.is_none() {
        let modes = [
            VersioningMode::None,
            VersioningMode::Date,
            VersioningMode::Semver,
            VersioningMode::Increment,
        ];
        let labels: Vec<&str> = modes.iter().map(|m| m.as_str()).collect();
        let choice = Select::with_theme(&theme)
            .with_prompt("Versioning")
            .items(&labels)
            .default(0)
            .interact()?;
        section.versioning = modes[choice];
    }
    if seed {
        return Ok(true);
    }
    Ok(Confirm::with_theme(&theme)
        .with_prompt("Add repositories found below this directory?")
        .default(true)
        .interact()?)
}

/// Discover repositories below `root` and render them as service entries.
fn seed_services(
    root: &Path,
    fleet_name: &str,
    settings: &Settings,
    scan: &ScanArgs,
    ctx: &Context,
) -> Result<String> {
    let options = DiscoveryOptions::from(settings);
    let inspector = scan.inspector();

    let progress = spinner(&ctx.out, "Discovering repositories...");
    let found = discover(root, &options, inspector.as_ref());
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let repos = found.map_err(suggestions::from_library)?;

    println!(
        "{} Found {} repositories",
        emoji(&ctx.out, "🔍", "[SCAN]"),
        repos.len()
    );
    let empty = FleetDescriptor::empty(fleet_name, root);
    Ok(render_fragments(&reconcile(&repos, &empty).entries))
}

/// The full document text: the fleet section followed by `services`.
fn build_document(section: &FleetSection, services: &str) -> Result<String> {
    let mut content = String::from("# manifest-fleet document\n");
    content.push_str(&serde_yaml::to_string(&DocumentSeed { fleet: section })?);
    content.push('\n');
    if services.is_empty() {
        content.push_str("services: {}\n");
    } else {
        content.push_str("services:\n");
        content.push_str(services);
    }
    Ok(content)
}
