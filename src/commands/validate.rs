//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which checks every
//! service in the fleet document against the workspace on disk:
//!
//! - each service declares a path or a url
//! - declared paths exist and hold a repository
//! - remote urls are parseable
//! - no two services share a checkout path
//!
//! All findings are reported before the command fails. With `--strict`,
//! warnings fail the run too. This command never modifies any files.

use anyhow::Result;
use clap::Args;

use manifest_fleet::fleet::FleetMode;
use manifest_fleet::output::{emoji, render, OutputFormat};
use manifest_fleet::suggestions;
use manifest_fleet::validate::{validate, Severity};

use super::Context;

/// Check the fleet document against the workspace
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Use strict validation (fail on warnings).
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, ctx: &Context) -> Result<()> {
    if ctx.fleet.fleet_mode == FleetMode::Disabled {
        return Err(suggestions::fleet_required("validate"));
    }
    let workspace = ctx.resolve(None, Some(FleetMode::Required))?;
    let Some(fleet) = &workspace.fleet else {
        return Err(suggestions::document_not_found(
            &workspace.root.join(&workspace.settings.document_filename),
        ));
    };

    let report = validate(fleet);
    let errors = report.errors().count();
    let warnings = report.warnings().count();

    if let Some(text) = render(args.format, &report)? {
        println!("{}", text.trim_end());
    } else {
        let out = &ctx.out;
        println!(
            "{} Validating fleet: {}",
            emoji(out, "🔍", "[SCAN]"),
            fleet.document.display()
        );
        println!("   Services checked: {}", report.services_checked);
        println!();

        for finding in &report.findings {
            let marker = match finding.severity {
                Severity::Error => emoji(out, "❌", "[ERR]"),
                Severity::Warning => emoji(out, "⚠️", "[WARN]"),
            };
            println!(
                "{} {} [{}]: {}",
                marker, finding.service, finding.kind, finding.message
            );
        }

        if report.findings.is_empty() {
            println!("{} Fleet document is valid", emoji(out, "✅", "[OK]"));
        } else if report.passes(args.strict) {
            println!(
                "\n{} Fleet document is valid with {} warning(s)",
                emoji(out, "✅", "[OK]"),
                warnings
            );
        }
    }

    if !report.passes(args.strict) {
        return Err(suggestions::validation_failed(errors, warnings, args.strict));
    }
    Ok(())
}
