//! # Status Command Implementation
//!
//! Resolves the fleet document and prints the fleet metadata together with
//! every declared service. Nothing is scanned or modified.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use manifest_fleet::model::FleetDescriptor;
use manifest_fleet::output::{emoji, render, OutputFormat};

use super::Context;

/// Show the resolved fleet and its services
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    parser: Option<String>,
    fleet: Option<&'a FleetDescriptor>,
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, ctx: &Context) -> Result<()> {
    let workspace = ctx.resolve(None, None)?;

    let report = StatusReport {
        parser: workspace.capability.map(|c| c.to_string()),
        fleet: workspace.fleet.as_ref(),
    };
    if let Some(text) = render(args.format, &report)? {
        println!("{}", text.trim_end());
        return Ok(());
    }

    let out = &ctx.out;
    let Some(fleet) = &workspace.fleet else {
        println!(
            "{} No fleet document found above {}",
            emoji(out, "ℹ️", "[INFO]"),
            workspace.root.display()
        );
        println!("   Run 'manifest-fleet init' to create one");
        return Ok(());
    };

    println!("{} Fleet: {}", emoji(out, "🚢", "[FLEET]"), fleet.name);
    if let Some(description) = &fleet.description {
        println!("   {}", description);
    }
    println!("   Root:       {}", fleet.root.display());
    println!("   Document:   {}", fleet.document.display());
    println!("   Versioning: {}", fleet.versioning);
    if let Some(version) = &fleet.current_version {
        println!("   Version:    {}", version);
    }
    println!("   Branch:     {}", fleet.default_branch);
    if let Some(capability) = workspace.capability {
        println!("   Parser:     {}", capability);
    }

    println!();
    if fleet.services.is_empty() {
        println!("{} No services declared", emoji(out, "⚠️", "[WARN]"));
        return Ok(());
    }

    println!("{} Services ({}):", emoji(out, "📦", "[SERVICES]"), fleet.services.len());
    let rows: Vec<[String; 4]> = fleet
        .services
        .values()
        .map(|service| {
            let location = if service.path.is_some() {
                fleet.relative_path(service)
            } else {
                service.remote_url.clone().unwrap_or_default()
            };
            let mut flags = Vec::new();
            if service.is_submodule {
                flags.push("submodule");
            }
            if service.excluded_from_bump {
                flags.push("no-bump");
            }
            [
                service.name.clone(),
                service.service_type.to_string(),
                service.branch.clone(),
                if flags.is_empty() {
                    location
                } else {
                    format!("{} ({})", location, flags.join(", "))
                },
            ]
        })
        .collect();
    print_table(&["NAME", "TYPE", "BRANCH", "LOCATION"], &rows);

    Ok(())
}

/// Print left-aligned columns sized to their widest cell.
pub(crate) fn print_table<const N: usize>(headers: &[&str; N], rows: &[[String; N]]) {
    let mut widths = headers.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        println!("   {}", padded.join("  ").trim_end());
    };
    line(headers.to_vec());
    for row in rows {
        line(row.iter().map(String::as_str).collect());
    }
}
