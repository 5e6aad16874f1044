//! # Discover Command Implementation
//!
//! Walks the workspace for git repositories and, when a fleet document is
//! in play, reconciles the findings against it.
//!
//! ## Modes
//!
//! - **Report** (default): new, missing, changed and unchanged entries
//! - **Fragment** (`--fragment`): document entries for every new repository
//! - **Tree** (`--tree`): repositories nested by path
//! - **Check** (`--check`): exit non-zero when the document has drifted
//! - **No fleet** (`--no-fleet`): list discoveries without reconciling

use std::borrow::Cow;
use std::io;

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use manifest_fleet::discovery::{discover, DiscoveryOptions};
use manifest_fleet::fleet::FleetMode;
use manifest_fleet::model::{DiscoveredRepo, FleetDescriptor};
use manifest_fleet::output::{emoji, render, spinner, OutputConfig, OutputFormat};
use manifest_fleet::reconcile::{reconcile, render_fragments, ReconciliationReport, Status};
use manifest_fleet::suggestions;

use super::status::print_table;
use super::{Context, ScanArgs};

/// Find repositories on disk and compare them with the fleet document
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Print fleet document entries for newly discovered repositories
    #[arg(long, conflicts_with_all = ["tree", "no_fleet"])]
    pub fragment: bool,

    /// List discovered repositories without reading the fleet document
    #[arg(long)]
    pub no_fleet: bool,

    /// Render repositories as a tree nested by path
    #[arg(long)]
    pub tree: bool,

    /// Exit with an error when the fleet document is out of date
    #[arg(long, conflicts_with = "no_fleet")]
    pub check: bool,
}

/// Execute the `discover` command.
pub fn execute(args: DiscoverArgs, ctx: &Context) -> Result<()> {
    let mode = args.no_fleet.then_some(FleetMode::Disabled);
    let workspace = ctx.resolve(Some(&args.scan), mode)?;

    let options = DiscoveryOptions::from(&workspace.settings);
    let inspector = args.scan.inspector();

    let message = format!("Scanning {}...", workspace.root.display());
    let progress = if args.format.is_machine_readable() {
        None
    } else {
        spinner(&ctx.out, &message)
    };
    let found = discover(&workspace.root, &options, inspector.as_ref());
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let repos = found.map_err(suggestions::from_library)?;

    let Some(fleet) = &workspace.fleet else {
        if args.check || args.fragment {
            return Err(suggestions::fleet_required("discover --check/--fragment"));
        }
        return report_discoveries(&args, &ctx.out, &repos);
    };

    let report = reconcile(&repos, fleet);

    if args.fragment {
        let fragments = render_fragments(&report.entries);
        if fragments.is_empty() {
            eprintln!("{} No new repositories", emoji(&ctx.out, "✅", "[OK]"));
        } else {
            print!("{}", fragments);
        }
    } else if let Some(text) = render(args.format, &report)? {
        println!("{}", text.trim_end());
    } else if args.tree {
        print_tree(&reconciled_tree(fleet, &report))
            .map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    } else {
        print_report(&ctx.out, &report);
    }

    if args.check && report.has_drift() {
        return Err(suggestions::drift_detected(&report.summary()));
    }
    Ok(())
}

fn report_discoveries(args: &DiscoverArgs, out: &OutputConfig, repos: &[DiscoveredRepo]) -> Result<()> {
    if let Some(text) = render(args.format, &repos)? {
        println!("{}", text.trim_end());
        return Ok(());
    }
    if args.tree {
        let mut root = TreeNode::new(".".to_string(), String::new());
        for repo in repos {
            root.insert(TreeNode::new(repo_label(repo), repo.relative_path.clone()));
        }
        print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
        return Ok(());
    }

    if repos.is_empty() {
        println!("{} No repositories found", emoji(out, "ℹ️", "[INFO]"));
        return Ok(());
    }
    println!(
        "{} Found {} repositories:",
        emoji(out, "🔍", "[SCAN]"),
        repos.len()
    );
    let rows: Vec<[String; 5]> = repos
        .iter()
        .map(|repo| {
            [
                repo.name.clone(),
                repo.relative_path.clone(),
                repo.service_type.to_string(),
                repo.branch.clone(),
                repo.version.clone(),
            ]
        })
        .collect();
    print_table(&["NAME", "PATH", "TYPE", "BRANCH", "VERSION"], &rows);
    Ok(())
}

fn print_report(out: &OutputConfig, report: &ReconciliationReport) {
    let groups = [
        (Status::New, emoji(out, "🆕", "[NEW]")),
        (Status::Missing, emoji(out, "❓", "[MISSING]")),
        (Status::Changed, emoji(out, "✏️", "[CHANGED]")),
        (Status::Unchanged, emoji(out, "✅", "[OK]")),
    ];
    for (status, marker) in groups {
        for entry in report.with_status(status) {
            let detail = if entry.changes.is_empty() {
                String::new()
            } else {
                format!(" ({})", entry.changes.join(", "))
            };
            println!("{} {} {}{}", marker, entry.name, entry.relative_path, detail);
            for note in &entry.notes {
                println!("   note: {}", note);
            }
        }
    }

    println!();
    println!("Summary: {}", report.summary());
    if report.count(Status::New) > 0 {
        println!("   Run 'manifest-fleet discover --fragment' to print entries for new repositories");
    }
}

fn repo_label(repo: &DiscoveredRepo) -> String {
    let mut label = format!("{} [{}] {}", repo.name, repo.service_type, repo.version);
    if repo.is_submodule {
        label.push_str(" (submodule)");
    }
    label
}

fn reconciled_tree(fleet: &FleetDescriptor, report: &ReconciliationReport) -> TreeNode {
    let mut root = TreeNode::new(fleet.name.clone(), String::new());
    for entry in &report.entries {
        let label = match &entry.discovered {
            Some(repo) => format!("{} ({})", repo_label(repo), entry.status),
            None => format!("{} ({})", entry.name, entry.status),
        };
        root.insert(TreeNode::new(label, entry.relative_path.clone()));
    }
    root
}

/// A repository in the rendered tree, keyed by its relative path.
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    path: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(label: String, path: String) -> Self {
        Self {
            label,
            path,
            children: Vec::new(),
        }
    }

    /// Attach `node` under the deepest child whose path contains it.
    /// Callers insert in path order so parents precede nested repositories.
    fn insert(&mut self, node: TreeNode) {
        let parent = self.children.iter_mut().find(|child| {
            node.path
                .strip_prefix(child.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        });
        match parent {
            Some(parent) => parent.insert(node),
            None => self.children.push(node),
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &ptree::Style) -> io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
