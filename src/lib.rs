//! # Manifest Fleet Library
//!
//! This library resolves and discovers the repositories that make up a
//! polyrepo "fleet". It is designed to be used by the `manifest-fleet`
//! command-line tool but can also be embedded in release tooling that needs
//! to know which repositories belong together.
//!
//! ## Quick Example
//!
//! ```no_run
//! use std::path::Path;
//! use manifest_fleet::discovery::{discover, DiscoveryOptions};
//! use manifest_fleet::fleet::{resolve_workspace, ResolveOptions};
//! use manifest_fleet::git::GitDirInspector;
//! use manifest_fleet::reconcile::reconcile;
//!
//! let options = ResolveOptions {
//!     start_dir: Path::new("/work/platform").to_path_buf(),
//!     ..Default::default()
//! };
//! let workspace = resolve_workspace(&options).unwrap();
//! let found = discover(
//!     &workspace.root,
//!     &DiscoveryOptions::from(&workspace.settings),
//!     &GitDirInspector,
//! )
//! .unwrap();
//!
//! if let Some(fleet) = &workspace.fleet {
//!     let report = reconcile(&found, fleet);
//!     println!("{}", report.summary());
//! }
//! ```
//!
//! ## Core Concepts
//!
//! - **Document access (`document`)**: `get_value` / `list_map_keys` over the
//!   declarative fleet document, backed by a memoized parser capability that
//!   degrades gracefully.
//! - **Resolution (`settings`, `fleet`)**: layers defaults, user and workspace
//!   key/value files, the fleet document, per-service overrides and CLI flags
//!   into one [`model::FleetDescriptor`].
//! - **Discovery (`discovery`, `git`)**: a bounded, parallel walk that finds
//!   git repositories on disk and classifies them. It never reads the fleet
//!   document.
//! - **Reconciliation (`reconcile`, `validate`)**: diffs the two views into
//!   new / missing / changed / unchanged entries, renders document fragments
//!   for new repositories, and validates declarations.
//!
//! Every operation is read-only except `init` in the CLI, which writes a new
//! fleet document.

pub mod defaults;
pub mod discovery;
pub mod document;
pub mod error;
pub mod fleet;
pub mod git;
pub mod model;
pub mod output;
pub mod reconcile;
pub mod settings;
pub mod suggestions;
pub mod validate;
