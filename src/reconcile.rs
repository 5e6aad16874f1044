//! # Reconciliation Engine
//!
//! Compares what the fleet document declares with what discovery found on
//! disk. Both sides are keyed by path relative to the fleet root.
//!
//! | Discovered | Declared | Status      |
//! |------------|----------|-------------|
//! | yes        | no       | `new`       |
//! | no         | yes      | `missing`   |
//! | yes        | yes      | `changed` when name or type differ, else `unchanged` |
//!
//! Branch and remote differences never make an entry `changed`; they are
//! attached as notes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fmt::Write as _;

use serde::Serialize;

use crate::model::{DiscoveredRepo, FleetDescriptor, ServiceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    New,
    Missing,
    Changed,
    Unchanged,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::New => "new",
            Status::Missing => "missing",
            Status::Changed => "changed",
            Status::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationEntry {
    pub status: Status,
    pub relative_path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared: Option<ServiceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered: Option<DiscoveredRepo>,
    /// Fields that make a `changed` entry differ.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
    /// Informational drift that does not affect the status.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub entries: Vec<ReconciliationEntry>,
}

impl ReconciliationReport {
    pub fn count(&self, status: Status) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &ReconciliationEntry> {
        self.entries.iter().filter(move |e| e.status == status)
    }

    /// True when anything is new, missing or changed.
    pub fn has_drift(&self) -> bool {
        self.entries.iter().any(|e| e.status != Status::Unchanged)
    }

    /// One-line count summary, e.g. `2 new, 0 missing, 1 changed, 5 unchanged`.
    pub fn summary(&self) -> String {
        format!(
            "{} new, {} missing, {} changed, {} unchanged",
            self.count(Status::New),
            self.count(Status::Missing),
            self.count(Status::Changed),
            self.count(Status::Unchanged)
        )
    }
}

/// Reconcile `discovered` against `fleet`.
///
/// `discovered` paths must be relative to `fleet.root`. Entries come back
/// sorted by relative path.
pub fn reconcile(discovered: &[DiscoveredRepo], fleet: &FleetDescriptor) -> ReconciliationReport {
    let mut declared: HashMap<String, &ServiceRecord> = fleet
        .services
        .values()
        .map(|service| (fleet.relative_path(service), service))
        .collect();

    let mut entries = Vec::with_capacity(discovered.len() + declared.len());
    for repo in discovered {
        let entry = match declared.remove(&repo.relative_path) {
            None => ReconciliationEntry {
                status: Status::New,
                relative_path: repo.relative_path.clone(),
                name: repo.name.clone(),
                declared: None,
                discovered: Some(repo.clone()),
                changes: Vec::new(),
                notes: Vec::new(),
            },
            Some(service) => {
                let changes = identity_changes(service, repo);
                ReconciliationEntry {
                    status: if changes.is_empty() {
                        Status::Unchanged
                    } else {
                        Status::Changed
                    },
                    relative_path: repo.relative_path.clone(),
                    name: service.name.clone(),
                    declared: Some(service.clone()),
                    discovered: Some(repo.clone()),
                    changes,
                    notes: drift_notes(service, repo),
                }
            }
        };
        entries.push(entry);
    }

    for (relative_path, service) in declared {
        entries.push(ReconciliationEntry {
            status: Status::Missing,
            relative_path,
            name: service.name.clone(),
            declared: Some(service.clone()),
            discovered: None,
            changes: Vec::new(),
            notes: Vec::new(),
        });
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    ReconciliationReport { entries }
}

fn identity_changes(service: &ServiceRecord, repo: &DiscoveredRepo) -> Vec<String> {
    let mut changes = Vec::new();
    if service.name != repo.name {
        changes.push(format!(
            "name: declared '{}', discovered '{}'",
            service.name, repo.name
        ));
    }
    if service.service_type != repo.service_type {
        changes.push(format!(
            "type: declared {}, discovered {}",
            service.service_type, repo.service_type
        ));
    }
    changes
}

fn drift_notes(service: &ServiceRecord, repo: &DiscoveredRepo) -> Vec<String> {
    let mut notes = Vec::new();
    if service.branch != repo.branch {
        notes.push(format!(
            "branch: declared {}, detected {}",
            service.branch, repo.branch
        ));
    }
    if let (Some(declared), Some(detected)) = (&service.remote_url, &repo.remote_url) {
        if declared != detected {
            notes.push(format!("url: declared {}, detected {}", declared, detected));
        }
    }
    notes
}

/// Service blocks for every `new` entry, indented to sit under the
/// document's `services:` mapping so they can be appended to a document
/// that ends with it. Returns an empty string when nothing is new.
pub fn render_fragments(entries: &[ReconciliationEntry]) -> String {
    let mut new: Vec<&DiscoveredRepo> = entries
        .iter()
        .filter(|e| e.status == Status::New)
        .filter_map(|e| e.discovered.as_ref())
        .collect();
    if new.is_empty() {
        return String::new();
    }
    new.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    let mut used: BTreeSet<String> = entries
        .iter()
        .filter(|e| e.status != Status::New)
        .map(|e| e.name.clone())
        .collect();

    let mut out = String::new();
    for repo in new {
        let key = unique_key(&repo.name, &mut used);
        // writing to a String cannot fail
        let _ = writeln!(out, "  {}:", yaml_scalar(&key));
        let _ = writeln!(out, "    path: {}", yaml_scalar(&repo.relative_path));
        if let Some(url) = &repo.remote_url {
            let _ = writeln!(out, "    url: {}", yaml_scalar(url));
        }
        let _ = writeln!(out, "    type: {}", repo.service_type);
        let _ = writeln!(out, "    branch: {}", yaml_scalar(&repo.branch));
        let _ = writeln!(out, "    submodule: {}", repo.is_submodule);
        let _ = writeln!(out, "    # discovered version: {}", repo.version);
    }
    out
}

fn unique_key(name: &str, used: &mut BTreeSet<String>) -> String {
    let mut key = name.to_string();
    let mut n = 2;
    while used.contains(&key) {
        key = format!("{}-{}", name, n);
        n += 1;
    }
    used.insert(key.clone());
    key
}

/// Quote a scalar when plain YAML would misread it.
fn yaml_scalar(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.starts_with(|c: char| "!&*-?{}[],#|>@`\"'%: ".contains(c))
        || matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "null" | "~" | "on" | "off"
        );
    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}
