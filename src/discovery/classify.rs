//! Heuristic repository classification.
//!
//! Rules are evaluated in table order and the first rule with a matching
//! marker wins. Repositories nothing matches are services.

use std::fs;
use std::path::Path;

use glob::Pattern;

use crate::error::Result;
use crate::model::ServiceType;

/// Something observable about a repository directory.
#[derive(Debug, Clone, Copy)]
pub enum Marker {
    /// A top-level subdirectory with this exact name.
    Dir(&'static str),
    /// A top-level file with this exact name.
    File(&'static str),
    /// A top-level file matching this glob.
    FileGlob(&'static str),
    /// The cleaned directory name starts with this.
    Prefix(&'static str),
    /// The cleaned directory name ends with this.
    Suffix(&'static str),
}

#[derive(Debug)]
pub struct Rule {
    pub service_type: ServiceType,
    pub markers: &'static [Marker],
}

pub const RULES: &[Rule] = &[
    Rule {
        service_type: ServiceType::Infrastructure,
        markers: &[
            Marker::Dir("terraform"),
            Marker::Dir("pulumi"),
            Marker::Dir("ansible"),
            Marker::Dir("cloudformation"),
            Marker::Dir("cdk"),
            Marker::File("main.tf"),
            Marker::File("Pulumi.yaml"),
            Marker::File("ansible.cfg"),
            Marker::File("cdk.json"),
            Marker::FileGlob("*.tf"),
        ],
    },
    Rule {
        service_type: ServiceType::Library,
        markers: &[
            Marker::Prefix("lib-"),
            Marker::Prefix("shared-"),
            Marker::Prefix("common-"),
            Marker::Suffix("-lib"),
            Marker::Suffix("-library"),
            Marker::Suffix("-sdk"),
            Marker::Suffix("-shared"),
            Marker::Suffix("-common"),
        ],
    },
    Rule {
        service_type: ServiceType::Tool,
        markers: &[
            Marker::Dir("cmd"),
            Marker::Suffix("-cli"),
            Marker::Suffix("-tool"),
            Marker::Suffix("-tools"),
        ],
    },
    Rule {
        service_type: ServiceType::Service,
        markers: &[
            Marker::File("Dockerfile"),
            Marker::File("docker-compose.yml"),
            Marker::File("docker-compose.yaml"),
            Marker::File("compose.yaml"),
            Marker::Dir("k8s"),
            Marker::Dir("api"),
            Marker::Dir("src"),
            Marker::Dir("server"),
            Marker::Suffix("-service"),
            Marker::Suffix("-svc"),
            Marker::Suffix("-api"),
        ],
    },
];

/// Top-level contents of a directory, read once per classification.
struct Listing {
    files: Vec<String>,
    dirs: Vec<String>,
}

impl Listing {
    fn read(dir: &Path) -> Self {
        let mut listing = Listing {
            files: Vec::new(),
            dirs: Vec::new(),
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return listing;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.file_type() {
                Ok(t) if t.is_dir() => listing.dirs.push(name),
                Ok(_) => listing.files.push(name),
                Err(_) => {}
            }
        }
        listing
    }
}

fn matches(marker: &Marker, name: &str, listing: &Listing) -> Result<bool> {
    Ok(match *marker {
        Marker::Dir(d) => listing.dirs.iter().any(|n| n == d),
        Marker::File(f) => listing.files.iter().any(|n| n == f),
        Marker::FileGlob(g) => {
            let pattern = Pattern::new(g)?;
            listing.files.iter().any(|n| pattern.matches(n))
        }
        Marker::Prefix(p) => name.starts_with(p),
        Marker::Suffix(s) => name.ends_with(s),
    })
}

/// Classify the repository at `dir`, whose cleaned basename is `name`.
pub fn classify(dir: &Path, name: &str) -> Result<ServiceType> {
    let listing = Listing::read(dir);
    for rule in RULES {
        for marker in rule.markers {
            if matches(marker, name, &listing)? {
                return Ok(rule.service_type);
            }
        }
    }
    Ok(ServiceType::default())
}
