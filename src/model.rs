//! # Fleet Data Model
//!
//! Types shared by the resolver, the discovery engine and reconciliation.
//!
//! - [`FleetDescriptor`]: the resolved view of one workspace's fleet document.
//! - [`ServiceRecord`]: one declared fleet member, owned by its descriptor.
//! - [`DiscoveredRepo`]: one repository found on disk, independent of the
//!   document.
//!
//! All of these are built fresh for each command invocation and never
//! mutated once constructed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Probable role of a repository within the fleet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Service,
    Library,
    Infrastructure,
    Tool,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Service => "service",
            ServiceType::Library => "library",
            ServiceType::Infrastructure => "infrastructure",
            ServiceType::Tool => "tool",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(ServiceType::Service),
            "library" | "lib" => Ok(ServiceType::Library),
            "infrastructure" | "infra" => Ok(ServiceType::Infrastructure),
            "tool" => Ok(ServiceType::Tool),
            other => Err(Error::InvalidValue {
                field: "type".to_string(),
                value: other.to_string(),
                context: None,
            }),
        }
    }
}

/// How the fleet-level version is managed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningMode {
    #[default]
    None,
    Date,
    Semver,
    Increment,
}

impl VersioningMode {
    pub fn as_str(self) -> &'static str {
        match self {
            VersioningMode::None => "none",
            VersioningMode::Date => "date",
            VersioningMode::Semver => "semver",
            VersioningMode::Increment => "increment",
        }
    }
}

impl fmt::Display for VersioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersioningMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(VersioningMode::None),
            "date" => Ok(VersioningMode::Date),
            "semver" => Ok(VersioningMode::Semver),
            "increment" => Ok(VersioningMode::Increment),
            other => Err(Error::InvalidValue {
                field: "versioning".to_string(),
                value: other.to_string(),
                context: None,
            }),
        }
    }
}

/// One declared fleet member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    /// Absolute checkout path. `None` only for remote-only declarations.
    pub path: Option<PathBuf>,
    pub remote_url: Option<String>,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub branch: String,
    pub is_submodule: bool,
    pub excluded_from_bump: bool,
    pub team: Option<String>,
    pub description: Option<String>,
}

impl ServiceRecord {
    /// Where the service lives, or would be cloned to.
    pub fn checkout_path(&self, fleet_root: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| fleet_root.join(&self.name))
    }

    /// Generic access to a field by its document name.
    ///
    /// Returns `None` for unknown fields and for unset optional fields.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "path" => self.path.as_ref().map(|p| p.display().to_string()),
            "url" | "remote_url" => self.remote_url.clone(),
            "type" => Some(self.service_type.to_string()),
            "branch" => Some(self.branch.clone()),
            "submodule" | "is_submodule" => Some(self.is_submodule.to_string()),
            "exclude_from_bump" | "excluded_from_bump" => {
                Some(self.excluded_from_bump.to_string())
            }
            "team" => self.team.clone(),
            "description" => self.description.clone(),
            _ => None,
        }
    }
}

/// The resolved fleet for one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub versioning: VersioningMode,
    pub current_version: Option<String>,
    pub root: PathBuf,
    pub document: PathBuf,
    pub default_branch: String,
    pub services: BTreeMap<String, ServiceRecord>,
}

impl FleetDescriptor {
    /// A descriptor with no services, rooted at `root`.
    pub fn empty(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            name: name.into(),
            description: None,
            versioning: VersioningMode::None,
            current_version: None,
            document: root.join(crate::defaults::DEFAULT_DOCUMENT_FILENAME),
            root,
            default_branch: crate::defaults::DEFAULT_BRANCH.to_string(),
            services: BTreeMap::new(),
        }
    }

    /// Path of `service` relative to the fleet root, with forward slashes.
    ///
    /// Paths outside the root are returned as-is.
    pub fn relative_path(&self, service: &ServiceRecord) -> String {
        let path = service.checkout_path(&self.root);
        relative_display(&self.root, &path)
    }
}

/// One repository found on disk by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredRepo {
    pub name: String,
    pub relative_path: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub branch: String,
    pub version: String,
    pub remote_url: Option<String>,
    pub is_submodule: bool,
    pub depth: usize,
}

/// Render `path` relative to `base` using forward slashes.
pub fn relative_display(base: &Path, path: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}
