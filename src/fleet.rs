//! # Configuration Resolver
//!
//! Turns a workspace into a [`FleetDescriptor`]:
//!
//! 1. [`locate_fleet_root`] finds the directory holding the fleet document,
//!    walking up from the current directory a bounded number of levels, or
//!    validating an explicit override.
//! 2. [`resolve_workspace`] layers settings (see [`crate::settings`]) and, when
//!    a fleet is present, calls [`resolve`].
//! 3. [`resolve`] reads `fleet.*` and `services.*` through a
//!    [`DocumentReader`], applies per-service overrides and reads the version
//!    file.
//!
//! Resolving the same inputs twice yields identical descriptors.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};

use crate::defaults;
use crate::discovery::naming::clean_name;
use crate::document::query::child_query;
use crate::document::{DocumentReader, ParserCapability};
use crate::error::{Error, Result};
use crate::model::{FleetDescriptor, ServiceRecord, ServiceType, VersioningMode};
use crate::settings::{parse_bool, ServiceOverride, Settings, SettingsOverrides};

/// Whether the fleet document is required, optional, or ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FleetMode {
    /// Use the fleet when a document is found, otherwise run without one.
    #[default]
    Auto,
    /// A fleet document is required.
    Required,
    /// Never look for a fleet document.
    Disabled,
}

impl FromStr for FleetMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(FleetMode::Auto),
            "true" | "on" | "required" => Ok(FleetMode::Required),
            "false" | "off" | "disabled" => Ok(FleetMode::Disabled),
            other => Err(format!(
                "unknown fleet mode '{}' (expected auto, true or false)",
                other
            )),
        }
    }
}

impl fmt::Display for FleetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FleetMode::Auto => "auto",
            FleetMode::Required => "true",
            FleetMode::Disabled => "false",
        };
        f.write_str(name)
    }
}

/// Find the directory that contains `document_filename`.
///
/// With `explicit_root`, that directory is used verbatim: it must exist and
/// must contain the document. Otherwise `start` and at most `max_ancestors`
/// of its parents are checked, nearest first. Returns `Ok(None)` when no
/// document is found.
pub fn locate_fleet_root(
    start: &Path,
    document_filename: &str,
    max_ancestors: usize,
    explicit_root: Option<&Path>,
) -> Result<Option<PathBuf>> {
    if let Some(root) = explicit_root {
        if !root.is_dir() {
            return Err(Error::FleetRootNotFound {
                path: root.to_path_buf(),
            });
        }
        let document = root.join(document_filename);
        if !document.is_file() {
            return Err(Error::DocumentNotFound {
                path: document,
                hint: Some("Run 'manifest-fleet init' in the fleet root to create one".to_string()),
            });
        }
        return Ok(Some(root.to_path_buf()));
    }

    for dir in start.ancestors().take(max_ancestors + 1) {
        if dir.join(document_filename).is_file() {
            debug!("Found fleet document in {}", dir.display());
            return Ok(Some(dir.to_path_buf()));
        }
    }

    debug!(
        "No {} within {} levels above {}",
        document_filename,
        max_ancestors,
        start.display()
    );
    Ok(None)
}

/// Inputs of a full workspace resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Directory the search starts from, normally the current directory.
    pub start_dir: PathBuf,
    pub fleet_root: Option<PathBuf>,
    pub mode: FleetMode,
    pub user_config: Option<PathBuf>,
    pub overrides: SettingsOverrides,
}

/// The outcome of resolving a workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// The fleet root when a fleet was resolved, otherwise the start directory.
    pub root: PathBuf,
    pub settings: Settings,
    pub fleet: Option<FleetDescriptor>,
    /// Parser backend that read the document, when one was read.
    pub capability: Option<ParserCapability>,
}

/// Layer settings and resolve the fleet according to `options.mode`.
///
/// The document is read with the parser preference from the layered
/// settings.
pub fn resolve_workspace(options: &ResolveOptions) -> Result<Workspace> {
    let settings = Settings::load(options.user_config.as_deref(), &options.overrides)?;

    if options.mode == FleetMode::Disabled {
        info!("Fleet mode disabled, skipping fleet resolution");
        let settings = settings.with_workspace(&options.start_dir, &options.overrides)?;
        return Ok(Workspace {
            root: options.start_dir.clone(),
            settings,
            fleet: None,
            capability: None,
        });
    }

    let located = locate_fleet_root(
        &options.start_dir,
        &settings.document_filename,
        settings.root_search_depth,
        options.fleet_root.as_deref(),
    )?;

    let Some(root) = located else {
        if options.mode == FleetMode::Required {
            return Err(Error::DocumentNotFound {
                path: options.start_dir.join(&settings.document_filename),
                hint: Some(format!(
                    "No {} found in this directory or its {} parents",
                    settings.document_filename, settings.root_search_depth
                )),
            });
        }
        debug!("No fleet found, continuing without one");
        let settings = settings.with_workspace(&options.start_dir, &options.overrides)?;
        return Ok(Workspace {
            root: options.start_dir.clone(),
            settings,
            fleet: None,
            capability: None,
        });
    };

    let settings = settings.with_workspace(&root, &options.overrides)?;
    let document = root.join(&settings.document_filename);
    let reader = DocumentReader::new(settings.parser);
    let fleet = resolve(&root, &document, &settings, &reader)?;
    Ok(Workspace {
        root,
        settings,
        fleet: Some(fleet),
        capability: Some(reader.capability()),
    })
}

/// Resolve the fleet document at `document` into a descriptor.
pub fn resolve(
    root: &Path,
    document: &Path,
    settings: &Settings,
    reader: &DocumentReader,
) -> Result<FleetDescriptor> {
    let get = |query: &str, default: &str| reader.get_value(document, query, default);
    let optional = |query: &str| -> Result<Option<String>> {
        let value = get(query, "")?;
        Ok(if value.trim().is_empty() {
            None
        } else {
            Some(value)
        })
    };

    let name = match optional("fleet.name")? {
        Some(name) => name,
        None => fallback_fleet_name(root),
    };
    let versioning: VersioningMode = get("fleet.versioning", settings.versioning_mode.as_str())?
        .parse()
        .map_err(|e| with_context(e, "fleet"))?;
    let default_branch = get("fleet.default_branch", &settings.default_branch)?;

    let current_version = if versioning == VersioningMode::None {
        None
    } else {
        let file = get("fleet.version_file", defaults::DEFAULT_VERSION_FILENAME)?;
        read_version_file(&root.join(file))
    };

    let mut services = BTreeMap::new();
    let names = reader.list_map_keys(document, "services")?;
    if names.is_empty() {
        warn!(
            "NoServicesDeclared: {} declares no services",
            document.display()
        );
    }
    for service_name in names {
        let record = resolve_service(root, document, &service_name, &default_branch, reader)?;
        services.insert(service_name, record);
    }

    Ok(FleetDescriptor {
        name,
        description: optional("fleet.description")?,
        versioning,
        current_version,
        root: root.to_path_buf(),
        document: document.to_path_buf(),
        default_branch,
        services,
    })
}

fn resolve_service(
    root: &Path,
    document: &Path,
    name: &str,
    default_branch: &str,
    reader: &DocumentReader,
) -> Result<ServiceRecord> {
    let base = child_query("services", name);
    let field = |key: &str| -> Result<Option<String>> {
        let value = reader.get_value(document, &child_query(&base, key), "")?;
        Ok(if value.trim().is_empty() {
            None
        } else {
            Some(value.trim().to_string())
        })
    };
    let flag = |key: &str| -> Result<bool> {
        Ok(field(key)?.and_then(|v| parse_bool(&v)).unwrap_or(false))
    };

    let service_type = match field("type")? {
        Some(value) => value
            .parse::<ServiceType>()
            .map_err(|e| with_context(e, &format!("service '{}'", name)))?,
        None => ServiceType::default(),
    };

    let mut record = ServiceRecord {
        name: name.to_string(),
        path: field("path")?.map(|p| root.join(p)),
        remote_url: field("url")?,
        service_type,
        branch: field("branch")?.unwrap_or_else(|| default_branch.to_string()),
        is_submodule: flag("submodule")?,
        excluded_from_bump: flag("exclude_from_bump")?,
        team: field("team")?,
        description: field("description")?,
    };

    let checkout = record.checkout_path(root);
    if checkout.is_dir() {
        let local = ServiceOverride::load(&checkout)?;
        if !local.is_empty() {
            debug!("Applying service override for {}", name);
            apply_service_override(&mut record, local);
        }
    }

    Ok(record)
}

fn apply_service_override(record: &mut ServiceRecord, local: ServiceOverride) {
    if let Some(branch) = local.branch {
        record.branch = branch;
    }
    if let Some(service_type) = local.service_type {
        record.service_type = service_type;
    }
    if let Some(team) = local.team {
        record.team = Some(team);
    }
    if let Some(excluded) = local.excluded_from_bump {
        record.excluded_from_bump = excluded;
    }
}

fn fallback_fleet_name(root: &Path) -> String {
    let cleaned = root
        .file_name()
        .map(|n| clean_name(&n.to_string_lossy()))
        .unwrap_or_default();
    if cleaned.is_empty() {
        defaults::DEFAULT_FLEET_NAME.to_string()
    } else {
        cleaned
    }
}

fn read_version_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let version = content.trim();
            (!version.is_empty()).then(|| version.to_string())
        }
        Err(e) => {
            warn!("Could not read version file {}: {}", path.display(), e);
            None
        }
    }
}

fn with_context(error: Error, context: &str) -> Error {
    match error {
        Error::InvalidValue { field, value, .. } => Error::InvalidValue {
            field,
            value,
            context: Some(context.to_string()),
        },
        other => other,
    }
}
