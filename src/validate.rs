//! # Fleet Validation
//!
//! Checks a resolved [`FleetDescriptor`] against the filesystem. Every
//! service is checked and all findings are collected before the caller
//! decides whether the run fails.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::git;
use crate::model::{FleetDescriptor, ServiceRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FindingKind {
    /// Neither `path` nor `url` is declared.
    InvalidServiceDeclaration,
    /// The declared path does not exist.
    PathNotFound,
    /// The declared path exists but holds no repository.
    NotAGitRepository,
    /// The remote is neither a URL nor an scp-style address.
    InvalidRemoteUrl,
    /// Several services share one checkout path.
    DuplicatePath,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub service: String,
    pub message: String,
}

impl Finding {
    fn error(kind: FindingKind, service: &str, message: String) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            service: service.to_string(),
            message,
        }
    }

    fn warning(kind: FindingKind, service: &str, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            service: service.to_string(),
            message,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub services_checked: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    /// No error-level findings.
    pub fn is_valid(&self) -> bool {
        !self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Warning)
    }

    /// Whether the run passes; strict mode also fails on warnings.
    pub fn passes(&self, strict: bool) -> bool {
        self.is_valid() && !(strict && self.has_warnings())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }
}

/// `user@host:path`, as accepted by git for SSH remotes.
static SCP_REMOTE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+:[A-Za-z0-9._/~-]+$").ok());

/// Whether git could plausibly use `remote` as a remote address.
pub fn is_valid_remote(remote: &str) -> bool {
    let remote = remote.trim();
    if remote.is_empty() {
        return false;
    }
    if remote.starts_with('/') || remote.starts_with("./") || remote.starts_with("../") {
        return true;
    }
    if let Ok(url) = Url::parse(remote) {
        return matches!(url.scheme(), "https" | "http" | "ssh" | "git" | "file")
            && (url.scheme() == "file" || url.host_str().is_some());
    }
    SCP_REMOTE
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(remote))
}

/// Validate every service of `fleet`.
pub fn validate(fleet: &FleetDescriptor) -> ValidationReport {
    let mut findings = Vec::new();
    let mut by_path: BTreeMap<PathBuf, Vec<&str>> = BTreeMap::new();

    for service in fleet.services.values() {
        if service.path.is_none() && service.remote_url.is_none() {
            findings.push(Finding::error(
                FindingKind::InvalidServiceDeclaration,
                &service.name,
                "declares neither a path nor a url".to_string(),
            ));
            continue;
        }
        by_path
            .entry(service.checkout_path(&fleet.root))
            .or_default()
            .push(&service.name);

        check_path(fleet, service, &mut findings);

        if let Some(remote) = &service.remote_url {
            if !is_valid_remote(remote) {
                findings.push(Finding::warning(
                    FindingKind::InvalidRemoteUrl,
                    &service.name,
                    format!("url '{}' is not a recognizable git remote", remote),
                ));
            }
        }
    }

    for (path, names) in by_path {
        if names.len() > 1 {
            findings.push(Finding::error(
                FindingKind::DuplicatePath,
                names[0],
                format!(
                    "services {} all resolve to {}",
                    names.join(", "),
                    path.display()
                ),
            ));
        }
    }

    ValidationReport {
        services_checked: fleet.services.len(),
        findings,
    }
}

fn check_path(fleet: &FleetDescriptor, service: &ServiceRecord, findings: &mut Vec<Finding>) {
    let Some(path) = &service.path else {
        return;
    };
    let shown = fleet.relative_path(service);

    if !path.exists() {
        let message = format!("path {} does not exist", shown);
        if service.remote_url.is_some() {
            findings.push(Finding::warning(
                FindingKind::PathNotFound,
                &service.name,
                format!("{} (not cloned yet?)", message),
            ));
        } else {
            findings.push(Finding::error(FindingKind::PathNotFound, &service.name, message));
        }
        return;
    }

    if !service.is_submodule && !git::is_repository(path) {
        findings.push(Finding::warning(
            FindingKind::NotAGitRepository,
            &service.name,
            format!("path {} is not a git repository", shown),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceType;
    use std::fs;
    use tempfile::TempDir;

    fn service(name: &str, path: Option<&str>, url: Option<&str>, root: &std::path::Path) -> ServiceRecord {
        ServiceRecord {
            name: name.to_string(),
            path: path.map(|p| root.join(p)),
            remote_url: url.map(str::to_string),
            service_type: ServiceType::Service,
            branch: "main".to_string(),
            is_submodule: false,
            excluded_from_bump: false,
            team: None,
            description: None,
        }
    }

    fn fleet_with(root: &std::path::Path, services: Vec<ServiceRecord>) -> FleetDescriptor {
        let mut fleet = FleetDescriptor::empty("demo", root);
        for s in services {
            fleet.services.insert(s.name.clone(), s);
        }
        fleet
    }

    #[test]
    fn test_declaration_without_path_or_url_does_not_stop_validation() {
        let dir = TempDir::new().unwrap();
        let fleet = fleet_with(
            dir.path(),
            vec![
                service("broken", None, None, dir.path()),
                service("zeta", Some("zeta"), None, dir.path()),
            ],
        );
        let report = validate(&fleet);
        let invalid: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::InvalidServiceDeclaration)
            .collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].service, "broken");
        // later services are still checked
        assert!(report
            .findings
            .iter()
            .any(|f| f.service == "zeta" && f.kind == FindingKind::PathNotFound));
        assert!(!report.is_valid());
    }

    #[test]
    fn test_missing_path_severity_depends_on_url() {
        let dir = TempDir::new().unwrap();
        let fleet = fleet_with(
            dir.path(),
            vec![
                service("cloneable", Some("a"), Some("https://github.com/acme/a.git"), dir.path()),
                service("lost", Some("b"), None, dir.path()),
            ],
        );
        let report = validate(&fleet);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.errors().next().unwrap().service, "lost");
    }

    #[test]
    fn test_plain_directory_is_not_a_repository() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("plain")).unwrap();
        fs::create_dir_all(dir.path().join("repo/.git")).unwrap();
        let fleet = fleet_with(
            dir.path(),
            vec![
                service("plain", Some("plain"), None, dir.path()),
                service("repo", Some("repo"), None, dir.path()),
            ],
        );
        let report = validate(&fleet);
        assert!(report.is_valid());
        assert!(report.has_warnings());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::NotAGitRepository);
        assert!(report.passes(false));
        assert!(!report.passes(true));
    }

    #[test]
    fn test_submodule_without_marker_is_accepted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let mut sub = service("sub", Some("sub"), None, dir.path());
        sub.is_submodule = true;
        let report = validate(&fleet_with(dir.path(), vec![sub]));
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_duplicate_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("api/.git")).unwrap();
        let fleet = fleet_with(
            dir.path(),
            vec![
                service("api", None, Some("git@github.com:acme/api.git"), dir.path()),
                service("gateway", Some("api"), None, dir.path()),
            ],
        );
        let report = validate(&fleet);
        let dupes: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::DuplicatePath)
            .collect();
        assert_eq!(dupes.len(), 1);
        assert!(dupes[0].message.contains("api, gateway"));
    }

    #[test]
    fn test_remote_url_forms() {
        assert!(is_valid_remote("https://github.com/acme/api.git"));
        assert!(is_valid_remote("ssh://git@github.com/acme/api.git"));
        assert!(is_valid_remote("git@github.com:acme/api.git"));
        assert!(is_valid_remote("../api.git"));
        assert!(is_valid_remote("file:///srv/git/api.git"));
        assert!(!is_valid_remote("not a url"));
        assert!(!is_valid_remote("ftp://example.com/repo"));
        assert!(!is_valid_remote(""));
    }

    #[test]
    fn test_invalid_remote_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let fleet = fleet_with(
            dir.path(),
            vec![service("odd", None, Some("github acme api"), dir.path())],
        );
        let report = validate(&fleet);
        assert!(report.is_valid());
        assert_eq!(report.findings[0].kind, FindingKind::InvalidRemoteUrl);
    }
}
