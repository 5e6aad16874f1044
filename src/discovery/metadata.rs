//! Version detection for discovered repositories.
//!
//! Sources are tried in order and the first non-empty answer wins:
//! `VERSION` file, package manifests, release tags, then `0.0.0`.

use std::fs;
use std::path::Path;

use log::debug;

use crate::defaults;
use crate::git::RepoInspector;

type ManifestReader = fn(&str) -> Option<String>;

/// Manifest files and how to pull a version out of each.
const MANIFESTS: &[(&str, ManifestReader)] = &[
    ("package.json", package_json_version),
    ("Cargo.toml", cargo_version),
    ("pyproject.toml", pyproject_version),
];

/// Best-effort version of the repository at `dir`.
pub fn detect_version(dir: &Path, inspector: &dyn RepoInspector) -> String {
    version_file(dir)
        .or_else(|| manifest_version(dir))
        .or_else(|| inspector.latest_release_tag(dir))
        .unwrap_or_else(|| defaults::UNKNOWN_VERSION.to_string())
}

fn version_file(dir: &Path) -> Option<String> {
    let content = fs::read_to_string(dir.join(defaults::DEFAULT_VERSION_FILENAME)).ok()?;
    let version = content.trim();
    (!version.is_empty()).then(|| version.to_string())
}

fn manifest_version(dir: &Path) -> Option<String> {
    MANIFESTS.iter().find_map(|(file, read)| {
        let content = fs::read_to_string(dir.join(file)).ok()?;
        let version = read(&content);
        if version.is_none() {
            debug!("No usable version in {}", dir.join(file).display());
        }
        version
    })
}

fn package_json_version(content: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    non_empty(value.get("version")?.as_str()?)
}

fn cargo_version(content: &str) -> Option<String> {
    let value: toml::Value = toml::from_str(content).ok()?;
    let direct = value
        .get("package")
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str());
    let workspace = || {
        value
            .get("workspace")
            .and_then(|w| w.get("package"))
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_str())
    };
    non_empty(direct.or_else(workspace)?)
}

fn pyproject_version(content: &str) -> Option<String> {
    let value: toml::Value = toml::from_str(content).ok()?;
    let project = value
        .get("project")
        .and_then(|p| p.get("version"))
        .and_then(|v| v.as_str());
    let poetry = || {
        value
            .get("tool")
            .and_then(|t| t.get("poetry"))
            .and_then(|p| p.get("version"))
            .and_then(|v| v.as_str())
    };
    non_empty(project.or_else(poetry)?)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Inspector with a fixed tag and no other knowledge.
    struct TagOnly(Option<&'static str>);

    impl RepoInspector for TagOnly {
        fn remote_url(&self, _repo: &Path) -> Option<String> {
            None
        }
        fn remote_head(&self, _repo: &Path) -> Option<String> {
            None
        }
        fn has_local_branch(&self, _repo: &Path, _branch: &str) -> bool {
            false
        }
        fn current_branch(&self, _repo: &Path) -> Option<String> {
            None
        }
        fn latest_release_tag(&self, _repo: &Path) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_version_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("VERSION"), "3.1.4\n").unwrap();
        fs::write(dir.path().join("package.json"), r#"{"version": "1.0.0"}"#).unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(Some("9.9.9"))), "3.1.4");
    }

    #[test]
    fn test_manifest_versions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "web", "version": "2.0.1"}"#)
            .unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(None)), "2.0.1");

        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[workspace]\nmembers = []\n\n[workspace.package]\nversion = \"0.4.2\"\n",
        )
        .unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(None)), "0.4.2");

        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.poetry]\nname = \"etl\"\nversion = \"1.7.0\"\n",
        )
        .unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(None)), "1.7.0");
    }

    #[test]
    fn test_inherited_cargo_version_falls_through_to_tags() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"x\"\nversion.workspace = true\n",
        )
        .unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(Some("1.2.3"))), "1.2.3");
    }

    #[test]
    fn test_unparseable_manifests_fall_through() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package\nversion = ").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[project]\nversion = \"2.0.0\"\n").unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(None)), "2.0.0");

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pyproject.toml"), "version = = 1").unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(Some("0.9.0"))), "0.9.0");
    }

    #[test]
    fn test_unknown_version_sentinel() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "not json").unwrap();
        assert_eq!(detect_version(dir.path(), &TagOnly(None)), "0.0.0");
    }
}
