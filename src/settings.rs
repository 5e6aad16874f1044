//! # Layered Settings
//!
//! Settings are assembled from several key/value sources. Each layer only
//! overwrites the keys it defines:
//!
//! 1. Compiled-in defaults ([`Settings::default`]).
//! 2. The user preference file (host-global).
//! 3. The workspace override file at the fleet root.
//! 4. Command-line flags ([`SettingsOverrides`]), applied last.
//!
//! The fleet document and per-service override files sit between layers 3
//! and 4; they are handled by [`crate::fleet`] because they shape the fleet
//! model rather than engine settings.
//!
//! Key/value files use INI syntax without sections:
//!
//! ```text
//! # ~/.config/manifest-fleet/config
//! default_branch = develop
//! search_depth = 3
//! parser = auto
//! ```

use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use log::{debug, warn};
use serde::Serialize;

use crate::defaults;
use crate::document::ParserPreference;
use crate::error::{Error, Result};
use crate::model::{ServiceType, VersioningMode};

/// Engine settings after layering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub default_branch: String,
    pub versioning_mode: VersioningMode,
    /// Maximum discovery depth below the workspace root.
    pub search_depth: usize,
    /// Maximum concurrent subtree walks during discovery.
    pub parallelism: usize,
    /// How many parent directories fleet-root detection may climb.
    pub root_search_depth: usize,
    pub parser: ParserPreference,
    pub include_submodules: bool,
    /// Keep descending into repositories to find nested ones.
    pub nested: bool,
    pub document_filename: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_branch: defaults::DEFAULT_BRANCH.to_string(),
            versioning_mode: VersioningMode::None,
            search_depth: defaults::DEFAULT_SEARCH_DEPTH,
            parallelism: defaults::DEFAULT_PARALLELISM,
            root_search_depth: defaults::DEFAULT_ROOT_SEARCH_DEPTH,
            parser: ParserPreference::Auto,
            include_submodules: true,
            nested: true,
            document_filename: defaults::DEFAULT_DOCUMENT_FILENAME.to_string(),
        }
    }
}

/// Values supplied on the command line. `None` leaves a setting untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub search_depth: Option<usize>,
    pub parallelism: Option<usize>,
    pub root_search_depth: Option<usize>,
    pub parser: Option<ParserPreference>,
    pub include_submodules: Option<bool>,
    pub nested: Option<bool>,
    pub document_filename: Option<String>,
}

impl Settings {
    /// Layer a key/value file over the current settings.
    ///
    /// A missing file is not an error; returns whether the file was applied.
    pub fn apply_file(&mut self, path: &Path) -> Result<bool> {
        let Some(pairs) = read_key_values(path)? else {
            debug!("No settings file at {}", path.display());
            return Ok(false);
        };
        let source = path.display().to_string();
        self.apply_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())), &source);
        debug!("Applied settings layer {}", source);
        Ok(true)
    }

    /// Layer raw key/value pairs. Unknown keys and bad values are skipped.
    pub fn apply_pairs<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>, source: &str) {
        for (key, value) in pairs {
            let value = value.trim();
            match key.trim() {
                "default_branch" | "branch" if !value.is_empty() => {
                    self.default_branch = value.to_string()
                }
                "versioning_mode" | "versioning" => match value.parse() {
                    Ok(mode) => self.versioning_mode = mode,
                    Err(e) => warn!("Ignoring {} in {}: {}", key, source, e),
                },
                "search_depth" => self.set_usize(key, value, source, |s, v| s.search_depth = v),
                "parallelism" => self.set_usize(key, value, source, |s, v| {
                    s.parallelism = v.max(1)
                }),
                "root_search_depth" => {
                    self.set_usize(key, value, source, |s, v| s.root_search_depth = v)
                }
                "parser" => match value.parse() {
                    Ok(parser) => self.parser = parser,
                    Err(e) => warn!("Ignoring {} in {}: {}", key, source, e),
                },
                "include_submodules" => match parse_bool(value) {
                    Some(b) => self.include_submodules = b,
                    None => warn!("Ignoring {} in {}: '{}' is not a boolean", key, source, value),
                },
                "nested" => match parse_bool(value) {
                    Some(b) => self.nested = b,
                    None => warn!("Ignoring {} in {}: '{}' is not a boolean", key, source, value),
                },
                "document" if !value.is_empty() => self.document_filename = value.to_string(),
                other => debug!("Unknown setting '{}' in {}", other, source),
            }
        }
    }

    fn set_usize(&mut self, key: &str, value: &str, source: &str, set: impl FnOnce(&mut Self, usize)) {
        match value.parse::<usize>() {
            Ok(v) => set(self, v),
            Err(_) => warn!("Ignoring {} in {}: '{}' is not a number", key, source, value),
        }
    }

    /// Apply command-line flags, which always win.
    pub fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(depth) = overrides.search_depth {
            self.search_depth = depth;
        }
        if let Some(parallelism) = overrides.parallelism {
            self.parallelism = parallelism.max(1);
        }
        if let Some(depth) = overrides.root_search_depth {
            self.root_search_depth = depth;
        }
        if let Some(parser) = overrides.parser {
            self.parser = parser;
        }
        if let Some(include) = overrides.include_submodules {
            self.include_submodules = include;
        }
        if let Some(nested) = overrides.nested {
            self.nested = nested;
        }
        if let Some(document) = &overrides.document_filename {
            self.document_filename = document.clone();
        }
    }

    /// Defaults layered with the user preference file and CLI flags.
    ///
    /// The workspace layer is added once the fleet root is known, see
    /// [`Settings::with_workspace`].
    pub fn load(user_file: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self> {
        let mut settings = Settings::default();
        if let Some(path) = user_file {
            settings.apply_file(path)?;
        }
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    /// Add the workspace override layer, then re-apply CLI flags on top.
    ///
    /// The workspace file sits inside the fleet root, which was found by
    /// looking for the current document name, so a `document` key there
    /// is ignored.
    pub fn with_workspace(mut self, fleet_root: &Path, overrides: &SettingsOverrides) -> Result<Self> {
        let document_filename = self.document_filename.clone();
        let path = workspace_override_path(fleet_root);
        self.apply_file(&path)?;
        if self.document_filename != document_filename {
            debug!(
                "Ignoring document = {} in {}: the fleet root was located with {}",
                self.document_filename,
                path.display(),
                document_filename
            );
            self.document_filename = document_filename;
        }
        self.apply_overrides(overrides);
        Ok(self)
    }
}

/// Location of the workspace override file for a fleet root.
pub fn workspace_override_path(fleet_root: &Path) -> PathBuf {
    fleet_root.join(defaults::WORKSPACE_OVERRIDE_FILENAME)
}

/// Fields a service-local override file may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOverride {
    pub branch: Option<String>,
    pub service_type: Option<ServiceType>,
    pub team: Option<String>,
    pub excluded_from_bump: Option<bool>,
}

impl ServiceOverride {
    /// Read `.manifest.service.local` from a service directory.
    ///
    /// Missing files yield an empty override; unreadable values are skipped.
    pub fn load(service_dir: &Path) -> Result<Self> {
        let path = service_dir.join(defaults::SERVICE_OVERRIDE_FILENAME);
        let Some(pairs) = read_key_values(&path)? else {
            return Ok(Self::default());
        };

        let mut result = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "branch" if !value.is_empty() => result.branch = Some(value),
                "type" => match value.parse() {
                    Ok(t) => result.service_type = Some(t),
                    Err(e) => warn!("Ignoring type in {}: {}", path.display(), e),
                },
                "team" if !value.is_empty() => result.team = Some(value),
                "exclude_from_bump" => result.excluded_from_bump = parse_bool(&value),
                other => debug!("Ignoring '{}' in {}", other, path.display()),
            }
        }
        Ok(result)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Read the unsectioned key/value pairs of an INI-style file.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_key_values(path: &Path) -> Result<Option<Vec<(String, String)>>> {
    if !path.is_file() {
        return Ok(None);
    }

    let options = ParseOption {
        enabled_quote: true,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_file_opt(path, options).map_err(|e| Error::Settings {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let pairs = ini
        .section(None::<String>)
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect()
        })
        .unwrap_or_default();
    Ok(Some(pairs))
}

/// Parse the boolean spellings accepted in key/value files and documents.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_branch, "main");
        assert_eq!(settings.search_depth, 5);
        assert_eq!(settings.parallelism, 4);
        assert_eq!(settings.root_search_depth, 10);
        assert_eq!(settings.versioning_mode, VersioningMode::None);
        assert!(settings.include_submodules);
    }

    #[test]
    fn test_layers_only_override_their_keys() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user");
        fs::write(&user, "default_branch = develop\nsearch_depth = 3\n").unwrap();
        fs::write(
            dir.path().join(defaults::WORKSPACE_OVERRIDE_FILENAME),
            "# workspace\nsearch_depth = 7\nparallelism = 2\n",
        )
        .unwrap();

        let overrides = SettingsOverrides::default();
        let settings = Settings::load(Some(&user), &overrides)
            .unwrap()
            .with_workspace(dir.path(), &overrides)
            .unwrap();

        // user layer
        assert_eq!(settings.default_branch, "develop");
        // workspace beats user
        assert_eq!(settings.search_depth, 7);
        assert_eq!(settings.parallelism, 2);
        // untouched defaults
        assert_eq!(settings.root_search_depth, 10);
    }

    #[test]
    fn test_cli_overrides_win_over_workspace() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(defaults::WORKSPACE_OVERRIDE_FILENAME),
            "search_depth = 7\n",
        )
        .unwrap();
        let overrides = SettingsOverrides {
            search_depth: Some(2),
            ..Default::default()
        };
        let settings = Settings::load(None, &overrides)
            .unwrap()
            .with_workspace(dir.path(), &overrides)
            .unwrap();
        assert_eq!(settings.search_depth, 2);
    }

    #[test]
    fn test_workspace_layer_keeps_document_name() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(defaults::WORKSPACE_OVERRIDE_FILENAME),
            "document = other.yaml\nsearch_depth = 3\n",
        )
        .unwrap();
        let settings = Settings::load(None, &SettingsOverrides::default())
            .unwrap()
            .with_workspace(dir.path(), &SettingsOverrides::default())
            .unwrap();
        assert_eq!(settings.document_filename, defaults::DEFAULT_DOCUMENT_FILENAME);
        assert_eq!(settings.search_depth, 3);
    }

    #[test]
    fn test_invalid_values_are_skipped() {
        let mut settings = Settings::default();
        settings.apply_pairs(
            [
                ("search_depth", "deep"),
                ("parser", "xml"),
                ("nested", "maybe"),
                ("unknown_key", "x"),
                ("parallelism", "0"),
            ],
            "test",
        );
        assert_eq!(settings.search_depth, 5);
        assert_eq!(settings.parser, ParserPreference::Auto);
        assert!(settings.nested);
        assert_eq!(settings.parallelism, 1);
    }

    #[test]
    fn test_missing_file_is_not_applied() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        assert!(!settings.apply_file(&dir.path().join("absent")).unwrap());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_service_override_reads_known_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(defaults::SERVICE_OVERRIDE_FILENAME),
            "branch = release\ntype = tool\nexclude_from_bump = yes\nport = 80\n",
        )
        .unwrap();
        let service = ServiceOverride::load(dir.path()).unwrap();
        assert_eq!(service.branch.as_deref(), Some("release"));
        assert_eq!(service.service_type, Some(ServiceType::Tool));
        assert_eq!(service.excluded_from_bump, Some(true));
        assert_eq!(service.team, None);
    }

    #[test]
    fn test_service_override_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(ServiceOverride::load(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("sometimes"), None);
    }
}
