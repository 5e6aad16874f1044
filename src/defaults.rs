//! Default values for manifest-fleet configuration.
//!
//! This module provides centralized compiled-in defaults and well-known file
//! names, the lowest layer of the configuration precedence chain.

use std::path::PathBuf;

/// File name of the declarative fleet document at the fleet root.
pub const DEFAULT_DOCUMENT_FILENAME: &str = "manifest.fleet.yaml";

/// Workspace-level key/value override file, co-located with the fleet root.
pub const WORKSPACE_OVERRIDE_FILENAME: &str = ".manifest.fleet.local";

/// Per-service key/value override file, inside a service checkout.
pub const SERVICE_OVERRIDE_FILENAME: &str = ".manifest.service.local";

/// Version file read when the fleet uses a versioning mode.
pub const DEFAULT_VERSION_FILENAME: &str = "VERSION";

/// Environment variable that overrides the user preference file location.
pub const USER_CONFIG_ENV: &str = "MANIFEST_FLEET_USER_CONFIG";

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_SEARCH_DEPTH: usize = 5;
pub const DEFAULT_PARALLELISM: usize = 4;
pub const DEFAULT_ROOT_SEARCH_DEPTH: usize = 10;

/// Fallback fleet name when neither the document nor the root directory
/// yields one.
pub const DEFAULT_FLEET_NAME: &str = "fleet";

/// Version reported for repositories without any discoverable version.
pub const UNKNOWN_VERSION: &str = "0.0.0";

/// Returns the default location of the user preference file.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/manifest-fleet/config`
/// - macOS: `~/Library/Application Support/manifest-fleet/config`
/// - Windows: `{FOLDERID_RoamingAppData}\manifest-fleet\config`
///
/// Returns `None` if the platform directory cannot be determined. The
/// `MANIFEST_FLEET_USER_CONFIG` environment variable takes precedence.
pub fn default_user_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(USER_CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|dir| dir.join("manifest-fleet").join("config"))
}
